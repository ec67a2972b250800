// Lottery Raffle Program
// Time-windowed raffle whose winner is drawn from coordinator-supplied randomness

// Core modules
pub mod config;
pub mod error;
pub mod events;
pub mod instruction;
pub mod processor;
pub mod state;

// Round logic
pub mod ledger;
pub mod machine;
pub mod upkeep;

// Randomness provider seam and the local mock coordinator
pub mod coordinator;
pub mod randomness;

pub mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
