// Randomness provider seam and its CPI adapter
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke_signed},
    pubkey::Pubkey,
};

use crate::coordinator::instruction::CoordinatorInstruction;
use crate::error::RaffleError;
use crate::state::RandomnessConfig;

/// Seed of the PDA a raffle requests randomness as
pub const CONSUMER_SEED: &[u8] = b"consumer";

/// Issues randomness requests and hands back their ids
pub trait RandomnessProvider {
    fn request_random_words(&mut self, config: &RandomnessConfig) -> Result<u64, RaffleError>;
}

/// Consumer PDA for `raffle`
pub fn consumer_address(program_id: &Pubkey, raffle: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONSUMER_SEED, raffle.as_ref()], program_id)
}

/// Picks the winning slot: `word % participant_count`
pub fn winner_index(word: u64, participant_count: u64) -> Option<u64> {
    word.checked_rem(participant_count)
}

/// Requests randomness from the coordinator program via CPI, signing as the
/// raffle's consumer PDA
pub struct CoordinatorCpi<'a, 'b> {
    pub coordinator_program: &'b AccountInfo<'a>,
    pub coordinator_state: &'b AccountInfo<'a>,
    pub subscription: &'b AccountInfo<'a>,
    pub request: &'b AccountInfo<'a>,
    pub consumer: &'b AccountInfo<'a>,
    pub payer: &'b AccountInfo<'a>,
    pub system_program: &'b AccountInfo<'a>,
    pub raffle: Pubkey,
    pub consumer_bump: u8,
}

impl<'a, 'b> RandomnessProvider for CoordinatorCpi<'a, 'b> {
    fn request_random_words(&mut self, config: &RandomnessConfig) -> Result<u64, RaffleError> {
        let data = CoordinatorInstruction::RequestRandomWords {
            gas_lane: config.gas_lane,
            subscription_id: config.subscription_id,
            request_confirmations: config.request_confirmations,
            callback_gas_limit: config.callback_gas_limit,
            num_words: config.num_words,
        }
        .pack()
        .map_err(|_| RaffleError::RandomnessRequestFailed)?;

        let instruction = Instruction {
            program_id: *self.coordinator_program.key,
            accounts: vec![
                AccountMeta::new(*self.coordinator_state.key, false),
                AccountMeta::new_readonly(*self.subscription.key, false),
                AccountMeta::new(*self.request.key, false),
                AccountMeta::new_readonly(*self.consumer.key, true),
                AccountMeta::new(*self.payer.key, true),
                AccountMeta::new_readonly(*self.system_program.key, false),
            ],
            data,
        };

        invoke_signed(
            &instruction,
            &[
                self.coordinator_state.clone(),
                self.subscription.clone(),
                self.request.clone(),
                self.consumer.clone(),
                self.payer.clone(),
                self.system_program.clone(),
                self.coordinator_program.clone(),
            ],
            &[&[CONSUMER_SEED, self.raffle.as_ref(), &[self.consumer_bump]]],
        )
        .map_err(|e| {
            msg!("Randomness request CPI failed: {}", e);
            RaffleError::RandomnessRequestFailed
        })?;

        match get_return_data() {
            Some((program_id, data)) if program_id == *self.coordinator_program.key => data
                .get(..8)
                .and_then(|slice| slice.try_into().ok())
                .map(u64::from_le_bytes)
                .ok_or(RaffleError::RandomnessRequestFailed),
            _ => {
                msg!("Coordinator returned no request id");
                Err(RaffleError::RandomnessRequestFailed)
            }
        }
    }
}
