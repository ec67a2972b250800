use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::Sysvar,
};

use crate::config::RaffleSettings;
use crate::coordinator::coordinator_address;
use crate::error::RaffleError;
use crate::instruction::{InitializeArgs, RaffleInstruction};
use crate::machine::PrizeTransfer;
use crate::randomness::{consumer_address, CoordinatorCpi};
use crate::state::{RaffleRound, RandomnessConfig, RoundConfig};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle(args) => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(program_id, accounts, args)
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(program_id, accounts, amount)
            }
            RaffleInstruction::CheckUpkeep { .. } => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            RaffleInstruction::PerformUpkeep { .. } => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(program_id, accounts)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, &random_words)
            }
        }
    }

    fn process_initialize_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        args: InitializeArgs,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        if RaffleRound::is_initialized_in(&raffle_info.data.borrow()) {
            return Err(fail(RaffleError::AlreadyInitialized));
        }

        let settings = RaffleSettings::from(args);
        settings.validate().map_err(fail)?;

        let space = RaffleRound::space(settings.max_participants);
        if raffle_info.data_len() < space {
            msg!(
                "Raffle account too small: {} bytes, need {} for {} participants",
                raffle_info.data_len(),
                space,
                settings.max_participants
            );
            return Err(ProgramError::AccountDataTooSmall);
        }

        let (consumer, consumer_bump) = consumer_address(program_id, raffle_info.key);
        let (coordinator, _) = coordinator_address(&settings.coordinator_program);
        let config = RoundConfig {
            authority: *authority_info.key,
            entrance_fee: settings.entrance_fee,
            interval: settings.interval,
            max_participants: settings.max_participants,
            randomness: RandomnessConfig::from(&settings),
            coordinator_program: settings.coordinator_program,
            coordinator,
            consumer,
            consumer_bump,
        };

        let now = Clock::get()?.unix_timestamp;
        let round = RaffleRound::new(config, now);
        round.pack(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: fee={}, interval={}s, consumer={}, coordinator={}",
            config.entrance_fee,
            config.interval,
            consumer,
            coordinator
        );
        Ok(())
    }

    fn process_enter_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        let mut round = load_round(program_id, raffle_info)?;

        let event = round.enter(*player_info.key, amount).map_err(fail)?;

        // Move the entry into escrow on the raffle account
        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, amount),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        round.pack(&mut raffle_info.data.borrow_mut())?;
        event.emit();
        Ok(())
    }

    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        let round = load_round(program_id, raffle_info)?;
        let now = Clock::get()?.unix_timestamp;
        let check = round.check_upkeep(now);

        msg!(
            "Upkeep needed: {} (state={:?}, players={}, balance={}, elapsed={}s)",
            check.upkeep_needed,
            check.snapshot.state,
            check.snapshot.participant_count,
            check.snapshot.pool_balance,
            check.snapshot.elapsed
        );
        let data = check
            .try_to_vec()
            .map_err(|_| ProgramError::InvalidAccountData)?;
        set_return_data(&data);
        Ok(())
    }

    fn process_perform_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let consumer_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        let mut round = load_round(program_id, raffle_info)?;

        if *consumer_info.key != round.config.consumer {
            msg!("Consumer account does not belong to this raffle");
            return Err(ProgramError::InvalidArgument);
        }
        if *coordinator_program_info.key != round.config.coordinator_program
            || *coordinator_info.key != round.config.coordinator
        {
            msg!("Coordinator accounts do not match the raffle configuration");
            return Err(ProgramError::InvalidArgument);
        }
        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let now = Clock::get()?.unix_timestamp;
        let mut provider = CoordinatorCpi {
            coordinator_program: coordinator_program_info,
            coordinator_state: coordinator_info,
            subscription: subscription_info,
            request: request_info,
            consumer: consumer_info,
            payer: caller_info,
            system_program: system_program_info,
            raffle: *raffle_info.key,
            consumer_bump: round.config.consumer_bump,
        };
        let event = round.perform_upkeep(now, &mut provider).map_err(fail)?;

        round.pack(&mut raffle_info.data.borrow_mut())?;
        event.emit();
        Ok(())
    }

    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[u64],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let coordinator_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        let mut round = load_round(program_id, raffle_info)?;

        if !coordinator_info.is_signer {
            return Err(fail(RaffleError::OnlyCoordinatorCanFulfill {
                have: *coordinator_info.key,
                want: round.config.coordinator,
            }));
        }

        let now = Clock::get()?.unix_timestamp;
        let mut payout = LamportPayout {
            raffle: raffle_info,
            winner: winner_info,
        };
        let event = round
            .fulfill_random_words(coordinator_info.key, request_id, random_words, now, &mut payout)
            .map_err(fail)?;

        round.pack(&mut raffle_info.data.borrow_mut())?;
        event.emit();
        Ok(())
    }
}

/// Debits the escrowed pool from the raffle account straight into the
/// winner's account
struct LamportPayout<'a, 'b> {
    raffle: &'b AccountInfo<'a>,
    winner: &'b AccountInfo<'a>,
}

impl<'a, 'b> PrizeTransfer for LamportPayout<'a, 'b> {
    fn transfer(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError> {
        if self.winner.key != winner {
            msg!("Winner account {} is not the drawn winner {}", self.winner.key, winner);
            return Err(RaffleError::TransferFailed {
                winner: *winner,
                amount,
            });
        }
        if !self.winner.is_writable || self.winner.executable {
            msg!("Winner account cannot receive lamports");
            return Err(RaffleError::TransferFailed {
                winner: *winner,
                amount,
            });
        }

        let raffle_balance = self
            .raffle
            .lamports()
            .checked_sub(amount)
            .ok_or(RaffleError::MathOverflow)?;
        let winner_balance = self
            .winner
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::MathOverflow)?;

        let mut raffle_lamports = self
            .raffle
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::TransferFailed {
                winner: *winner,
                amount,
            })?;
        let mut winner_lamports = self
            .winner
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::TransferFailed {
                winner: *winner,
                amount,
            })?;
        **raffle_lamports = raffle_balance;
        **winner_lamports = winner_balance;
        Ok(())
    }
}

fn load_round(program_id: &Pubkey, raffle_info: &AccountInfo) -> Result<RaffleRound, ProgramError> {
    if raffle_info.owner != program_id {
        msg!("Raffle account must be owned by this program");
        return Err(ProgramError::IncorrectProgramId);
    }
    let data = raffle_info.data.borrow();
    RaffleRound::unpack(&data)
}

/// Logs a raffle error before handing it to the runtime
fn fail(e: RaffleError) -> ProgramError {
    msg!("Error: {}", e);
    e.into()
}
