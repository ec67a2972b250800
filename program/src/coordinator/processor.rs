use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack},
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};

use super::error::CoordinatorError;
use super::instruction::CoordinatorInstruction;
use super::state::{CoordinatorState, RequestRecord, Subscription, MAX_CONSUMERS};
use super::{
    coordinator_address, fulfillment_payment, mock_random_words, request_address,
    subscription_address, COORDINATOR_SEED, MAX_NUM_WORDS, REQUEST_SEED, SUBSCRIPTION_SEED,
};
use crate::instruction::RaffleInstruction;

/// Entry point of the mock coordinator program
pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    Processor::process(program_id, accounts, instruction_data)
}

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = CoordinatorInstruction::unpack(instruction_data)?;

        match instruction {
            CoordinatorInstruction::Initialize {
                base_fee,
                gas_price,
            } => {
                msg!("Coordinator: Initialize");
                Self::process_initialize(program_id, accounts, base_fee, gas_price)
            }
            CoordinatorInstruction::CreateSubscription => {
                msg!("Coordinator: Create Subscription");
                Self::process_create_subscription(program_id, accounts)
            }
            CoordinatorInstruction::FundSubscription {
                subscription_id,
                amount,
            } => {
                msg!("Coordinator: Fund Subscription");
                Self::process_fund_subscription(program_id, accounts, subscription_id, amount)
            }
            CoordinatorInstruction::AddConsumer {
                subscription_id,
                consumer,
            } => {
                msg!("Coordinator: Add Consumer");
                Self::process_add_consumer(program_id, accounts, subscription_id, consumer)
            }
            CoordinatorInstruction::RequestRandomWords {
                gas_lane,
                subscription_id,
                request_confirmations,
                callback_gas_limit,
                num_words,
            } => {
                msg!("Coordinator: Request Random Words");
                let record = RequestRecord {
                    is_initialized: true,
                    request_id: 0,
                    subscription_id,
                    consumer: Pubkey::default(),
                    gas_lane,
                    request_confirmations,
                    callback_gas_limit,
                    num_words,
                    fulfilled: false,
                };
                Self::process_request_random_words(program_id, accounts, record)
            }
            CoordinatorInstruction::FulfillRandomWords {
                request_id,
                override_words,
            } => {
                msg!("Coordinator: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, override_words)
            }
        }
    }

    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        base_fee: u64,
        gas_price: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !admin_info.is_signer {
            msg!("Admin must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected, bump) = coordinator_address(program_id);
        if *coordinator_info.key != expected {
            msg!("Invalid coordinator account address");
            return Err(ProgramError::InvalidArgument);
        }
        if coordinator_info.owner == program_id {
            msg!("Coordinator account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        create_pda_account(
            admin_info,
            coordinator_info,
            system_program_info,
            program_id,
            CoordinatorState::LEN,
            &[COORDINATOR_SEED, &[bump]],
        )?;

        let state = CoordinatorState {
            is_initialized: true,
            admin: *admin_info.key,
            base_fee,
            gas_price,
            next_subscription_id: 1,
            next_request_id: 1,
            bump,
        };
        CoordinatorState::pack(state, &mut coordinator_info.data.borrow_mut())?;

        msg!("Coordinator initialized: base_fee={}, gas_price={}", base_fee, gas_price);
        Ok(())
    }

    fn process_create_subscription(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            msg!("Subscription owner must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut state = load_coordinator(program_id, coordinator_info)?;
        let subscription_id = state.next_subscription_id;
        let (expected, bump) = subscription_address(program_id, subscription_id);
        if *subscription_info.key != expected {
            msg!("Subscription account must be the PDA of id {}", subscription_id);
            return Err(ProgramError::InvalidArgument);
        }

        create_pda_account(
            owner_info,
            subscription_info,
            system_program_info,
            program_id,
            Subscription::LEN,
            &[SUBSCRIPTION_SEED, &subscription_id.to_le_bytes(), &[bump]],
        )?;

        let subscription = Subscription {
            is_initialized: true,
            subscription_id,
            owner: *owner_info.key,
            ..Default::default()
        };
        Subscription::pack(subscription, &mut subscription_info.data.borrow_mut())?;

        state.next_subscription_id = subscription_id
            .checked_add(1)
            .ok_or(CoordinatorError::MathOverflow)?;
        CoordinatorState::pack(state, &mut coordinator_info.data.borrow_mut())?;

        msg!("SubscriptionCreated: id={}, owner={}", subscription_id, owner_info.key);
        Ok(())
    }

    fn process_fund_subscription(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        subscription_id: u64,
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let funder_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;

        if !funder_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut subscription = load_subscription(program_id, subscription_info, subscription_id)?;
        let old_balance = subscription.balance;
        subscription.balance = old_balance
            .checked_add(amount)
            .ok_or(CoordinatorError::MathOverflow)?;
        Subscription::pack(subscription, &mut subscription_info.data.borrow_mut())?;

        msg!(
            "SubscriptionFunded: id={}, old={}, new={}",
            subscription_id,
            old_balance,
            subscription.balance
        );
        Ok(())
    }

    fn process_add_consumer(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        subscription_id: u64,
        consumer: Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut subscription = load_subscription(program_id, subscription_info, subscription_id)?;
        if subscription.owner != *owner_info.key {
            return Err(CoordinatorError::MustBeSubOwner.into());
        }
        if subscription.is_consumer(&consumer) {
            msg!("Consumer {} already added", consumer);
            return Ok(());
        }
        let count = subscription.consumer_count as usize;
        if count >= MAX_CONSUMERS {
            return Err(CoordinatorError::TooManyConsumers.into());
        }
        subscription.consumers[count] = consumer;
        subscription.consumer_count += 1;
        Subscription::pack(subscription, &mut subscription_info.data.borrow_mut())?;

        msg!("ConsumerAdded: id={}, consumer={}", subscription_id, consumer);
        Ok(())
    }

    fn process_request_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        mut record: RequestRecord,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let coordinator_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let consumer_info = next_account_info(account_info_iter)?;
        let payer_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !consumer_info.is_signer || !payer_info.is_signer {
            msg!("Consumer and payer must sign the request");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if record.num_words == 0 || record.num_words > MAX_NUM_WORDS {
            msg!("Requested {} words, allowed 1..={}", record.num_words, MAX_NUM_WORDS);
            return Err(CoordinatorError::InvalidRandomWords.into());
        }

        let mut state = load_coordinator(program_id, coordinator_info)?;
        let subscription =
            load_subscription(program_id, subscription_info, record.subscription_id)?;
        if !subscription.is_consumer(consumer_info.key) {
            msg!("{} is not a consumer of subscription {}", consumer_info.key, record.subscription_id);
            return Err(CoordinatorError::InvalidConsumer.into());
        }

        let request_id = state.next_request_id;
        let (expected, bump) = request_address(program_id, request_id);
        if *request_info.key != expected {
            msg!("Request account must be the PDA of id {}", request_id);
            return Err(ProgramError::InvalidArgument);
        }

        create_pda_account(
            payer_info,
            request_info,
            system_program_info,
            program_id,
            RequestRecord::LEN,
            &[REQUEST_SEED, &request_id.to_le_bytes(), &[bump]],
        )?;

        record.request_id = request_id;
        record.consumer = *consumer_info.key;
        RequestRecord::pack(record, &mut request_info.data.borrow_mut())?;

        state.next_request_id = request_id
            .checked_add(1)
            .ok_or(CoordinatorError::MathOverflow)?;
        CoordinatorState::pack(state, &mut coordinator_info.data.borrow_mut())?;

        set_return_data(&request_id.to_le_bytes());
        msg!(
            "RandomWordsRequested: request_id={}, subscription={}, consumer={}",
            request_id,
            record.subscription_id,
            record.consumer
        );
        Ok(())
    }

    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        override_words: Option<Vec<u64>>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let consumer_program_info = next_account_info(account_info_iter)?;
        let callback_accounts: Vec<AccountInfo> = account_info_iter.cloned().collect();

        if !caller_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let state = load_coordinator(program_id, coordinator_info)?;

        let (expected, _) = request_address(program_id, request_id);
        if *request_info.key != expected || request_info.owner != program_id {
            return Err(CoordinatorError::NonexistentRequest.into());
        }
        let mut record = RequestRecord::unpack(&request_info.data.borrow())
            .map_err(|_| CoordinatorError::NonexistentRequest)?;
        if record.fulfilled || record.request_id != request_id {
            return Err(CoordinatorError::NonexistentRequest.into());
        }

        let words = match override_words {
            Some(words) => {
                if words.len() != record.num_words as usize {
                    msg!("Expected {} words, got {}", record.num_words, words.len());
                    return Err(CoordinatorError::InvalidRandomWords.into());
                }
                words
            }
            None => mock_random_words(request_id, record.num_words),
        };

        let mut subscription =
            load_subscription(program_id, subscription_info, record.subscription_id)?;
        let payment = fulfillment_payment(state.base_fee, state.gas_price, record.callback_gas_limit)
            .ok_or(CoordinatorError::MathOverflow)?;
        if subscription.balance < payment {
            msg!("Subscription balance {} below payment {}", subscription.balance, payment);
            return Err(CoordinatorError::InsufficientBalance.into());
        }
        subscription.balance -= payment;
        Subscription::pack(subscription, &mut subscription_info.data.borrow_mut())?;

        record.fulfilled = true;
        RequestRecord::pack(record, &mut request_info.data.borrow_mut())?;

        let mut metas = vec![AccountMeta::new_readonly(*coordinator_info.key, true)];
        metas.extend(callback_accounts.iter().map(|account| AccountMeta {
            pubkey: *account.key,
            is_signer: account.is_signer,
            is_writable: account.is_writable,
        }));
        let callback = Instruction {
            program_id: *consumer_program_info.key,
            accounts: metas,
            data: RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words: words,
            }
            .pack(),
        };

        let mut infos = vec![coordinator_info.clone()];
        infos.extend(callback_accounts);
        infos.push(consumer_program_info.clone());
        invoke_signed(&callback, &infos, &[&[COORDINATOR_SEED, &[state.bump]]])?;

        msg!(
            "RandomWordsFulfilled: request_id={}, payment={}",
            request_id,
            payment
        );
        Ok(())
    }
}

fn load_coordinator(
    program_id: &Pubkey,
    coordinator_info: &AccountInfo,
) -> Result<CoordinatorState, ProgramError> {
    if coordinator_info.owner != program_id {
        return Err(CoordinatorError::NotInitialized.into());
    }
    let state = CoordinatorState::unpack_unchecked(&coordinator_info.data.borrow())?;
    if !state.is_initialized() {
        return Err(CoordinatorError::NotInitialized.into());
    }
    Ok(state)
}

fn load_subscription(
    program_id: &Pubkey,
    subscription_info: &AccountInfo,
    subscription_id: u64,
) -> Result<Subscription, ProgramError> {
    if subscription_info.owner != program_id {
        return Err(CoordinatorError::InvalidSubscription.into());
    }
    let subscription = Subscription::unpack(&subscription_info.data.borrow())
        .map_err(|_| CoordinatorError::InvalidSubscription)?;
    if subscription.subscription_id != subscription_id {
        return Err(CoordinatorError::InvalidSubscription.into());
    }
    Ok(subscription)
}

/// Creates a rent-exempt account at a PDA of this program
fn create_pda_account<'a>(
    payer_info: &AccountInfo<'a>,
    new_account_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    program_id: &Pubkey,
    space: usize,
    seeds: &[&[u8]],
) -> ProgramResult {
    if *system_program_info.key != system_program::id() {
        return Err(ProgramError::IncorrectProgramId);
    }
    let rent = Rent::get()?;
    invoke_signed(
        &system_instruction::create_account(
            payer_info.key,
            new_account_info.key,
            rent.minimum_balance(space),
            space as u64,
            program_id,
        ),
        &[
            payer_info.clone(),
            new_account_info.clone(),
            system_program_info.clone(),
        ],
        &[seeds],
    )
}
