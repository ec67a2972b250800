use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use super::{coordinator_address, request_address, subscription_address};
use crate::coordinator::error::CoordinatorError;

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum CoordinatorInstruction {
    /// Create the coordinator account
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Admin, pays for the account
    /// 1. `[writable]` Coordinator account (PDA)
    /// 2. `[]` System program
    Initialize { base_fee: u64, gas_price: u64 },

    /// Open a subscription owned by the signer
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Owner, pays for the account
    /// 1. `[writable]` Coordinator account
    /// 2. `[writable]` Subscription account (PDA of the next id)
    /// 3. `[]` System program
    CreateSubscription,

    /// Top up a subscription balance
    ///
    /// Accounts expected:
    /// 0. `[signer]` Funder
    /// 1. `[writable]` Subscription account
    FundSubscription { subscription_id: u64, amount: u64 },

    /// Allow `consumer` to request against the subscription
    ///
    /// Accounts expected:
    /// 0. `[signer]` Subscription owner
    /// 1. `[writable]` Subscription account
    AddConsumer { subscription_id: u64, consumer: Pubkey },

    /// Record a randomness request; the request id comes back as return data
    ///
    /// Accounts expected:
    /// 0. `[writable]` Coordinator account
    /// 1. `[]` Subscription account
    /// 2. `[writable]` Request account (PDA of the next request id)
    /// 3. `[signer]` Consumer
    /// 4. `[signer, writable]` Payer for the request account
    /// 5. `[]` System program
    RequestRandomWords {
        gas_lane: [u8; 32],
        subscription_id: u64,
        request_confirmations: u16,
        callback_gas_limit: u32,
        num_words: u32,
    },

    /// Deliver random words to the consumer program
    ///
    /// Accounts expected:
    /// 0. `[signer]` Caller
    /// 1. `[]` Coordinator account
    /// 2. `[writable]` Subscription account
    /// 3. `[writable]` Request account
    /// 4. `[]` Consumer program
    /// 5.. Accounts forwarded to the consumer callback
    FulfillRandomWords {
        request_id: u64,
        override_words: Option<Vec<u64>>,
    },
}

impl CoordinatorInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| CoordinatorError::InvalidInstruction.into())
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec()
            .map_err(|_| CoordinatorError::InvalidInstruction.into())
    }
}

pub fn initialize(
    program_id: &Pubkey,
    admin: &Pubkey,
    base_fee: u64,
    gas_price: u64,
) -> Result<Instruction, ProgramError> {
    let (coordinator, _) = coordinator_address(program_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*admin, true),
            AccountMeta::new(coordinator, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: CoordinatorInstruction::Initialize {
            base_fee,
            gas_price,
        }
        .pack()?,
    })
}

/// `subscription_id` must be the coordinator's next subscription id
pub fn create_subscription(
    program_id: &Pubkey,
    owner: &Pubkey,
    subscription_id: u64,
) -> Result<Instruction, ProgramError> {
    let (coordinator, _) = coordinator_address(program_id);
    let (subscription, _) = subscription_address(program_id, subscription_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new(coordinator, false),
            AccountMeta::new(subscription, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: CoordinatorInstruction::CreateSubscription.pack()?,
    })
}

pub fn fund_subscription(
    program_id: &Pubkey,
    funder: &Pubkey,
    subscription_id: u64,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let (subscription, _) = subscription_address(program_id, subscription_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*funder, true),
            AccountMeta::new(subscription, false),
        ],
        data: CoordinatorInstruction::FundSubscription {
            subscription_id,
            amount,
        }
        .pack()?,
    })
}

pub fn add_consumer(
    program_id: &Pubkey,
    owner: &Pubkey,
    subscription_id: u64,
    consumer: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let (subscription, _) = subscription_address(program_id, subscription_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(subscription, false),
        ],
        data: CoordinatorInstruction::AddConsumer {
            subscription_id,
            consumer: *consumer,
        }
        .pack()?,
    })
}

/// `callback_accounts` are forwarded to the consumer program as-is
pub fn fulfill_random_words(
    program_id: &Pubkey,
    caller: &Pubkey,
    subscription_id: u64,
    request_id: u64,
    consumer_program: &Pubkey,
    callback_accounts: Vec<AccountMeta>,
    override_words: Option<Vec<u64>>,
) -> Result<Instruction, ProgramError> {
    let (coordinator, _) = coordinator_address(program_id);
    let (subscription, _) = subscription_address(program_id, subscription_id);
    let (request, _) = request_address(program_id, request_id);

    let mut accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new_readonly(coordinator, false),
        AccountMeta::new(subscription, false),
        AccountMeta::new(request, false),
        AccountMeta::new_readonly(*consumer_program, false),
    ];
    accounts.extend(callback_accounts);

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: CoordinatorInstruction::FulfillRandomWords {
            request_id,
            override_words,
        }
        .pack()?,
    })
}
