use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;
use std::mem::size_of;

use crate::coordinator::{coordinator_address, request_address, subscription_address};
use crate::randomness::consumer_address;

/// Settings carried by `InitializeRaffle`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitializeArgs {
    pub entrance_fee: u64,
    pub interval: u64,
    pub max_participants: u32,
    pub gas_lane: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub coordinator_program: Pubkey,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Initialize a raffle in a pre-allocated account
    ///
    /// Accounts expected:
    /// 0. `[signer]` The raffle authority
    /// 1. `[writable]` The raffle account, owned by this program and sized
    ///    for `max_participants`
    InitializeRaffle(InitializeArgs),

    /// Enter the open round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player paying the entry
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Lamports paid, at least the entrance fee
        amount: u64,
    },

    /// Report whether the round can be closed; read-only. The answer is an
    /// `UpkeepCheck` in return data.
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep { check_data: Vec<u8> },

    /// Close the round and request randomness (anyone may call this)
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The caller, pays for the request account
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The raffle's consumer PDA
    /// 3. `[]` The coordinator program
    /// 4. `[writable]` The coordinator account
    /// 5. `[]` The subscription account
    /// 6. `[writable]` The request account for the coordinator's next id
    /// 7. `[]` The system program
    PerformUpkeep { perform_data: Vec<u8> },

    /// Randomness callback, only accepted from the coordinator
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator account
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winner
    FulfillRandomWords { request_id: u64, random_words: Vec<u64> },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_u64(rest)?;
                let (max_participants, rest) = Self::unpack_u32(rest)?;
                let (gas_lane, rest) = Self::unpack_fixed_bytes::<32>(rest)?;
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (request_confirmations, rest) = Self::unpack_u16(rest)?;
                let (callback_gas_limit, rest) = Self::unpack_u32(rest)?;
                let (coordinator_program, _) = Self::unpack_fixed_bytes::<32>(rest)?;
                Self::InitializeRaffle(InitializeArgs {
                    entrance_fee,
                    interval,
                    max_participants,
                    gas_lane,
                    subscription_id,
                    request_confirmations,
                    callback_gas_limit,
                    coordinator_program: Pubkey::new_from_array(coordinator_program),
                })
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { amount }
            }
            2 => {
                let (check_data, _) = Self::unpack_bytes(rest)?;
                Self::CheckUpkeep { check_data }
            }
            3 => {
                let (perform_data, _) = Self::unpack_bytes(rest)?;
                Self::PerformUpkeep { perform_data }
            }
            4 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (count, mut rest) = Self::unpack_u32(rest)?;
                // each word takes 8 bytes; bound the allocation by the input
                if (count as usize).saturating_mul(8) > rest.len() {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let mut random_words = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let (word, tail) = Self::unpack_u64(rest)?;
                    random_words.push(word);
                    rest = tail;
                }
                Self::FulfillRandomWords {
                    request_id,
                    random_words,
                }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match self {
            Self::InitializeRaffle(args) => {
                buf.push(0);
                buf.extend_from_slice(&args.entrance_fee.to_le_bytes());
                buf.extend_from_slice(&args.interval.to_le_bytes());
                buf.extend_from_slice(&args.max_participants.to_le_bytes());
                buf.extend_from_slice(&args.gas_lane);
                buf.extend_from_slice(&args.subscription_id.to_le_bytes());
                buf.extend_from_slice(&args.request_confirmations.to_le_bytes());
                buf.extend_from_slice(&args.callback_gas_limit.to_le_bytes());
                buf.extend_from_slice(args.coordinator_program.as_ref());
            }
            Self::EnterRaffle { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep { check_data } => {
                buf.push(2);
                Self::pack_bytes(&mut buf, check_data);
            }
            Self::PerformUpkeep { perform_data } => {
                buf.push(3);
                Self::pack_bytes(&mut buf, perform_data);
            }
            Self::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                buf.push(4);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(&(random_words.len() as u32).to_le_bytes());
                for word in random_words {
                    buf.extend_from_slice(&word.to_le_bytes());
                }
            }
        }
        buf
    }

    fn unpack_u16(input: &[u8]) -> Result<(u16, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<2>(input)?;
        Ok((u16::from_le_bytes(bytes), rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<4>(input)?;
        Ok((u32::from_le_bytes(bytes), rest))
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<8>(input)?;
        Ok((u64::from_le_bytes(bytes), rest))
    }

    fn unpack_fixed_bytes<const N: usize>(input: &[u8]) -> Result<([u8; N], &[u8]), ProgramError> {
        if input.len() < N {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = input.split_at(N);
        let bytes: [u8; N] = bytes
            .try_into()
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((bytes, rest))
    }

    fn unpack_bytes(input: &[u8]) -> Result<(Vec<u8>, &[u8]), ProgramError> {
        let (len, rest) = Self::unpack_u32(input)?;
        let len = len as usize;
        if rest.len() < len {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = rest.split_at(len);
        Ok((bytes.to_vec(), rest))
    }

    fn pack_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
        buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(bytes);
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    authority: &Pubkey,
    raffle: &Pubkey,
    args: InitializeArgs,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*raffle, false),
        ],
        data: RaffleInstruction::InitializeRaffle(args).pack(),
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(program_id: &Pubkey, player: &Pubkey, raffle: &Pubkey, amount: u64) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*player, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::EnterRaffle { amount }.pack(),
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, raffle: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*raffle, false)],
        data: RaffleInstruction::CheckUpkeep {
            check_data: Vec::new(),
        }
        .pack(),
    }
}

/// Create perform_upkeep instruction.
///
/// `next_request_id` is the coordinator's next request id, read from its
/// account; it fixes the address of the request account.
pub fn perform_upkeep(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle: &Pubkey,
    coordinator_program: &Pubkey,
    subscription_id: u64,
    next_request_id: u64,
) -> Instruction {
    let (consumer, _) = consumer_address(program_id, raffle);
    let (coordinator, _) = coordinator_address(coordinator_program);
    let (subscription, _) = subscription_address(coordinator_program, subscription_id);
    let (request, _) = request_address(coordinator_program, next_request_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*caller, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new_readonly(consumer, false),
            AccountMeta::new_readonly(*coordinator_program, false),
            AccountMeta::new(coordinator, false),
            AccountMeta::new_readonly(subscription, false),
            AccountMeta::new(request, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::PerformUpkeep {
            perform_data: Vec::new(),
        }
        .pack(),
    }
}

/// Accounts the coordinator forwards to `FulfillRandomWords`
pub fn fulfill_callback_accounts(raffle: &Pubkey, winner: &Pubkey) -> Vec<AccountMeta> {
    vec![AccountMeta::new(*raffle, false), AccountMeta::new(*winner, false)]
}
