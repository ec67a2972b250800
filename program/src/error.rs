use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError,
    program_error::ProgramError, pubkey::Pubkey,
};
use thiserror::Error;

use crate::upkeep::UpkeepSnapshot;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Instruction data could not be decoded
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    /// Raffle account has already been initialized
    #[error("Raffle already initialized")]
    AlreadyInitialized,

    /// Raffle account has not been initialized
    #[error("Raffle not initialized")]
    NotInitialized,

    /// Settings rejected at initialization
    #[error("Invalid raffle settings: {0}")]
    InvalidSettings(&'static str),

    /// Paid amount is below the entrance fee
    #[error("Not enough lamports entered: paid {paid}, required {required}")]
    InsufficientEntryFee { paid: u64, required: u64 },

    /// Entries are closed while a winner is being calculated
    #[error("Raffle is not open")]
    NotOpen,

    /// Participant list has reached the account capacity
    #[error("Raffle is full ({capacity} entries)")]
    RoundFull { capacity: u32 },

    /// No participant at the requested position
    #[error("Participant index {index} out of range ({count} participants)")]
    IndexOutOfRange { index: u64, count: u64 },

    /// Upkeep conditions are not met
    #[error(
        "Upkeep not needed: balance {}, players {}, state {:?}",
        .snapshot.pool_balance,
        .snapshot.participant_count,
        .snapshot.state
    )]
    UpkeepNotNeeded { snapshot: UpkeepSnapshot },

    /// A randomness request is already outstanding
    #[error("Randomness request {request_id} is already pending")]
    RequestAlreadyPending { request_id: u64 },

    /// Randomness provider did not hand back a request id
    #[error("Randomness request failed")]
    RandomnessRequestFailed,

    /// Callback for a request this raffle is not waiting on
    #[error("Unknown randomness request {request_id}")]
    UnknownRequest { request_id: u64 },

    /// Callback did not come from the configured coordinator
    #[error("Only coordinator can fulfill: have {have}, want {want}")]
    OnlyCoordinatorCanFulfill { have: Pubkey, want: Pubkey },

    /// Callback delivered no random words
    #[error("No random words delivered")]
    MissingRandomWords,

    /// Round has no participants to draw from
    #[error("No participants in the current round")]
    NoParticipants,

    /// Prize could not be paid to the winner
    #[error("Transfer of {amount} lamports to {winner} failed")]
    TransferFailed { winner: Pubkey, amount: u64 },

    /// Arithmetic overflow
    #[error("Math overflow")]
    MathOverflow,
}

impl RaffleError {
    /// Stable code reported through `ProgramError::Custom`
    pub fn code(&self) -> u32 {
        match self {
            RaffleError::InvalidInstructionData => 0,
            RaffleError::AlreadyInitialized => 1,
            RaffleError::NotInitialized => 2,
            RaffleError::InvalidSettings(_) => 3,
            RaffleError::InsufficientEntryFee { .. } => 4,
            RaffleError::NotOpen => 5,
            RaffleError::RoundFull { .. } => 6,
            RaffleError::IndexOutOfRange { .. } => 7,
            RaffleError::UpkeepNotNeeded { .. } => 8,
            RaffleError::RequestAlreadyPending { .. } => 9,
            RaffleError::RandomnessRequestFailed => 10,
            RaffleError::UnknownRequest { .. } => 11,
            RaffleError::OnlyCoordinatorCanFulfill { .. } => 12,
            RaffleError::MissingRandomWords => 13,
            RaffleError::NoParticipants => 14,
            RaffleError::TransferFailed { .. } => 15,
            RaffleError::MathOverflow => 16,
        }
    }
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e.code())
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
