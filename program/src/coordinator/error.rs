use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the mock coordinator
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("Invalid coordinator instruction")]
    InvalidInstruction,

    #[error("Coordinator not initialized")]
    NotInitialized,

    #[error("Invalid subscription")]
    InvalidSubscription,

    #[error("Must be subscription owner")]
    MustBeSubOwner,

    #[error("Too many consumers")]
    TooManyConsumers,

    #[error("Invalid consumer")]
    InvalidConsumer,

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Invalid random words")]
    InvalidRandomWords,

    #[error("nonexistent request")]
    NonexistentRequest,

    #[error("Math overflow")]
    MathOverflow,
}

impl From<CoordinatorError> for ProgramError {
    fn from(e: CoordinatorError) -> Self {
        // keep clear of the raffle's codes
        ProgramError::Custom(0x100 + e as u32)
    }
}

impl<T> DecodeError<T> for CoordinatorError {
    fn type_of() -> &'static str {
        "Coordinator Error"
    }
}

impl PrintProgramError for CoordinatorError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
