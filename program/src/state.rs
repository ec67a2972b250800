use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};
use std::convert::TryFrom;

use crate::error::RaffleError;
use crate::ledger::EntryLedger;

/// Number of random words requested per round
pub const NUM_WORDS: u32 = 1;

/// Phase of the current round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundState {
    /// Accepting entries and upkeep-triggered closes
    Open,
    /// Waiting for the randomness callback
    Calculating,
}

impl Default for RoundState {
    fn default() -> Self {
        RoundState::Open
    }
}

impl TryFrom<u8> for RoundState {
    type Error = &'static str;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RoundState::Open),
            1 => Ok(RoundState::Calculating),
            _ => Err("Invalid round state"),
        }
    }
}

impl From<RoundState> for u8 {
    fn from(state: RoundState) -> Self {
        match state {
            RoundState::Open => 0,
            RoundState::Calculating => 1,
        }
    }
}

/// Parameters forwarded verbatim to the randomness coordinator
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RandomnessConfig {
    /// Key hash selecting the oracle gas lane
    pub gas_lane: [u8; 32],
    /// Coordinator subscription paying for requests
    pub subscription_id: u64,
    /// Confirmations the oracle waits before responding
    pub request_confirmations: u16,
    /// Compute budget reserved for the callback
    pub callback_gas_limit: u32,
    /// Random words per request
    pub num_words: u32,
}

impl RandomnessConfig {
    pub const LEN: usize = 32 + 8 + 2 + 4 + 4;
}

/// Immutable raffle settings, fixed at initialization
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundConfig {
    /// Account that initialized the raffle
    pub authority: Pubkey,
    /// Minimum lamports to enter
    pub entrance_fee: u64,
    /// Minimum seconds between round closes
    pub interval: u64,
    /// Participant capacity of the raffle account
    pub max_participants: u32,
    pub randomness: RandomnessConfig,
    /// Coordinator program receiving randomness requests
    pub coordinator_program: Pubkey,
    /// Signer identity the coordinator fulfills with
    pub coordinator: Pubkey,
    /// PDA this raffle requests randomness as
    pub consumer: Pubkey,
    pub consumer_bump: u8,
}

impl RoundConfig {
    pub const LEN: usize = 32 + 8 + 8 + 4 + RandomnessConfig::LEN + 32 + 32 + 32 + 1;
}

/// Outstanding randomness request
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_id: u64,
    pub requested_at: UnixTimestamp,
}

impl PendingRequest {
    pub const LEN: usize = 8 + 8;
}

/// Raffle account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RaffleRound {
    pub is_initialized: bool,
    pub config: RoundConfig,
    pub state: RoundState,
    pub ledger: EntryLedger,
    /// Time of the last round close (or of initialization)
    pub last_timestamp: UnixTimestamp,
    pub pending_request: Option<PendingRequest>,
    pub recent_winner: Option<Pubkey>,
    /// Rounds finalized so far
    pub completed_rounds: u64,
}

impl RaffleRound {
    /// Size of everything but the participant entries
    pub const FIXED_LEN: usize = 1 // is_initialized
        + RoundConfig::LEN
        + 1 // state
        + 4 + 8 // participants length prefix, pool_balance
        + 8 // last_timestamp
        + 1 + PendingRequest::LEN
        + 1 + 32 // recent_winner
        + 8; // completed_rounds

    /// Account space for a raffle holding up to `max_participants` entries
    pub fn space(max_participants: u32) -> usize {
        Self::FIXED_LEN + max_participants as usize * 32
    }

    pub fn new(config: RoundConfig, now: UnixTimestamp) -> Self {
        Self {
            is_initialized: true,
            config,
            state: RoundState::Open,
            ledger: EntryLedger::default(),
            last_timestamp: now,
            pending_request: None,
            recent_winner: None,
            completed_rounds: 0,
        }
    }

    /// Reads a raffle from account data; trailing capacity is ignored
    pub fn unpack(src: &[u8]) -> Result<Self, ProgramError> {
        let round = Self::deserialize(&mut &src[..])
            .map_err(|_| ProgramError::InvalidAccountData)?;
        if !round.is_initialized {
            return Err(RaffleError::NotInitialized.into());
        }
        Ok(round)
    }

    /// Writes the raffle into account data
    pub fn pack(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        let data = self
            .try_to_vec()
            .map_err(|_| ProgramError::InvalidAccountData)?;
        if data.len() > dst.len() {
            return Err(ProgramError::AccountDataTooSmall);
        }
        dst[..data.len()].copy_from_slice(&data);
        Ok(())
    }

    /// True when `src` already holds an initialized raffle
    pub fn is_initialized_in(src: &[u8]) -> bool {
        src.first().map(|flag| *flag != 0).unwrap_or(false)
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.config.interval
    }

    pub fn participant_count(&self) -> u64 {
        self.ledger.len() as u64
    }

    pub fn participant_at(&self, index: u64) -> Result<Pubkey, RaffleError> {
        self.ledger.participant_at(index)
    }

    pub fn pool_balance(&self) -> u64 {
        self.ledger.pool_balance()
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.recent_winner
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn coordinator(&self) -> Pubkey {
        self.config.coordinator
    }

    pub fn pending_request(&self) -> Option<PendingRequest> {
        self.pending_request
    }

    pub fn completed_rounds(&self) -> u64 {
        self.completed_rounds
    }
}
