use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::clock::UnixTimestamp;

use crate::state::RoundState;

/// What the upkeep predicate saw
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepSnapshot {
    pub state: RoundState,
    pub participant_count: u64,
    pub pool_balance: u64,
    /// Seconds since the last round close
    pub elapsed: u64,
}

/// Answer to a `CheckUpkeep` call
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub upkeep_needed: bool,
    /// Handed back unchanged to `PerformUpkeep`; always empty
    pub perform_data: Vec<u8>,
    pub snapshot: UpkeepSnapshot,
}

/// Whether a round may be closed
pub fn is_upkeep_needed(
    state: RoundState,
    participant_count: u64,
    pool_balance: u64,
    elapsed: u64,
    interval: u64,
) -> bool {
    let is_open = state == RoundState::Open;
    let time_passed = elapsed >= interval;
    let has_players = participant_count > 0;
    let has_balance = pool_balance > 0;
    is_open && time_passed && has_players && has_balance
}

/// Seconds from `last` to `now`, zero if the clock reads earlier than `last`
pub fn elapsed_since(last: UnixTimestamp, now: UnixTimestamp) -> u64 {
    u64::try_from(now.saturating_sub(last)).unwrap_or(0)
}

impl UpkeepSnapshot {
    pub fn upkeep_needed(&self, interval: u64) -> bool {
        is_upkeep_needed(
            self.state,
            self.participant_count,
            self.pool_balance,
            self.elapsed,
            interval,
        )
    }
}
