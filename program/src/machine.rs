// Round state machine: Open -> Calculating -> Open
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::error::RaffleError;
use crate::events::RaffleEvent;
use crate::randomness::{winner_index, RandomnessProvider};
use crate::state::{PendingRequest, RaffleRound, RoundState};
use crate::upkeep::{elapsed_since, UpkeepCheck, UpkeepSnapshot};

/// Pays the pool out to the round winner
pub trait PrizeTransfer {
    fn transfer(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError>;
}

impl RaffleRound {
    /// Adds an entry for `player` paying `amount` lamports
    pub fn enter(&mut self, player: Pubkey, amount: u64) -> Result<RaffleEvent, RaffleError> {
        if self.state != RoundState::Open {
            return Err(RaffleError::NotOpen);
        }
        self.ledger.record_entry(
            player,
            amount,
            self.config.entrance_fee,
            self.config.max_participants,
        )
    }

    pub fn upkeep_snapshot(&self, now: UnixTimestamp) -> UpkeepSnapshot {
        UpkeepSnapshot {
            state: self.state,
            participant_count: self.participant_count(),
            pool_balance: self.ledger.pool_balance(),
            elapsed: elapsed_since(self.last_timestamp, now),
        }
    }

    /// Read-only eligibility check
    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepCheck {
        let snapshot = self.upkeep_snapshot(now);
        UpkeepCheck {
            upkeep_needed: snapshot.upkeep_needed(self.config.interval),
            perform_data: Vec::new(),
            snapshot,
        }
    }

    /// Closes the round and asks `provider` for randomness.
    ///
    /// State is only touched once the provider has returned a request id.
    pub fn perform_upkeep<P: RandomnessProvider>(
        &mut self,
        now: UnixTimestamp,
        provider: &mut P,
    ) -> Result<RaffleEvent, RaffleError> {
        let check = self.check_upkeep(now);
        if !check.upkeep_needed {
            return Err(RaffleError::UpkeepNotNeeded {
                snapshot: check.snapshot,
            });
        }
        if let Some(pending) = self.pending_request {
            return Err(RaffleError::RequestAlreadyPending {
                request_id: pending.request_id,
            });
        }

        let request_id = provider.request_random_words(&self.config.randomness)?;

        self.state = RoundState::Calculating;
        self.pending_request = Some(PendingRequest {
            request_id,
            requested_at: now,
        });
        Ok(RaffleEvent::RequestedRaffleWinner { request_id })
    }

    /// Participant that `words` selects, without paying anyone
    pub fn select_winner(&self, words: &[u64]) -> Result<Pubkey, RaffleError> {
        let word = *words.first().ok_or(RaffleError::MissingRandomWords)?;
        let index = winner_index(word, self.participant_count()).ok_or(RaffleError::NoParticipants)?;
        self.ledger.participant_at(index)
    }

    /// Settles the pending request: pays the winner and reopens the round.
    ///
    /// If the payout fails the round stays `Calculating` with the pool and
    /// the pending request intact.
    pub fn fulfill_random_words<T: PrizeTransfer>(
        &mut self,
        caller: &Pubkey,
        request_id: u64,
        words: &[u64],
        now: UnixTimestamp,
        payout: &mut T,
    ) -> Result<RaffleEvent, RaffleError> {
        if *caller != self.config.coordinator {
            return Err(RaffleError::OnlyCoordinatorCanFulfill {
                have: *caller,
                want: self.config.coordinator,
            });
        }
        match self.pending_request {
            Some(pending) if pending.request_id == request_id => {}
            _ => return Err(RaffleError::UnknownRequest { request_id }),
        }

        let winner = self.select_winner(words)?;
        let amount = self.ledger.pool_balance();
        let completed_rounds = self
            .completed_rounds
            .checked_add(1)
            .ok_or(RaffleError::MathOverflow)?;
        payout
            .transfer(&winner, amount)
            .map_err(|_| RaffleError::TransferFailed { winner, amount })?;

        self.ledger.reset();
        self.pending_request = None;
        self.recent_winner = Some(winner);
        self.last_timestamp = now;
        self.completed_rounds = completed_rounds;
        self.state = RoundState::Open;
        Ok(RaffleEvent::WinnerPicked { winner })
    }
}
