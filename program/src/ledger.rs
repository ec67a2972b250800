use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::error::RaffleError;
use crate::events::RaffleEvent;

/// Entries of the open round and the lamports they paid in
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryLedger {
    /// One slot per entry, in entry order. A player may hold several.
    participants: Vec<Pubkey>,
    pool_balance: u64,
}

impl EntryLedger {
    /// Appends `player` and adds `paid` to the pool.
    ///
    /// Fails without touching the ledger if `paid` is below `minimum` or the
    /// list already holds `capacity` entries.
    pub fn record_entry(
        &mut self,
        player: Pubkey,
        paid: u64,
        minimum: u64,
        capacity: u32,
    ) -> Result<RaffleEvent, RaffleError> {
        if paid < minimum {
            return Err(RaffleError::InsufficientEntryFee {
                paid,
                required: minimum,
            });
        }
        if self.participants.len() >= capacity as usize {
            return Err(RaffleError::RoundFull { capacity });
        }
        let pool_balance = self
            .pool_balance
            .checked_add(paid)
            .ok_or(RaffleError::MathOverflow)?;

        self.participants.push(player);
        self.pool_balance = pool_balance;

        Ok(RaffleEvent::EntryRecorded {
            participant: player,
            amount: paid,
        })
    }

    pub fn participant_at(&self, index: u64) -> Result<Pubkey, RaffleError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.participants.get(i))
            .copied()
            .ok_or(RaffleError::IndexOutOfRange {
                index,
                count: self.participants.len() as u64,
            })
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn pool_balance(&self) -> u64 {
        self.pool_balance
    }

    pub fn participants(&self) -> &[Pubkey] {
        &self.participants
    }

    /// Clears the round; only the finalize step may call this
    pub(crate) fn reset(&mut self) {
        self.participants.clear();
        self.pool_balance = 0;
    }
}
