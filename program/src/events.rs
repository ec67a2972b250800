use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// Notifications emitted by the raffle
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    EntryRecorded { participant: Pubkey, amount: u64 },
    RequestedRaffleWinner { request_id: u64 },
    WinnerPicked { winner: Pubkey },
}

impl RaffleEvent {
    /// Logs the event as text and as borsh bytes for indexers
    pub fn emit(&self) {
        match self {
            RaffleEvent::EntryRecorded {
                participant,
                amount,
            } => msg!("EntryRecorded: participant={}, amount={}", participant, amount),
            RaffleEvent::RequestedRaffleWinner { request_id } => {
                msg!("RequestedRaffleWinner: request_id={}", request_id)
            }
            RaffleEvent::WinnerPicked { winner } => msg!("WinnerPicked: winner={}", winner),
        }
        if let Ok(data) = self.try_to_vec() {
            sol_log_data(&[&data]);
        }
    }
}
