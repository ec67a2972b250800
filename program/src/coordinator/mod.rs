//! Mock randomness coordinator for local networks.
//!
//! Subscriptions are prepaid in coordinator units. A consumer registered on a
//! subscription requests random words; anyone may later fulfill the request,
//! which charges the subscription and calls the consumer program back, signed
//! by the coordinator account.

pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;

use solana_program::{keccak, pubkey::Pubkey};

pub use processor::process_instruction;

pub const COORDINATOR_SEED: &[u8] = b"coordinator";
pub const SUBSCRIPTION_SEED: &[u8] = b"subscription";
pub const REQUEST_SEED: &[u8] = b"request";

/// Premium per fulfillment, 0.25 units of 1e18
pub const BASE_FEE: u64 = 250_000_000_000_000_000;
/// Price per unit of callback gas
pub const GAS_PRICE: u64 = 1_000_000_000;
/// Upper bound on words per request
pub const MAX_NUM_WORDS: u32 = 500;

/// Coordinator account; also the key that signs fulfillment callbacks
pub fn coordinator_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[COORDINATOR_SEED], program_id)
}

pub fn subscription_address(program_id: &Pubkey, subscription_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[SUBSCRIPTION_SEED, &subscription_id.to_le_bytes()],
        program_id,
    )
}

pub fn request_address(program_id: &Pubkey, request_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[REQUEST_SEED, &request_id.to_le_bytes()], program_id)
}

/// Fee charged for fulfilling a request with the given callback budget
pub fn fulfillment_payment(base_fee: u64, gas_price: u64, callback_gas_limit: u32) -> Option<u64> {
    gas_price
        .checked_mul(callback_gas_limit as u64)?
        .checked_add(base_fee)
}

/// Deterministic mock words: keccak(request_id || index), first 8 bytes
pub fn mock_random_words(request_id: u64, num_words: u32) -> Vec<u64> {
    (0..num_words)
        .map(|index| {
            let hash = keccak::hashv(&[&request_id.to_le_bytes(), &index.to_le_bytes()]);
            let mut word = [0u8; 8];
            word.copy_from_slice(&hash.0[..8]);
            u64::from_le_bytes(word)
        })
        .collect()
}
