use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};

/// Consumers a single subscription can hold
pub const MAX_CONSUMERS: usize = 4;

/// Global coordinator account, also the identity it fulfills with
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoordinatorState {
    pub is_initialized: bool,
    pub admin: Pubkey,
    /// Flat premium charged per fulfillment
    pub base_fee: u64,
    /// Price per unit of callback gas
    pub gas_price: u64,
    pub next_subscription_id: u64,
    pub next_request_id: u64,
    pub bump: u8,
}

/// Prepaid balance and its allowed consumers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Subscription {
    pub is_initialized: bool,
    pub subscription_id: u64,
    pub owner: Pubkey,
    pub balance: u64,
    pub consumer_count: u8,
    pub consumers: [Pubkey; MAX_CONSUMERS],
}

impl Subscription {
    pub fn is_consumer(&self, key: &Pubkey) -> bool {
        self.consumers[..self.consumer_count as usize].contains(key)
    }
}

/// One randomness request, kept after fulfillment to block replays
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RequestRecord {
    pub is_initialized: bool,
    pub request_id: u64,
    pub subscription_id: u64,
    pub consumer: Pubkey,
    pub gas_lane: [u8; 32],
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
    pub fulfilled: bool,
}

impl Sealed for CoordinatorState {}
impl Sealed for Subscription {}
impl Sealed for RequestRecord {}

impl IsInitialized for CoordinatorState {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl IsInitialized for Subscription {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl IsInitialized for RequestRecord {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for CoordinatorState {
    const LEN: usize = 1 + 32 + 8 + 8 + 8 + 8 + 1;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, CoordinatorState::LEN];
        let (is_initialized, admin, base_fee, gas_price, next_subscription_id, next_request_id, bump) =
            array_refs![src, 1, 32, 8, 8, 8, 8, 1];

        Ok(CoordinatorState {
            is_initialized: is_initialized[0] != 0,
            admin: Pubkey::new_from_array(*admin),
            base_fee: u64::from_le_bytes(*base_fee),
            gas_price: u64::from_le_bytes(*gas_price),
            next_subscription_id: u64::from_le_bytes(*next_subscription_id),
            next_request_id: u64::from_le_bytes(*next_request_id),
            bump: bump[0],
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, CoordinatorState::LEN];
        let (
            is_initialized_dst,
            admin_dst,
            base_fee_dst,
            gas_price_dst,
            next_subscription_id_dst,
            next_request_id_dst,
            bump_dst,
        ) = mut_array_refs![dst, 1, 32, 8, 8, 8, 8, 1];

        is_initialized_dst[0] = self.is_initialized as u8;
        admin_dst.copy_from_slice(self.admin.as_ref());
        *base_fee_dst = self.base_fee.to_le_bytes();
        *gas_price_dst = self.gas_price.to_le_bytes();
        *next_subscription_id_dst = self.next_subscription_id.to_le_bytes();
        *next_request_id_dst = self.next_request_id.to_le_bytes();
        bump_dst[0] = self.bump;
    }
}

impl Pack for Subscription {
    const LEN: usize = 1 + 8 + 32 + 8 + 1 + 32 * MAX_CONSUMERS;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Subscription::LEN];
        let (is_initialized, subscription_id, owner, balance, consumer_count, consumers_src) =
            array_refs![src, 1, 8, 32, 8, 1, 32 * MAX_CONSUMERS];

        let consumer_count = consumer_count[0];
        if consumer_count as usize > MAX_CONSUMERS {
            return Err(ProgramError::InvalidAccountData);
        }
        let mut consumers = [Pubkey::default(); MAX_CONSUMERS];
        for (slot, chunk) in consumers.iter_mut().zip(consumers_src.chunks_exact(32)) {
            *slot = Pubkey::new_from_array(*array_ref![chunk, 0, 32]);
        }

        Ok(Subscription {
            is_initialized: is_initialized[0] != 0,
            subscription_id: u64::from_le_bytes(*subscription_id),
            owner: Pubkey::new_from_array(*owner),
            balance: u64::from_le_bytes(*balance),
            consumer_count,
            consumers,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Subscription::LEN];
        let (
            is_initialized_dst,
            subscription_id_dst,
            owner_dst,
            balance_dst,
            consumer_count_dst,
            consumers_dst,
        ) = mut_array_refs![dst, 1, 8, 32, 8, 1, 32 * MAX_CONSUMERS];

        is_initialized_dst[0] = self.is_initialized as u8;
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        owner_dst.copy_from_slice(self.owner.as_ref());
        *balance_dst = self.balance.to_le_bytes();
        consumer_count_dst[0] = self.consumer_count;
        for (chunk, consumer) in consumers_dst.chunks_exact_mut(32).zip(self.consumers.iter()) {
            chunk.copy_from_slice(consumer.as_ref());
        }
    }
}

impl Pack for RequestRecord {
    const LEN: usize = 1 + 8 + 8 + 32 + 32 + 2 + 4 + 4 + 1;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, RequestRecord::LEN];
        let (
            is_initialized,
            request_id,
            subscription_id,
            consumer,
            gas_lane,
            request_confirmations,
            callback_gas_limit,
            num_words,
            fulfilled,
        ) = array_refs![src, 1, 8, 8, 32, 32, 2, 4, 4, 1];

        Ok(RequestRecord {
            is_initialized: is_initialized[0] != 0,
            request_id: u64::from_le_bytes(*request_id),
            subscription_id: u64::from_le_bytes(*subscription_id),
            consumer: Pubkey::new_from_array(*consumer),
            gas_lane: *gas_lane,
            request_confirmations: u16::from_le_bytes(*request_confirmations),
            callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
            num_words: u32::from_le_bytes(*num_words),
            fulfilled: fulfilled[0] != 0,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, RequestRecord::LEN];
        let (
            is_initialized_dst,
            request_id_dst,
            subscription_id_dst,
            consumer_dst,
            gas_lane_dst,
            request_confirmations_dst,
            callback_gas_limit_dst,
            num_words_dst,
            fulfilled_dst,
        ) = mut_array_refs![dst, 1, 8, 8, 32, 32, 2, 4, 4, 1];

        is_initialized_dst[0] = self.is_initialized as u8;
        *request_id_dst = self.request_id.to_le_bytes();
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        consumer_dst.copy_from_slice(self.consumer.as_ref());
        *gas_lane_dst = self.gas_lane;
        *request_confirmations_dst = self.request_confirmations.to_le_bytes();
        *callback_gas_limit_dst = self.callback_gas_limit.to_le_bytes();
        *num_words_dst = self.num_words.to_le_bytes();
        fulfilled_dst[0] = self.fulfilled as u8;
    }
}
