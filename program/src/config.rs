// Raffle settings and per-cluster presets
use solana_program::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};
use std::str::FromStr;

use crate::error::RaffleError;
use crate::instruction::InitializeArgs;
use crate::state::{RandomnessConfig, NUM_WORDS};

/// Upper bound on entries per raffle account (keeps it under 10KiB)
pub const MAX_PARTICIPANTS: u32 = 300;

/// Networks with known settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cluster {
    Localnet,
    Devnet,
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            "devnet" => Ok(Cluster::Devnet),
            other => Err(format!("no raffle settings for cluster {}", other)),
        }
    }
}

/// Everything needed to initialize a raffle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleSettings {
    pub entrance_fee: u64,
    pub interval: u64,
    pub max_participants: u32,
    pub gas_lane: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub coordinator_program: Pubkey,
}

impl RaffleSettings {
    /// Preset for `cluster`. The local coordinator is deployed per test run,
    /// so its program id and subscription are supplied by the caller.
    pub fn for_cluster(cluster: Cluster, coordinator_program: Pubkey, subscription_id: u64) -> Self {
        match cluster {
            Cluster::Localnet => Self {
                entrance_fee: LAMPORTS_PER_SOL / 100,
                interval: 30,
                max_participants: 64,
                gas_lane: [0u8; 32],
                subscription_id,
                request_confirmations: 1,
                callback_gas_limit: 500_000,
                coordinator_program,
            },
            Cluster::Devnet => Self {
                entrance_fee: LAMPORTS_PER_SOL / 100,
                interval: 30,
                max_participants: MAX_PARTICIPANTS,
                gas_lane: [0u8; 32],
                subscription_id,
                request_confirmations: 3,
                callback_gas_limit: 500_000,
                coordinator_program,
            },
        }
    }

    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.entrance_fee == 0 {
            return Err(RaffleError::InvalidSettings("entrance fee must be positive"));
        }
        if self.interval > i64::MAX as u64 {
            return Err(RaffleError::InvalidSettings("interval out of range"));
        }
        if self.max_participants == 0 || self.max_participants > MAX_PARTICIPANTS {
            return Err(RaffleError::InvalidSettings("participant capacity out of range"));
        }
        if self.callback_gas_limit == 0 {
            return Err(RaffleError::InvalidSettings("callback gas limit must be positive"));
        }
        if self.coordinator_program == Pubkey::default() {
            return Err(RaffleError::InvalidSettings("coordinator program missing"));
        }
        Ok(())
    }

    /// Instruction arguments for these settings
    pub fn initialize_args(&self) -> InitializeArgs {
        InitializeArgs {
            entrance_fee: self.entrance_fee,
            interval: self.interval,
            max_participants: self.max_participants,
            gas_lane: self.gas_lane,
            subscription_id: self.subscription_id,
            request_confirmations: self.request_confirmations,
            callback_gas_limit: self.callback_gas_limit,
            coordinator_program: self.coordinator_program,
        }
    }
}

impl From<InitializeArgs> for RaffleSettings {
    fn from(args: InitializeArgs) -> Self {
        Self {
            entrance_fee: args.entrance_fee,
            interval: args.interval,
            max_participants: args.max_participants,
            gas_lane: args.gas_lane,
            subscription_id: args.subscription_id,
            request_confirmations: args.request_confirmations,
            callback_gas_limit: args.callback_gas_limit,
            coordinator_program: args.coordinator_program,
        }
    }
}

impl From<&RaffleSettings> for RandomnessConfig {
    fn from(settings: &RaffleSettings) -> Self {
        Self {
            gas_lane: settings.gas_lane,
            subscription_id: settings.subscription_id,
            request_confirmations: settings.request_confirmations,
            callback_gas_limit: settings.callback_gas_limit,
            num_words: NUM_WORDS,
        }
    }
}
