use core::num::NonZeroU64;
use std::borrow::Cow;

use anyhow::Result;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};

use crate::primitives::Gwei;

/// Protocol parameters customizable at runtime.
///
/// Every component receives the same `Config` through an `Arc` at construction time.
/// Missing fields in a YAML file fall back to the values from [`Config::mainnet`].
#[expect(
    clippy::unsafe_derive_deserialize,
    reason = "A false positive triggered by `nonzero!`. \
              `Config` has no invariants beyond the types of its fields."
)]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,

    // Time
    pub slots_per_epoch: NonZeroU64,
    pub min_attestation_inclusion_delay: NonZeroU64,

    // Balances
    pub effective_balance_increment: NonZeroU64,
    pub max_effective_balance: Gwei,
    pub base_reward_factor: u64,
    pub hysteresis_quotient: NonZeroU64,
    pub hysteresis_downward_multiplier: u64,
    pub hysteresis_upward_multiplier: u64,

    // Inactivity leak
    pub inactivity_score_bias: NonZeroU64,
    pub inactivity_score_recovery_rate: u64,
    pub inactivity_penalty_quotient: NonZeroU64,
    pub min_epochs_to_inactivity_penalty: u64,

    // Execution
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl Config {
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),

            slots_per_epoch: nonzero!(32_u64),
            min_attestation_inclusion_delay: nonzero!(1_u64),

            effective_balance_increment: nonzero!(1_000_000_000_u64),
            max_effective_balance: 32_000_000_000,
            base_reward_factor: 64,
            hysteresis_quotient: nonzero!(4_u64),
            hysteresis_downward_multiplier: 1,
            hysteresis_upward_multiplier: 5,

            inactivity_score_bias: nonzero!(4_u64),
            inactivity_score_recovery_rate: 16,
            inactivity_penalty_quotient: nonzero!(50_331_648_u64),
            min_epochs_to_inactivity_penalty: 4,

            max_call_depth: 32,
        }
    }

    /// Same as [`Config::mainnet`] but with short epochs for quick simulations.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            config_name: Cow::Borrowed("minimal"),
            slots_per_epoch: nonzero!(8_u64),
            ..Self::mainnet()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    #[must_use]
    pub const fn hysteresis_increment(&self) -> Gwei {
        self.effective_balance_increment.get() / self.hysteresis_quotient.get()
    }
}
