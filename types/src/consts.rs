use core::num::NonZeroU64;

use nonzero_ext::nonzero;
use static_assertions::const_assert_eq;

use crate::primitives::{Epoch, Slot};

pub const GENESIS_EPOCH: Epoch = 0;
pub const GENESIS_SLOT: Slot = 0;

pub const JUSTIFICATION_BITS_LENGTH: usize = 4;

pub const TIMELY_SOURCE_FLAG_INDEX: usize = 0;
pub const TIMELY_TARGET_FLAG_INDEX: usize = 1;
pub const TIMELY_HEAD_FLAG_INDEX: usize = 2;

pub const TIMELY_SOURCE_WEIGHT: u64 = 14;
pub const TIMELY_TARGET_WEIGHT: u64 = 26;
pub const TIMELY_HEAD_WEIGHT: u64 = 14;

pub const PARTICIPATION_FLAG_WEIGHTS: [(usize, u64); 3] = [
    (TIMELY_SOURCE_FLAG_INDEX, TIMELY_SOURCE_WEIGHT),
    (TIMELY_TARGET_FLAG_INDEX, TIMELY_TARGET_WEIGHT),
    (TIMELY_HEAD_FLAG_INDEX, TIMELY_HEAD_WEIGHT),
];

// Sync committees are not modeled, but their weight is still reserved in the denominator.
pub const SYNC_REWARD_WEIGHT: u64 = 2;
pub const PROPOSER_WEIGHT: u64 = 8;
pub const WEIGHT_DENOMINATOR: NonZeroU64 = nonzero!(64_u64);

const_assert_eq!(
    WEIGHT_DENOMINATOR.get(),
    TIMELY_SOURCE_WEIGHT
        + TIMELY_TARGET_WEIGHT
        + TIMELY_HEAD_WEIGHT
        + SYNC_REWARD_WEIGHT
        + PROPOSER_WEIGHT,
);

/// `(WEIGHT_DENOMINATOR - PROPOSER_WEIGHT) * WEIGHT_DENOMINATOR / PROPOSER_WEIGHT`
pub const PROPOSER_REWARD_DENOMINATOR: NonZeroU64 = nonzero!(448_u64);

const_assert_eq!(
    PROPOSER_REWARD_DENOMINATOR.get(),
    (WEIGHT_DENOMINATOR.get() - PROPOSER_WEIGHT) * WEIGHT_DENOMINATOR.get() / PROPOSER_WEIGHT,
);

/// Name of the entry point run when a contract is deployed.
pub const CONSTRUCTOR: &str = "constructor";
