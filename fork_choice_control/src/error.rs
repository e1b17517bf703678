use thiserror::Error;
use types::{
    containers::Checkpoint,
    primitives::{Slot, ValidatorIndex, H256},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("clock cannot move from slot {current} back to slot {new}")]
    ClockRegression { current: Slot, new: Slot },
    #[error("block {root:?} does not border the ledger head {ledger_head:?}")]
    LedgerHeadMismatch { root: H256, ledger_head: H256 },
    #[error("block {root:?} cannot be reverted because its receipts are missing")]
    MissingReceipts { root: H256 },
    #[error("state of block {root:?} is not available")]
    MissingState { root: H256 },
}

/// Reasons an attestation is dropped by
/// [`ChainMaintainer::receive_attestation`](crate::ChainMaintainer::receive_attestation).
#[derive(Debug, Error)]
pub enum InvalidAttestation {
    #[error("validator {validator_index} is not known")]
    UnknownValidator { validator_index: ValidatorIndex },
    #[error("attestation is from slot {slot}, after the current slot {current_slot}")]
    FutureSlot { slot: Slot, current_slot: Slot },
    #[error("voted block {root:?} is not known")]
    UnknownBlock { root: H256 },
    #[error("voted block {root:?} is from slot {block_slot}, after the attestation slot {slot}")]
    BlockAfterAttestation {
        root: H256,
        block_slot: Slot,
        slot: Slot,
    },
    #[error("state of voted block {root:?} is not available")]
    StateUnavailable { root: H256 },
    #[error("source {actual} does not match {expected} in the view of the voted block")]
    SourceMismatch {
        expected: Checkpoint,
        actual: Checkpoint,
    },
    #[error("target {actual} does not match {expected:?} in the view of the voted block")]
    TargetMismatch {
        expected: Option<Checkpoint>,
        actual: Checkpoint,
    },
    #[error(transparent)]
    Malformed(#[from] types::error::Error),
}
