use thiserror::Error;
use types::primitives::{Epoch, Slot, ValidatorIndex, H256};

#[derive(Debug, Error)]
pub enum Error {
    #[error("block slot ({block_slot}) does not match state slot ({state_slot})")]
    BlockSlotMismatch { state_slot: Slot, block_slot: Slot },
    #[error("checkpoint for epoch {epoch} cannot be resolved from block {viewpoint:?}")]
    CheckpointUnavailable { epoch: Epoch, viewpoint: H256 },
    #[error("parent root in block ({in_block:?}) does not match state ({in_state:?})")]
    ParentRootMismatch { in_state: H256, in_block: H256 },
    #[error("proposer index out of bounds: {proposer_index}")]
    ProposerIndexOutOfBounds { proposer_index: ValidatorIndex },
    #[error("target slot ({target}) is not later than current slot ({current})")]
    SlotNotLater { current: Slot, target: Slot },
    #[error("validator index out of bounds: {validator_index}")]
    ValidatorIndexOutOfBounds { validator_index: ValidatorIndex },
}
