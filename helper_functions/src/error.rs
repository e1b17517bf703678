use thiserror::Error;
use types::primitives::{Epoch, Slot, ValidatorIndex};

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("attestation source does not match justified checkpoint")]
    AttestationSourceMismatch,
    #[error("attestation from slot {attestation_slot} included too early at slot {state_slot}")]
    AttestationTooEarly {
        attestation_slot: Slot,
        state_slot: Slot,
    },
    #[error("epoch {epoch} is before previous one relative to state")]
    EpochBeforePrevious { epoch: Epoch },
    #[error("epoch {epoch} is in the future relative to state")]
    EpochInTheFuture { epoch: Epoch },
    #[error("validator index out of bounds: {validator_index}")]
    ValidatorIndexOutOfBounds { validator_index: ValidatorIndex },
}
