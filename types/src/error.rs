use thiserror::Error;

use crate::primitives::{Epoch, Slot};

#[derive(Debug, Error)]
pub enum Error {
    #[error("contract deployment must not specify a destination")]
    DeploymentWithDestination,
    #[error("contract call must specify a destination")]
    CallWithoutDestination,
    #[error("contract call must name a method")]
    CallWithoutMethod,
    #[error("attestation epoch does not match its slot (slot: {slot}, epoch: {epoch})")]
    AttestationEpochMismatch { slot: Slot, epoch: Epoch },
    #[error("attestation target epoch does not match its epoch (epoch: {epoch}, target: {target})")]
    AttestationTargetEpochMismatch { epoch: Epoch, target: Epoch },
    #[error("attestation source is newer than its target (source: {source_epoch}, target: {target})")]
    AttestationSourceAfterTarget { source_epoch: Epoch, target: Epoch },
}
