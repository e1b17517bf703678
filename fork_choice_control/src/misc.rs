use strum::IntoStaticStr;

/// Outcome of [`ChainMaintainer::receive_block`](crate::ChainMaintainer::receive_block).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockStatus {
    AlreadyKnown,
    /// The parent is missing. The block is validated when the parent arrives.
    Staged,
    Admitted,
    Rejected(RejectionReason),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RejectionReason {
    RootMismatch,
    InvalidAttestation,
    InvalidParent,
    ParentStateUnavailable,
    SlotNotAfterParent,
    TooManyEmptySlots,
    InvalidStateTransition,
}
