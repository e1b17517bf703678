//! Block and attestation intake for a single simulated node.
//!
//! [`ChainMaintainer`] ties together the block tree, the fork choice, one consensus state per block
//! and the ledger. It validates incoming objects, keeps the ledger in step with the head of the
//! block tree and passes accepted objects on through an [`UnboundedSink`].
//!
//! The ledger follows the head through reorganizations. Blocks that turn out to contain invalid
//! transactions are marked invalid and the head is chosen again until the ledger reaches a head
//! whose transactions all apply.

pub use fork_choice_store::StoreConfig;

pub use crate::{
    controller::ChainMaintainer,
    error::{Error, InvalidAttestation},
    messages::ChainMessage,
    misc::{BlockStatus, RejectionReason},
    pools::{AttestationPool, TransactionPool},
    unbounded_sink::UnboundedSink,
};

mod controller;
mod error;
mod messages;
mod misc;
mod pools;
mod unbounded_sink;

#[cfg(test)]
mod helpers;
