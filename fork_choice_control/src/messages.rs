use std::sync::Arc;

use tracing::debug;
use types::containers::{Attestation, Block};

use crate::unbounded_sink::UnboundedSink;

/// Objects a node passes on to its peers after accepting them.
#[derive(Clone, Debug)]
pub enum ChainMessage {
    DiffuseBlock(Arc<Block>),
    DiffuseAttestation(Attestation),
}

impl ChainMessage {
    pub(crate) fn send(self, tx: &impl UnboundedSink<Self>) {
        if tx.unbounded_send(self).is_err() {
            debug!("send to network failed because the receiver was dropped");
        }
    }
}
