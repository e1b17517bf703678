use std::sync::Arc;

use derive_more::{Debug, Display};
use types::{
    containers::Block,
    primitives::{Gwei, Height, Slot, H256},
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Display)]
#[debug("{_0}")]
#[display("{_0}")]
pub struct NodeIndex(pub(crate) usize);

/// A block admitted into the [`BlockTree`](crate::BlockTree).
///
/// The flags only ever change from `false` to `true`.
#[derive(Clone, Debug)]
pub struct ChainLink {
    #[debug("{:?}", block.root)]
    pub block: Arc<Block>,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    pub height: Height,
    pub justified: bool,
    pub finalized: bool,
    pub invalid: bool,
}

impl ChainLink {
    #[must_use]
    pub fn root(&self) -> H256 {
        self.block.root
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        self.block.slot
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !self.invalid
    }
}

/// Movement of the head between two blocks.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct ChainChange {
    /// Blocks that left the canonical chain, most recent first.
    pub reverted: Vec<H256>,
    /// Blocks that joined the canonical chain, oldest first.
    pub added: Vec<H256>,
}

impl ChainChange {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reverted.is_empty() && self.added.is_empty()
    }

    #[must_use]
    pub fn is_reorganization(&self) -> bool {
        !self.reverted.is_empty()
    }

    #[must_use]
    pub fn new_head(&self) -> Option<H256> {
        self.added.last().copied()
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Admission {
    AlreadyKnown,
    /// The parent is missing. The block will be admitted when it arrives.
    Staged,
    Admitted {
        /// The block and any staged descendants it released, parents before children.
        admitted: Vec<H256>,
        head_change: Option<ChainChange>,
    },
}

impl Admission {
    #[must_use]
    pub fn admitted(&self) -> &[H256] {
        match self {
            Self::Admitted { admitted, .. } => admitted,
            Self::AlreadyKnown | Self::Staged => &[],
        }
    }

    #[must_use]
    pub const fn head_change(&self) -> Option<&ChainChange> {
        match self {
            Self::Admitted { head_change, .. } => head_change.as_ref(),
            Self::AlreadyKnown | Self::Staged => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LatestMessage {
    pub slot: Slot,
    pub beacon_block_root: H256,
    /// Effective balance of the voter when the vote was counted.
    pub weight: Gwei,
}
