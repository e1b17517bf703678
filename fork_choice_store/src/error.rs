use thiserror::Error;
use types::primitives::H256;

#[derive(Debug, Error)]
pub enum Error {
    #[error("block is already known: {root:?}")]
    BlockAlreadyKnown { root: H256 },
    #[error("attempted to invalidate finalized block {root:?}")]
    InvalidatingFinalizedBlock { root: H256 },
    #[error("attempted to make invalid block {root:?} the head")]
    InvalidHead { root: H256 },
    #[error("blocks {first:?} and {second:?} have no common ancestor")]
    NoCommonAncestor { first: H256, second: H256 },
    #[error("block {ancestor:?} is not an ancestor of block {descendant:?}")]
    NotAnAncestor { ancestor: H256, descendant: H256 },
    #[error("parent {parent_root:?} of block {root:?} is not known")]
    ParentUnknown { root: H256, parent_root: H256 },
    #[error("staged block {root:?} was released without its parent {parent_root:?}")]
    StagedBlockWithoutParent { root: H256, parent_root: H256 },
    #[error("block is not known: {root:?}")]
    UnknownBlock { root: H256 },
}
