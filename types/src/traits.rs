use crate::primitives::{Slot, H256};

/// Read access to the chain ending at some block.
///
/// State transitions only need to resolve which block occupied a slot from the point of view of
/// a particular chain. Implemented by the block tree.
pub trait ChainView {
    /// Root of the last block at or before `slot` on the chain ending with `viewpoint`.
    ///
    /// Returns `None` if `viewpoint` is unknown.
    fn block_root_at_or_before(&self, viewpoint: H256, slot: Slot) -> Option<H256>;
}
