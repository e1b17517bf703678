use std::sync::Arc;

use types::{
    containers::Block,
    primitives::{Slot, H256},
};

pub fn block(parent: &Block, slot: Slot) -> Arc<Block> {
    fork(parent, slot, 0)
}

/// Like [`block`], but with a seed so that siblings at the same slot get different roots.
pub fn fork(parent: &Block, slot: Slot, seed: u8) -> Arc<Block> {
    Arc::new(Block::new(
        parent.root,
        0,
        slot,
        vec![],
        vec![],
        H256::repeat_byte(seed),
    ))
}
