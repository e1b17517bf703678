use std::collections::HashMap;

use types::{
    containers::Block,
    primitives::{Slot, H256},
    traits::ChainView,
};

/// Minimal block index standing in for the block tree.
#[derive(Default)]
pub struct Chain {
    blocks: HashMap<H256, (Slot, H256)>,
}

impl Chain {
    pub fn new(genesis: &Block) -> Self {
        let mut chain = Self::default();
        chain.insert(genesis);
        chain
    }

    pub fn insert(&mut self, block: &Block) {
        self.blocks.insert(block.root, (block.slot, block.parent_root));
    }
}

impl ChainView for Chain {
    fn block_root_at_or_before(&self, viewpoint: H256, slot: Slot) -> Option<H256> {
        let mut root = viewpoint;

        loop {
            let (block_slot, parent_root) = *self.blocks.get(&root)?;

            if block_slot <= slot {
                return Some(root);
            }

            root = parent_root;
        }
    }
}
