use core::iter;
use std::{collections::HashMap, sync::Arc};

use anyhow::{bail, ensure, Result};
use helper_functions::accessors;
use tracing::debug;
use types::{
    config::Config,
    containers::{Block, Checkpoint},
    primitives::{Epoch, Slot, H256},
    traits::ChainView,
};

use crate::{
    error::Error,
    misc::{Admission, ChainChange, ChainLink, NodeIndex},
};

/// All known blocks descending from genesis, plus staged blocks waiting for their parents.
#[derive(Clone, Debug)]
pub struct BlockTree {
    links: Vec<ChainLink>,
    indices: HashMap<H256, NodeIndex>,
    // Keyed by the root of the missing parent.
    staged: HashMap<H256, Vec<Arc<Block>>>,
    head: NodeIndex,
}

impl BlockTree {
    #[must_use]
    pub fn new(genesis: Arc<Block>) -> Self {
        let root = genesis.root;

        let link = ChainLink {
            block: genesis,
            parent: None,
            children: vec![],
            height: 0,
            justified: true,
            finalized: true,
            invalid: false,
        };

        Self {
            links: vec![link],
            indices: HashMap::from([(root, NodeIndex(0))]),
            staged: HashMap::new(),
            head: NodeIndex(0),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn genesis(&self) -> &ChainLink {
        &self.links[0]
    }

    #[must_use]
    pub fn head(&self) -> &ChainLink {
        self.link(self.head)
    }

    #[must_use]
    pub fn head_root(&self) -> H256 {
        self.head().root()
    }

    #[must_use]
    pub fn contains(&self, root: H256) -> bool {
        self.indices.contains_key(&root)
    }

    #[must_use]
    pub fn is_staged(&self, root: H256) -> bool {
        self.staged
            .values()
            .flatten()
            .any(|block| block.root == root)
    }

    #[must_use]
    pub fn staged_count(&self) -> usize {
        self.staged.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn get_block(&self, root: H256) -> Option<&ChainLink> {
        self.index(root).map(|index| self.link(index))
    }

    #[must_use]
    pub fn get_children(&self, root: H256) -> Vec<H256> {
        self.get_block(root)
            .map(|link| {
                link.children
                    .iter()
                    .map(|child| self.link(*child).root())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Iterates over the block with `root` and all of its ancestors, newest first.
    pub fn ancestors(&self, root: H256) -> impl Iterator<Item = &ChainLink> {
        let start = self.get_block(root);
        iter::successors(start, |link| link.parent.map(|parent| self.link(parent)))
    }

    /// Admits `block` if its parent is known.
    ///
    /// The head moves to `block` only if it is valid and strictly higher than the current head.
    pub fn add_block_strict(&mut self, block: Arc<Block>) -> Result<Admission> {
        if self.contains(block.root) {
            return Ok(Admission::AlreadyKnown);
        }

        ensure!(
            self.contains(block.parent_root),
            Error::ParentUnknown {
                root: block.root,
                parent_root: block.parent_root,
            },
        );

        let old_head = self.head_root();
        let root = block.root;

        self.insert(block)?;

        Ok(Admission::Admitted {
            admitted: vec![root],
            head_change: self.change_from(old_head)?,
        })
    }

    /// Admits `block` if its parent is known and stages it otherwise.
    ///
    /// Admitting a block also admits every staged block that was waiting for it, directly or
    /// through other staged blocks.
    pub fn add_block(&mut self, block: Arc<Block>) -> Result<Admission> {
        if self.contains(block.root) || self.is_staged(block.root) {
            return Ok(Admission::AlreadyKnown);
        }

        if !self.contains(block.parent_root) {
            debug!(
                "staging block {:?} until its parent {:?} arrives",
                block.root, block.parent_root,
            );

            self.staged.entry(block.parent_root).or_default().push(block);

            return Ok(Admission::Staged);
        }

        let old_head = self.head_root();
        let mut admitted = vec![];
        let mut pending = vec![block];

        while let Some(block) = pending.pop() {
            let root = block.root;

            if !self.contains(block.parent_root) {
                bail!(Error::StagedBlockWithoutParent {
                    root,
                    parent_root: block.parent_root,
                });
            }

            self.insert(block)?;
            admitted.push(root);

            if let Some(mut released) = self.staged.remove(&root) {
                // Sort so that the outcome does not depend on the order blocks were staged in.
                released.sort_by_key(|block| core::cmp::Reverse(block.root));
                pending.extend(released);
            }
        }

        Ok(Admission::Admitted {
            admitted,
            head_change: self.change_from(old_head)?,
        })
    }

    /// Flags `root` and all of its descendants as invalid and moves the head to the best valid
    /// block if necessary.
    pub fn mark_invalid(&mut self, root: H256) -> Result<Option<ChainChange>> {
        let index = self.require(root)?;

        ensure!(
            !self.link(index).finalized,
            Error::InvalidatingFinalizedBlock { root },
        );

        let old_head = self.head_root();
        let mut pending = vec![index];

        while let Some(index) = pending.pop() {
            let link = &mut self.links[index.0];
            link.invalid = true;
            pending.extend(link.children.iter().copied());
        }

        if self.head().invalid {
            self.head = self.best_valid_head();
        }

        self.change_from(old_head)
    }

    /// The highest valid block. Ties are broken in favor of the greater root.
    #[must_use]
    pub fn best_valid_head(&self) -> NodeIndex {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, link)| link.is_valid())
            .max_by_key(|(_, link)| (link.height, link.root()))
            .map_or(NodeIndex(0), |(index, _)| NodeIndex(index))
    }

    pub fn set_head(&mut self, root: H256) -> Result<Option<ChainChange>> {
        let index = self.require(root)?;

        ensure!(self.link(index).is_valid(), Error::InvalidHead { root });

        let old_head = self.head_root();
        self.head = index;
        self.change_from(old_head)
    }

    pub fn mark_justified(&mut self, root: H256) -> Result<()> {
        let index = self.require(root)?;
        self.links[index.0].justified = true;
        Ok(())
    }

    /// Flags `root` and all of its ancestors as finalized.
    pub fn mark_finalized(&mut self, root: H256) -> Result<()> {
        let mut next = Some(self.require(root)?);

        while let Some(index) = next {
            let link = &mut self.links[index.0];

            if link.finalized {
                break;
            }

            link.finalized = true;
            link.justified = true;
            next = link.parent;
        }

        Ok(())
    }

    pub fn find_common_ancestor(&self, first: H256, second: H256) -> Result<H256> {
        let mut first_index = self.require(first)?;
        let mut second_index = self.require(second)?;

        while self.link(first_index).height > self.link(second_index).height {
            first_index = self.parent_of(first_index, first, second)?;
        }

        while self.link(second_index).height > self.link(first_index).height {
            second_index = self.parent_of(second_index, first, second)?;
        }

        while first_index != second_index {
            first_index = self.parent_of(first_index, first, second)?;
            second_index = self.parent_of(second_index, first, second)?;
        }

        Ok(self.link(first_index).root())
    }

    /// Blocks to revert and apply to move from `from` to `to`.
    pub fn find_path(&self, from: H256, to: H256) -> Result<ChainChange> {
        let ancestor = self.find_common_ancestor(from, to)?;

        let reverted = self
            .ancestors(from)
            .map(ChainLink::root)
            .take_while(|root| *root != ancestor)
            .collect();

        let mut added = self
            .ancestors(to)
            .map(ChainLink::root)
            .take_while(|root| *root != ancestor)
            .collect::<Vec<_>>();

        added.reverse();

        Ok(ChainChange { reverted, added })
    }

    /// Blocks from `ancestor` to `descendant` inclusive, oldest first.
    pub fn get_subchain(&self, ancestor: H256, descendant: H256) -> Result<Vec<H256>> {
        let ancestor_height = self.require_link(ancestor)?.height;

        let mut subchain = self
            .ancestors(descendant)
            .take_while(|link| link.height >= ancestor_height)
            .map(ChainLink::root)
            .collect::<Vec<_>>();

        ensure!(
            subchain.last() == Some(&ancestor),
            Error::NotAnAncestor {
                ancestor,
                descendant,
            },
        );

        subchain.reverse();

        Ok(subchain)
    }

    /// Whether `ancestor` is `descendant` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: H256, descendant: H256) -> bool {
        let Some(ancestor_height) = self.get_block(ancestor).map(|link| link.height) else {
            return false;
        };

        self.ancestors(descendant)
            .find(|link| link.height <= ancestor_height)
            .is_some_and(|link| link.root() == ancestor)
    }

    #[must_use]
    pub fn is_block_on_main_chain(&self, root: H256) -> bool {
        self.is_ancestor(root, self.head_root())
    }

    /// Last block at or before `slot` on the chain ending with `viewpoint`.
    #[must_use]
    pub fn block_at_or_before_slot(&self, viewpoint: H256, slot: Slot) -> Option<&ChainLink> {
        self.ancestors(viewpoint).find(|link| link.slot() <= slot)
    }

    #[must_use]
    pub fn get_checkpoint_from_epoch(
        &self,
        config: &Config,
        epoch: Epoch,
        viewpoint: H256,
    ) -> Option<Checkpoint> {
        accessors::get_checkpoint_from_epoch(config, self, viewpoint, epoch)
    }

    fn insert(&mut self, block: Arc<Block>) -> Result<NodeIndex> {
        let root = block.root;

        ensure!(!self.contains(root), Error::BlockAlreadyKnown { root });

        let parent_index = self.require(block.parent_root)?;
        let parent = self.link(parent_index);
        let index = NodeIndex(self.links.len());

        let link = ChainLink {
            block,
            parent: Some(parent_index),
            children: vec![],
            height: parent.height + 1,
            justified: false,
            finalized: false,
            invalid: parent.invalid,
        };

        let moves_head = link.is_valid() && link.height > self.head().height;

        self.links.push(link);
        self.links[parent_index.0].children.push(index);
        self.indices.insert(root, index);

        if moves_head {
            self.head = index;
        }

        Ok(index)
    }

    fn change_from(&self, old_head: H256) -> Result<Option<ChainChange>> {
        if old_head == self.head_root() {
            return Ok(None);
        }

        self.find_path(old_head, self.head_root()).map(Some)
    }

    fn parent_of(&self, index: NodeIndex, first: H256, second: H256) -> Result<NodeIndex> {
        self.link(index)
            .parent
            .ok_or_else(|| Error::NoCommonAncestor { first, second }.into())
    }

    fn index(&self, root: H256) -> Option<NodeIndex> {
        self.indices.get(&root).copied()
    }

    fn require(&self, root: H256) -> Result<NodeIndex> {
        self.index(root)
            .ok_or_else(|| Error::UnknownBlock { root }.into())
    }

    fn require_link(&self, root: H256) -> Result<&ChainLink> {
        self.require(root).map(|index| self.link(index))
    }

    fn link(&self, index: NodeIndex) -> &ChainLink {
        &self.links[index.0]
    }
}

impl ChainView for BlockTree {
    fn block_root_at_or_before(&self, viewpoint: H256, slot: Slot) -> Option<H256> {
        self.block_at_or_before_slot(viewpoint, slot)
            .map(ChainLink::root)
    }
}
