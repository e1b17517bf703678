use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::Result;
use tracing::debug;
use types::{
    config::Config,
    consensus_state::ConsensusState,
    containers::Attestation,
    primitives::{Gwei, Slot, ValidatorIndex, H256},
};

use crate::{
    block_tree::BlockTree,
    misc::{ChainChange, LatestMessage},
};

/// LMD-GHOST over the blocks descending from the justified block.
#[derive(Clone, Debug)]
pub struct ForkChoiceAggregator {
    config: Arc<Config>,
    justified_root: H256,
    latest_messages: HashMap<ValidatorIndex, LatestMessage>,
    weighed: HashSet<Attestation>,
    weights: HashMap<H256, Gwei>,
}

impl ForkChoiceAggregator {
    #[must_use]
    pub fn new(config: Arc<Config>, justified_root: H256) -> Self {
        Self {
            config,
            justified_root,
            latest_messages: HashMap::new(),
            weighed: HashSet::new(),
            weights: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn justified_root(&self) -> H256 {
        self.justified_root
    }

    #[must_use]
    pub fn weight(&self, root: H256) -> Gwei {
        self.weights.get(&root).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        self.latest_messages.get(&validator_index).copied()
    }

    /// Counts every attestation not counted before. Returns the number of latest messages updated.
    ///
    /// Votes are weighed by the effective balances in `state`. Votes for unknown blocks are left
    /// uncounted so that they can be counted once the block arrives.
    pub fn process_votes<'attestations>(
        &mut self,
        attestations: impl IntoIterator<Item = &'attestations Attestation>,
        tree: &BlockTree,
        state: &ConsensusState,
    ) -> Result<usize> {
        let mut updated = 0;

        for attestation in attestations {
            let root = attestation.beacon_block_root;

            if self.weighed.contains(attestation) || !tree.contains(root) {
                continue;
            }

            self.weighed.insert(*attestation);

            if !tree.is_ancestor(self.justified_root, root) {
                debug!("ignoring vote for {root:?} which does not descend from the justified block");
                continue;
            }

            let validator_index = attestation.validator_index;

            let Some(weight) = usize::try_from(validator_index)
                .ok()
                .and_then(|index| state.effective_balance(index))
            else {
                debug!("ignoring vote from unknown validator {validator_index}");
                continue;
            };

            let message = LatestMessage {
                slot: attestation.slot,
                beacon_block_root: root,
                weight,
            };

            match self.latest_messages.get(&validator_index).copied() {
                Some(old) if old.slot >= message.slot => continue,
                Some(old) => self.move_weight(tree, old, false)?,
                None => {}
            }

            self.move_weight(tree, message, true)?;
            self.latest_messages.insert(validator_index, message);

            updated += 1;
        }

        Ok(updated)
    }

    /// Drops votes more than one epoch older than `current_slot`.
    pub fn prune(&mut self, current_slot: Slot, tree: &BlockTree) -> Result<()> {
        let oldest_slot = current_slot.saturating_sub(self.config.slots_per_epoch.get());

        let stale = self
            .latest_messages
            .iter()
            .filter(|(_, message)| message.slot < oldest_slot)
            .map(|(validator_index, message)| (*validator_index, *message))
            .collect::<Vec<_>>();

        for (validator_index, message) in stale {
            self.move_weight(tree, message, false)?;
            self.latest_messages.remove(&validator_index);
        }

        self.weighed
            .retain(|attestation| attestation.slot >= oldest_slot);

        Ok(())
    }

    /// Recomputes all weights relative to a new justified block.
    pub fn rebase(&mut self, justified_root: H256, tree: &BlockTree) -> Result<()> {
        self.justified_root = justified_root;
        self.weights.clear();

        let messages = self.latest_messages.values().copied().collect::<Vec<_>>();

        for message in messages {
            self.move_weight(tree, message, true)?;
        }

        Ok(())
    }

    /// Walks down from the justified block, taking the heaviest valid child at every fork.
    /// Ties are broken in favor of the greater root.
    #[must_use]
    pub fn find_head(&self, tree: &BlockTree) -> H256 {
        let Some(justified) = tree.get_block(self.justified_root) else {
            return tree.head_root();
        };

        if !justified.is_valid() {
            return tree.head_root();
        }

        let mut head = justified.root();

        loop {
            let best_child = tree
                .get_children(head)
                .into_iter()
                .filter(|child| tree.get_block(*child).is_some_and(|link| link.is_valid()))
                .max_by_key(|child| (self.weight(*child), *child));

            match best_child {
                Some(child) => head = child,
                None => return head,
            }
        }
    }

    /// Moves the head of `tree` to the block chosen by [`Self::find_head`].
    pub fn select_head(&self, tree: &mut BlockTree) -> Result<Option<ChainChange>> {
        tree.set_head(self.find_head(tree))
    }

    fn move_weight(&mut self, tree: &BlockTree, message: LatestMessage, add: bool) -> Result<()> {
        let root = message.beacon_block_root;

        if !tree.is_ancestor(self.justified_root, root) {
            return Ok(());
        }

        for block_root in tree.get_subchain(self.justified_root, root)? {
            let weight = self.weights.entry(block_root).or_default();

            *weight = if add {
                weight.saturating_add(message.weight)
            } else {
                weight.saturating_sub(message.weight)
            };
        }

        Ok(())
    }
}
