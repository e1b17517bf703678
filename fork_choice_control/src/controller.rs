use core::mem;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use anyhow::{ensure, Result};
use fork_choice_store::{Admission, BlockTree, ChainChange, ForkChoiceAggregator, StoreConfig};
use helper_functions::{accessors, misc};
use itertools::Itertools as _;
use ledger::{LedgerState, Receipt};
use tracing::{debug, info, warn};
use types::{
    config::Config,
    consensus_state::ConsensusState,
    consts::GENESIS_SLOT,
    containers::{Attestation, Block, Checkpoint},
    primitives::{AccountId, Epoch, Gwei, Nonce, Slot, ValidatorIndex, H256},
    transactions::Transaction,
};

use crate::{
    error::{Error, InvalidAttestation},
    messages::ChainMessage,
    misc::{BlockStatus, RejectionReason},
    pools::{AttestationPool, TransactionPool},
    unbounded_sink::UnboundedSink,
};

/// Everything a single node knows about the chain.
///
/// The ledger always reflects the transactions of the blocks from genesis to the head of the
/// block tree. Every valid block that does not conflict with finality has a consensus state.
pub struct ChainMaintainer<S> {
    config: Arc<Config>,
    store_config: StoreConfig,
    tree: BlockTree,
    aggregator: ForkChoiceAggregator,
    states: HashMap<H256, Arc<ConsensusState>>,
    validator_count: usize,
    ledger: LedgerState,
    ledger_head: H256,
    receipts: HashMap<H256, Vec<Receipt>>,
    transaction_pool: TransactionPool,
    attestation_pool: AttestationPool,
    justified_checkpoint: Checkpoint,
    finalized_checkpoint: Checkpoint,
    prune_pending: bool,
    current_slot: Slot,
    sink: S,
}

impl<S: UnboundedSink<ChainMessage>> ChainMaintainer<S> {
    /// Starts a node at genesis with one validator per balance in `validator_balances`.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        store_config: StoreConfig,
        validator_balances: impl IntoIterator<Item = Gwei>,
        ledger: LedgerState,
        sink: S,
    ) -> Self {
        let genesis = Block::genesis();
        let root = genesis.root;
        let state = ConsensusState::genesis(&config, root, validator_balances);
        let checkpoint = state.finalized_checkpoint;

        Self {
            aggregator: ForkChoiceAggregator::new(Arc::clone(&config), root),
            tree: BlockTree::new(genesis),
            validator_count: state.validator_count(),
            states: HashMap::from([(root, Arc::new(state))]),
            ledger,
            ledger_head: root,
            receipts: HashMap::from([(root, vec![])]),
            transaction_pool: TransactionPool::default(),
            attestation_pool: AttestationPool::default(),
            justified_checkpoint: checkpoint,
            finalized_checkpoint: checkpoint,
            prune_pending: false,
            current_slot: GENESIS_SLOT,
            config,
            store_config,
            sink,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store_config(&self) -> &StoreConfig {
        &self.store_config
    }

    #[must_use]
    pub const fn tree(&self) -> &BlockTree {
        &self.tree
    }

    #[must_use]
    pub const fn aggregator(&self) -> &ForkChoiceAggregator {
        &self.aggregator
    }

    #[must_use]
    pub fn head_root(&self) -> H256 {
        self.tree.head_root()
    }

    #[must_use]
    pub fn state(&self, root: H256) -> Option<Arc<ConsensusState>> {
        self.states.get(&root).map(Arc::clone)
    }

    pub fn head_state(&self) -> Result<Arc<ConsensusState>> {
        let root = self.head_root();
        self.state(root)
            .ok_or_else(|| Error::MissingState { root }.into())
    }

    #[must_use]
    pub const fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    #[must_use]
    pub const fn ledger_head(&self) -> H256 {
        self.ledger_head
    }

    /// Receipts of a block on the chain the ledger currently reflects.
    #[must_use]
    pub fn receipts(&self, root: H256) -> Option<&[Receipt]> {
        self.receipts.get(&root).map(Vec::as_slice)
    }

    #[must_use]
    pub const fn justified_checkpoint(&self) -> Checkpoint {
        self.justified_checkpoint
    }

    #[must_use]
    pub const fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    #[must_use]
    pub const fn current_slot(&self) -> Slot {
        self.current_slot
    }

    #[must_use]
    pub const fn attestation_pool(&self) -> &AttestationPool {
        &self.attestation_pool
    }

    #[must_use]
    pub const fn pending_transactions_by_account(
        &self,
    ) -> &BTreeMap<AccountId, BTreeMap<Nonce, Transaction>> {
        self.transaction_pool.by_account()
    }

    /// Queues `transaction` for inclusion in a future block.
    ///
    /// Returns `false` if the nonce has been used already or another transaction with the same
    /// sender and nonce is pending.
    pub fn submit_transaction(&mut self, transaction: Transaction) -> bool {
        let next_nonce = self.ledger.nonce(transaction.sender);

        if transaction.nonce < next_nonce {
            debug!(
                "ignoring transaction {:?} with used nonce {} (next nonce: {next_nonce})",
                transaction.hash(),
                transaction.nonce,
            );
            return false;
        }

        self.transaction_pool.insert(transaction)
    }

    /// Validates `block`, adds it to the block tree and moves the ledger to the new head.
    ///
    /// Blocks that fail validation never enter the tree. A block whose parent is unknown is staged
    /// and validated once the parent arrives. If it fails validation then, it stays in the tree
    /// flagged as invalid.
    pub fn receive_block(&mut self, block: Arc<Block>) -> Result<BlockStatus> {
        let root = block.root;

        if self.tree.contains(root) || self.tree.is_staged(root) {
            debug!("ignoring known block {root:?}");
            return Ok(BlockStatus::AlreadyKnown);
        }

        if let Some(reason) = self.validate_block(&block) {
            return Ok(reject(root, reason));
        }

        if self.tree.contains(block.parent_root) {
            match self.derive_state(&block) {
                Ok(state) => {
                    self.states.insert(root, Arc::new(state));
                }
                Err(reason) => return Ok(reject(root, reason)),
            }
        }

        let admitted = match self.tree.add_block(block)? {
            Admission::AlreadyKnown => return Ok(BlockStatus::AlreadyKnown),
            Admission::Staged => return Ok(BlockStatus::Staged),
            Admission::Admitted { admitted, .. } => admitted,
        };

        for admitted_root in admitted {
            self.on_admitted(admitted_root)?;
        }

        self.update_head()?;

        Ok(BlockStatus::Admitted)
    }

    /// Validates `attestation` and counts it toward the fork choice.
    ///
    /// Returns `false` if the attestation is invalid or has been seen before.
    pub fn receive_attestation(&mut self, attestation: Attestation) -> Result<bool> {
        if self.attestation_pool.contains(&attestation) {
            debug!("ignoring known attestation {:?}", attestation.hash());
            return Ok(false);
        }

        if let Err(error) = self.validate_attestation(&attestation) {
            warn!(
                "rejected attestation from validator {}: {error}",
                attestation.validator_index,
            );
            return Ok(false);
        }

        let state = self.head_state()?;

        self.aggregator
            .process_votes([&attestation], &self.tree, &state)?;

        self.attestation_pool.insert(attestation);
        self.update_head()?;

        ChainMessage::DiffuseAttestation(attestation).send(&self.sink);

        Ok(true)
    }

    /// Advances the clock to `slot`.
    ///
    /// Every validator in `attesters` that this node controls attests to the current head.
    pub fn next_slot(&mut self, slot: Slot, attesters: &[ValidatorIndex]) -> Result<()> {
        ensure!(
            slot >= self.current_slot,
            Error::ClockRegression {
                current: self.current_slot,
                new: slot,
            },
        );

        self.current_slot = slot;
        self.aggregator.prune(slot, &self.tree)?;

        let local_attesters = attesters
            .iter()
            .copied()
            .filter(|index| self.store_config.local_validators.contains(index))
            .collect_vec();

        if local_attesters.is_empty() {
            return Ok(());
        }

        let head = self.head_root();
        let head_state = self.head_state()?;
        let view = transition_functions::derive(&self.config, &head_state, slot, &self.tree)?;
        let epoch = misc::compute_epoch_at_slot(&self.config, slot);

        let target = self
            .tree
            .get_checkpoint_from_epoch(&self.config, epoch, head)
            .ok_or(transition_functions::Error::CheckpointUnavailable {
                epoch,
                viewpoint: head,
            })?;

        for validator_index in local_attesters {
            let attestation = Attestation {
                validator_index,
                epoch,
                slot,
                index: 0,
                beacon_block_root: head,
                source: view.current_justified_checkpoint,
                target,
            };

            self.receive_attestation(attestation)?;
        }

        Ok(())
    }

    /// Prunes data that can no longer affect the chain once `epoch` starts.
    pub fn next_epoch(&mut self, epoch: Epoch) -> Result<()> {
        let start_slot = misc::compute_start_slot_at_epoch(&self.config, epoch);

        self.next_slot(start_slot.max(self.current_slot), &[])?;
        self.prune_below_finality();

        self.attestation_pool
            .prune(start_slot.saturating_sub(self.config.slots_per_epoch.get()));

        info!(
            "epoch {epoch} started (head: {:?}, justified: {}, finalized: {})",
            self.head_root(),
            self.justified_checkpoint,
            self.finalized_checkpoint,
        );

        Ok(())
    }

    /// Pending attestations that a block built on the current head at `slot` can include.
    pub fn attestations_for_inclusion(&self, slot: Slot) -> Result<Vec<Attestation>> {
        let head = self.head_root();
        let head_state = self.head_state()?;
        let view = transition_functions::derive(&self.config, &head_state, slot, &self.tree)?;

        let attestations = self
            .attestation_pool
            .pending()
            .filter(|attestation| {
                usize::try_from(attestation.validator_index)
                    .is_ok_and(|index| index < self.validator_count)
            })
            .filter(|attestation| {
                accessors::get_attestation_participation_flags(
                    &self.config,
                    &view,
                    &self.tree,
                    head,
                    attestation,
                )
                .is_ok()
            })
            .copied()
            .sorted_by_key(|attestation| {
                (
                    attestation.slot,
                    attestation.validator_index,
                    attestation.hash(),
                )
            })
            .collect();

        Ok(attestations)
    }

    /// Builds a block on the current head from the pools.
    ///
    /// Only transactions that execute on top of the current ledger are included.
    pub fn build_block(
        &self,
        slot: Slot,
        proposer_index: ValidatorIndex,
        seed: H256,
    ) -> Result<Block> {
        let mut scratch = self.ledger.clone();

        let transactions = self
            .transaction_pool
            .executable(&self.ledger)
            .into_iter()
            .filter(|transaction| {
                execution_engine::process_tx(&self.config, &mut scratch, transaction).is_ok()
            })
            .collect();

        Ok(Block::new(
            self.head_root(),
            proposer_index,
            slot,
            transactions,
            self.attestations_for_inclusion(slot)?,
            seed,
        ))
    }

    fn validate_block(&self, block: &Block) -> Option<RejectionReason> {
        if !block.verify_root() {
            return Some(RejectionReason::RootMismatch);
        }

        let malformed = block
            .attestations
            .iter()
            .find_map(|attestation| attestation.validate_structure(&self.config).err());

        if let Some(error) = malformed {
            warn!("block {:?} contains a malformed attestation: {error}", block.root);
            return Some(RejectionReason::InvalidAttestation);
        }

        None
    }

    fn derive_state(&self, block: &Block) -> Result<ConsensusState, RejectionReason> {
        let root = block.root;

        let Some(parent) = self.tree.get_block(block.parent_root) else {
            return Err(RejectionReason::ParentStateUnavailable);
        };

        if !parent.is_valid() {
            return Err(RejectionReason::InvalidParent);
        }

        if block.slot <= parent.slot() {
            return Err(RejectionReason::SlotNotAfterParent);
        }

        if block.slot - parent.slot() > self.store_config.max_empty_slots {
            return Err(RejectionReason::TooManyEmptySlots);
        }

        let Some(parent_state) = self.states.get(&block.parent_root) else {
            return Err(RejectionReason::ParentStateUnavailable);
        };

        transition_functions::state_transition(&self.config, parent_state, block, &self.tree)
            .map_err(|error| {
                warn!("block {root:?} failed the state transition: {error:#}");
                RejectionReason::InvalidStateTransition
            })
    }

    fn validate_attestation(&self, attestation: &Attestation) -> Result<(), InvalidAttestation> {
        let Attestation {
            validator_index,
            epoch,
            slot,
            beacon_block_root: root,
            source,
            target,
            ..
        } = *attestation;

        attestation.validate_structure(&self.config)?;

        if !usize::try_from(validator_index).is_ok_and(|index| index < self.validator_count) {
            return Err(InvalidAttestation::UnknownValidator { validator_index });
        }

        if slot > self.current_slot {
            return Err(InvalidAttestation::FutureSlot {
                slot,
                current_slot: self.current_slot,
            });
        }

        let Some(link) = self.tree.get_block(root) else {
            return Err(InvalidAttestation::UnknownBlock { root });
        };

        if link.slot() > slot {
            return Err(InvalidAttestation::BlockAfterAttestation {
                root,
                block_slot: link.slot(),
                slot,
            });
        }

        let view = self
            .states
            .get(&root)
            .and_then(|state| {
                transition_functions::derive(&self.config, state, slot, &self.tree).ok()
            })
            .ok_or(InvalidAttestation::StateUnavailable { root })?;

        if view.current_justified_checkpoint != source {
            return Err(InvalidAttestation::SourceMismatch {
                expected: view.current_justified_checkpoint,
                actual: source,
            });
        }

        let expected_target = self.tree.get_checkpoint_from_epoch(&self.config, epoch, root);

        if expected_target != Some(target) {
            return Err(InvalidAttestation::TargetMismatch {
                expected: expected_target,
                actual: target,
            });
        }

        Ok(())
    }

    // `root` has just been admitted. Its state has been derived already unless it was staged.
    fn on_admitted(&mut self, root: H256) -> Result<()> {
        let Some(link) = self.tree.get_block(root) else {
            return Err(fork_choice_store::Error::UnknownBlock { root }.into());
        };

        let block = Arc::clone(&link.block);

        if !link.is_valid() {
            debug!("block {root:?} descends from an invalid block");
            return Ok(());
        }

        let state = match self.states.get(&root) {
            Some(state) => Arc::clone(state),
            None => match self.derive_state(&block) {
                Ok(state) => {
                    let state = Arc::new(state);
                    self.states.insert(root, Arc::clone(&state));
                    state
                }
                Err(reason) => {
                    let reason_name: &'static str = reason.into();
                    warn!("staged block {root:?} is invalid: {reason_name}");
                    self.tree.mark_invalid(root)?;
                    return Ok(());
                }
            },
        };

        let updated = self
            .aggregator
            .process_votes(&block.attestations, &self.tree, &state)?;

        debug!("block {root:?} updated {updated} latest messages");

        ChainMessage::DiffuseBlock(block).send(&self.sink);

        Ok(())
    }

    // Only the state of a block the ledger has executed may move the store checkpoints.
    // Returns `true` if the justified block changed.
    fn update_checkpoints(&mut self) -> Result<bool> {
        let state = self.state(self.ledger_head).ok_or(Error::MissingState {
            root: self.ledger_head,
        })?;

        let justified = state.current_justified_checkpoint;
        let finalized = state.finalized_checkpoint;
        let mut rebased = false;

        if justified.epoch > self.justified_checkpoint.epoch {
            info!("justified checkpoint {justified}");

            self.justified_checkpoint = justified;
            self.tree.mark_justified(justified.root)?;
            self.aggregator.rebase(justified.root, &self.tree)?;
            rebased = true;
        }

        if finalized.epoch > self.finalized_checkpoint.epoch {
            info!("finalized checkpoint {finalized}");

            self.finalized_checkpoint = finalized;
            self.tree.mark_finalized(finalized.root)?;
            self.prune_pending = true;
        }

        Ok(rebased)
    }

    fn update_head(&mut self) -> Result<()> {
        loop {
            self.aggregator.select_head(&mut self.tree)?;

            let change = self.tree.find_path(self.ledger_head, self.head_root())?;

            self.reorg(change)?;

            if !self.update_checkpoints()? {
                break;
            }
        }

        if mem::take(&mut self.prune_pending) {
            self.prune_below_finality();
        }

        Ok(())
    }

    /// Moves the ledger along `change`.
    ///
    /// Blocks in `change.reverted` are undone most recent first. Blocks in `change.added` are
    /// applied oldest first. A block containing an invalid transaction is marked invalid, the head
    /// is chosen again and the ledger moves toward the new head instead.
    fn reorg(&mut self, mut change: ChainChange) -> Result<()> {
        loop {
            if change.is_reorganization() {
                info!(
                    "reorganizing from {:?} to {:?} (reverting {} blocks, applying {})",
                    self.ledger_head,
                    change.new_head(),
                    change.reverted.len(),
                    change.added.len(),
                );
            }

            for root in &change.reverted {
                self.revert_block(*root)?;
            }

            let mut failed = None;

            for root in &change.added {
                if !self.execute_block(*root)? {
                    failed = Some(*root);
                    break;
                }
            }

            let Some(invalid_root) = failed else {
                return Ok(());
            };

            warn!("block {invalid_root:?} contains an invalid transaction");

            self.tree.mark_invalid(invalid_root)?;
            self.aggregator.select_head(&mut self.tree)?;

            change = self.tree.find_path(self.ledger_head, self.head_root())?;
        }
    }

    /// Applies the transactions of block `root` on top of the ledger.
    ///
    /// Returns `false` and leaves the ledger as it was if any transaction is invalid.
    /// Transactions of the block applied before the invalid one are returned to the pool.
    fn execute_block(&mut self, root: H256) -> Result<bool> {
        let block = self.block(root)?;

        ensure!(
            block.parent_root == self.ledger_head,
            Error::LedgerHeadMismatch {
                root,
                ledger_head: self.ledger_head,
            },
        );

        let mut receipts = Vec::with_capacity(block.transactions.len());

        for transaction in &block.transactions {
            match execution_engine::process_tx(&self.config, &mut self.ledger, transaction) {
                Ok(receipt) => receipts.push(receipt),
                Err(error) => {
                    warn!(
                        "transaction {:?} in block {root:?} is invalid: {error}",
                        transaction.hash(),
                    );

                    for receipt in receipts.iter().rev() {
                        self.ledger.revert_receipt(receipt)?;
                    }

                    for transaction in block.transactions.iter().take(receipts.len()) {
                        self.transaction_pool.insert(transaction.clone());
                    }

                    return Ok(false);
                }
            }
        }

        debug!(
            "applied block {root:?} ({} transactions, {} reverted)",
            receipts.len(),
            receipts.iter().filter(|receipt| receipt.reverted).count(),
        );

        self.receipts.insert(root, receipts);
        self.ledger_head = root;
        self.transaction_pool.prune(&self.ledger);
        self.attestation_pool.include(&block);

        Ok(true)
    }

    fn revert_block(&mut self, root: H256) -> Result<()> {
        ensure!(
            root == self.ledger_head,
            Error::LedgerHeadMismatch {
                root,
                ledger_head: self.ledger_head,
            },
        );

        let block = self.block(root)?;

        let receipts = self
            .receipts
            .remove(&root)
            .ok_or(Error::MissingReceipts { root })?;

        for receipt in receipts.iter().rev() {
            self.ledger.revert_receipt(receipt)?;
        }

        for transaction in &block.transactions {
            self.transaction_pool.insert(transaction.clone());
        }

        self.attestation_pool.exclude(&block);
        self.ledger_head = block.parent_root;

        debug!("reverted block {root:?}");

        Ok(())
    }

    // Keeps the finalized block and its descendants. Receipts of the chain the ledger reflects
    // are kept regardless.
    fn prune_below_finality(&mut self) {
        let finalized_root = self.finalized_checkpoint.root;
        let ledger_head = self.ledger_head;
        let tree = &self.tree;
        let state_count = self.states.len();

        self.states
            .retain(|root, _| tree.is_ancestor(finalized_root, *root));

        self.receipts.retain(|root, _| {
            tree.is_ancestor(finalized_root, *root) || tree.is_ancestor(*root, ledger_head)
        });

        debug!(
            "pruned {} states below finalized block {finalized_root:?}",
            state_count - self.states.len(),
        );
    }

    fn block(&self, root: H256) -> Result<Arc<Block>> {
        self.tree
            .get_block(root)
            .map(|link| Arc::clone(&link.block))
            .ok_or_else(|| fork_choice_store::Error::UnknownBlock { root }.into())
    }
}

fn reject(root: H256, reason: RejectionReason) -> BlockStatus {
    let reason_name: &'static str = reason.into();
    warn!("rejected block {root:?}: {reason_name}");
    BlockStatus::Rejected(reason)
}
