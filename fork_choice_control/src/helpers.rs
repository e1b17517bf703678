use std::sync::Arc;

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender};
use ledger::LedgerState;
use types::{
    config::Config,
    containers::{Attestation, Block},
    primitives::{AccountId, Balance, Gwei, Slot, ValidatorIndex, H256},
    transactions::Transaction,
};

use crate::{
    controller::ChainMaintainer,
    messages::ChainMessage,
    misc::{BlockStatus, RejectionReason},
    StoreConfig,
};

pub const BALANCE: Gwei = 32_000_000_000;

pub const ALICE: AccountId = AccountId::repeat_byte(0xa1);
pub const BOB: AccountId = AccountId::repeat_byte(0xb0);
pub const CAROL: AccountId = AccountId::repeat_byte(0xca);

pub struct Context {
    maintainer: ChainMaintainer<UnboundedSender<ChainMessage>>,
    network_rx: UnboundedReceiver<ChainMessage>,
}

impl Context {
    #[must_use]
    pub fn new(
        config: Config,
        store_config: StoreConfig,
        validator_count: usize,
        accounts: impl IntoIterator<Item = (AccountId, Balance)>,
    ) -> Self {
        logging::initialize_test_logger();

        let (network_tx, network_rx) = futures::channel::mpsc::unbounded();

        let maintainer = ChainMaintainer::new(
            Arc::new(config),
            store_config,
            vec![BALANCE; validator_count],
            LedgerState::with_balances(accounts),
            network_tx,
        );

        Self {
            maintainer,
            network_rx,
        }
    }

    /// 8 validators with 8 slots per epoch. Only validator 0 is local.
    #[must_use]
    pub fn minimal(accounts: impl IntoIterator<Item = (AccountId, Balance)>) -> Self {
        Self::new(
            Config::minimal(),
            StoreConfig::with_local_validators([0]),
            8,
            accounts,
        )
    }

    pub const fn maintainer(&self) -> &ChainMaintainer<UnboundedSender<ChainMessage>> {
        &self.maintainer
    }

    pub fn maintainer_mut(&mut self) -> &mut ChainMaintainer<UnboundedSender<ChainMessage>> {
        &mut self.maintainer
    }

    pub fn genesis(&self) -> Arc<Block> {
        Arc::clone(&self.maintainer.tree().genesis().block)
    }

    pub fn on_slot(&mut self, slot: Slot) {
        self.maintainer
            .next_slot(slot, &[])
            .expect("slots passed to Context::on_slot should only increase");
    }

    pub fn on_block(&mut self, block: &Arc<Block>) -> BlockStatus {
        self.maintainer
            .receive_block(Arc::clone(block))
            .expect("receiving a block should not fail fatally")
    }

    pub fn on_admitted_block(&mut self, block: &Arc<Block>) {
        assert_eq!(self.on_block(block), BlockStatus::Admitted);
    }

    pub fn on_staged_block(&mut self, block: &Arc<Block>) {
        assert_eq!(self.on_block(block), BlockStatus::Staged);
    }

    pub fn on_rejected_block(&mut self, block: &Arc<Block>, reason: RejectionReason) {
        assert_eq!(self.on_block(block), BlockStatus::Rejected(reason));
    }

    pub fn on_attestation(&mut self, attestation: Attestation) -> bool {
        self.maintainer
            .receive_attestation(attestation)
            .expect("receiving an attestation should not fail fatally")
    }

    /// An attestation for `root` whose checkpoints match the view of `root`.
    pub fn attestation(&self, validator_index: ValidatorIndex, slot: Slot, root: H256) -> Attestation {
        let config = self.maintainer.config();
        let epoch = slot / config.slots_per_epoch;

        let source = self
            .maintainer
            .state(root)
            .expect("voted block should have a state")
            .current_justified_checkpoint;

        let target = self
            .maintainer
            .tree()
            .get_checkpoint_from_epoch(config, epoch, root)
            .expect("voted block should be in the tree");

        Attestation {
            validator_index,
            epoch,
            slot,
            index: 0,
            beacon_block_root: root,
            source,
            target,
        }
    }

    /// Checks that both the block tree and the ledger are at `expected_root`.
    pub fn assert_head(&self, expected_root: H256) {
        assert_eq!(self.maintainer.head_root(), expected_root);
        assert_eq!(self.maintainer.ledger_head(), expected_root);
    }

    pub fn assert_balance(&self, account: AccountId, expected_balance: Balance) {
        assert_eq!(self.maintainer.ledger().balance(account), expected_balance);
    }

    pub fn next_message(&mut self) -> Option<ChainMessage> {
        self.network_rx.try_next().ok().flatten()
    }

    /// Drains outbound messages and returns the roots of diffused blocks in order.
    pub fn diffused_blocks(&mut self) -> Vec<H256> {
        core::iter::from_fn(|| self.next_message())
            .filter_map(|message| match message {
                ChainMessage::DiffuseBlock(block) => Some(block.root),
                ChainMessage::DiffuseAttestation(_) => None,
            })
            .collect()
    }
}

pub fn block(parent: &Block, slot: Slot, transactions: Vec<Transaction>, seed: u8) -> Arc<Block> {
    Arc::new(Block::new(
        parent.root,
        0,
        slot,
        transactions,
        vec![],
        H256::repeat_byte(seed),
    ))
}
