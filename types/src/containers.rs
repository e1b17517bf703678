use std::sync::Arc;

use derive_more::Display;
use hashing::ContentHasher;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    consts::GENESIS_SLOT,
    error::Error,
    primitives::{Balance, CommitteeIndex, Epoch, Slot, ValidatorIndex, H256},
    transactions::Transaction,
};

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Display, Deserialize, Serialize,
)]
#[display("({epoch}, {root:?})")]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: H256,
}

/// A validator's vote for a chain head and a pair of checkpoints.
///
/// Equality and hashing are structural over all seven fields.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Attestation {
    pub validator_index: ValidatorIndex,
    pub epoch: Epoch,
    pub slot: Slot,
    pub index: CommitteeIndex,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

impl Attestation {
    /// Checks the relationships between fields that do not depend on any chain.
    pub fn validate_structure(&self, config: &Config) -> Result<(), Error> {
        let Self {
            epoch,
            slot,
            source,
            target,
            ..
        } = *self;

        if slot / config.slots_per_epoch != epoch {
            return Err(Error::AttestationEpochMismatch { slot, epoch });
        }

        if target.epoch != epoch {
            return Err(Error::AttestationTargetEpochMismatch {
                epoch,
                target: target.epoch,
            });
        }

        if source.epoch > target.epoch {
            return Err(Error::AttestationSourceAfterTarget {
                source_epoch: source.epoch,
                target: target.epoch,
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn hash(&self) -> H256 {
        ContentHasher::new()
            .u64(self.validator_index)
            .u64(self.epoch)
            .u64(self.slot)
            .u64(self.index)
            .h256(self.beacon_block_root)
            .u64(self.source.epoch)
            .h256(self.source.root)
            .u64(self.target.epoch)
            .h256(self.target.root)
            .finish()
    }
}

/// A proposed block.
///
/// `root` is derived from the other fields when the block is constructed.
/// Blocks received from elsewhere must be checked with [`Block::verify_root`] before use.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub parent_root: H256,
    pub proposer_index: ValidatorIndex,
    pub slot: Slot,
    pub transactions: Vec<Transaction>,
    pub attestations: Vec<Attestation>,
    pub seed: H256,
    pub root: H256,
}

impl Block {
    #[must_use]
    pub fn new(
        parent_root: H256,
        proposer_index: ValidatorIndex,
        slot: Slot,
        transactions: Vec<Transaction>,
        attestations: Vec<Attestation>,
        seed: H256,
    ) -> Self {
        let mut block = Self {
            parent_root,
            proposer_index,
            slot,
            transactions,
            attestations,
            seed,
            root: H256::zero(),
        };

        block.root = block.compute_root();
        block
    }

    #[must_use]
    pub fn genesis() -> Arc<Self> {
        Arc::new(Self::new(
            H256::zero(),
            0,
            GENESIS_SLOT,
            vec![],
            vec![],
            H256::zero(),
        ))
    }

    #[must_use]
    pub fn is_genesis(&self) -> bool {
        self.slot == GENESIS_SLOT && self.parent_root.is_zero()
    }

    #[must_use]
    pub fn epoch(&self, config: &Config) -> Epoch {
        self.slot / config.slots_per_epoch
    }

    #[must_use]
    pub fn total_fees(&self) -> Balance {
        self.transactions
            .iter()
            .map(|transaction| transaction.fee)
            .fold(0, Balance::saturating_add)
    }

    /// Hash over the parent, proposer, slot, total fees, ordered transaction hashes and seed.
    /// Attestations are not part of a block's identity.
    #[must_use]
    pub fn compute_root(&self) -> H256 {
        let hasher = ContentHasher::new()
            .h256(self.parent_root)
            .u64(self.proposer_index)
            .u64(self.slot)
            .u64(self.total_fees())
            .length(self.transactions.len());

        self.transactions
            .iter()
            .fold(hasher, |hasher, transaction| hasher.h256(transaction.hash()))
            .h256(self.seed)
            .finish()
    }

    #[must_use]
    pub fn verify_root(&self) -> bool {
        self.compute_root() == self.root
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use test_case::test_case;

    use crate::{primitives::AccountId, transactions::Transaction};

    use super::*;

    fn attestation(slot: Slot, epoch: Epoch, source: Epoch, target: Epoch) -> Attestation {
        Attestation {
            validator_index: 3,
            epoch,
            slot,
            index: 0,
            beacon_block_root: H256::repeat_byte(1),
            source: Checkpoint {
                epoch: source,
                root: H256::repeat_byte(2),
            },
            target: Checkpoint {
                epoch: target,
                root: H256::repeat_byte(3),
            },
        }
    }

    fn block_with_transfer() -> Block {
        let transfer = Transaction::transfer(
            AccountId::repeat_byte(1),
            0,
            AccountId::repeat_byte(2),
            100,
            7,
        );

        Block::new(
            H256::repeat_byte(9),
            4,
            33,
            vec![transfer],
            vec![attestation(32, 1, 0, 1)],
            H256::repeat_byte(5),
        )
    }

    #[test_case(40, 1, 0, 1 => matches Ok(()); "valid")]
    #[test_case(40, 0, 0, 0 => matches Err(Error::AttestationEpochMismatch { .. }); "wrong epoch")]
    #[test_case(40, 1, 0, 0 => matches Err(Error::AttestationTargetEpochMismatch { .. }); "wrong target")]
    #[test_case(40, 1, 2, 1 => matches Err(Error::AttestationSourceAfterTarget { .. }); "source after target")]
    fn attestation_structure(slot: Slot, epoch: Epoch, source: Epoch, target: Epoch) -> Result<(), Error> {
        attestation(slot, epoch, source, target).validate_structure(&Config::mainnet())
    }

    #[test]
    fn root_is_computed_on_construction() {
        let block = block_with_transfer();

        assert!(block.verify_root());
        assert_eq!(block.total_fees(), 7);
    }

    #[test]
    fn tampering_with_hashed_fields_is_detected() {
        let mut block = block_with_transfer();
        block.transactions[0].fee = 8;
        assert!(!block.verify_root());

        let mut block = block_with_transfer();
        block.seed = H256::repeat_byte(6);
        assert!(!block.verify_root());
    }

    #[test]
    fn genesis_is_recognized() {
        assert!(Block::genesis().is_genesis());
        assert!(!block_with_transfer().is_genesis());
    }

    #[test]
    fn block_round_trips_through_json_and_bincode() -> Result<()> {
        let block = block_with_transfer();

        let from_json = serde_json::from_str::<Block>(&serde_json::to_string(&block)?)?;
        let from_bincode = bincode::deserialize::<Block>(&bincode::serialize(&block)?)?;

        assert_eq!(from_json, block);
        assert_eq!(from_bincode, block);

        Ok(())
    }

    #[test]
    fn attestation_round_trips_through_json_and_bincode() -> Result<()> {
        let attestation = attestation(40, 1, 0, 1);

        let from_json = serde_json::from_str::<Attestation>(&serde_json::to_string(&attestation)?)?;
        let from_bincode = bincode::deserialize::<Attestation>(&bincode::serialize(&attestation)?)?;

        assert_eq!(from_json, attestation);
        assert_eq!(from_bincode, attestation);

        Ok(())
    }
}
