use core::ops::Range;

use bit_field::BitField as _;
use derive_more::{Debug, Display};
use im::Vector;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    consts::{GENESIS_EPOCH, GENESIS_SLOT, JUSTIFICATION_BITS_LENGTH},
    containers::Checkpoint,
    primitives::{Epoch, Gwei, InactivityScore, ParticipationFlags, Slot, H256},
};

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Validator {
    pub effective_balance: Gwei,
}

/// The last [`JUSTIFICATION_BITS_LENGTH`] epochs' justification outcomes.
/// Bit 0 refers to the current epoch.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Display, Deserialize, Serialize)]
#[debug("{_0:04b}")]
#[display("{_0:04b}")]
pub struct JustificationBits(u8);

impl JustificationBits {
    #[must_use]
    pub fn get(self, index: usize) -> bool {
        self.0.get_bit(index)
    }

    pub fn set(&mut self, index: usize) {
        self.0.set_bit(index, true);
    }

    /// Moves every bit one epoch into the past, dropping the oldest one.
    pub fn shift(&mut self) {
        self.0 = (self.0 << 1).get_bits(..JUSTIFICATION_BITS_LENGTH);
    }

    #[must_use]
    pub fn all_set(self, mut indices: Range<usize>) -> bool {
        indices.all(|index| self.get(index))
    }
}

/// Per-block consensus snapshot.
///
/// Derived from the parent's snapshot when a block is admitted. The `im` collections make the
/// copy cheap while still giving every block its own logical state.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ConsensusState {
    pub slot: Slot,
    pub latest_block_root: H256,
    pub validators: Vector<Validator>,
    pub balances: Vector<Gwei>,
    pub inactivity_scores: Vector<InactivityScore>,
    pub previous_epoch_participation: Vector<ParticipationFlags>,
    pub current_epoch_participation: Vector<ParticipationFlags>,
    pub justification_bits: JustificationBits,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
}

impl ConsensusState {
    /// Builds the genesis state with one validator per balance.
    #[must_use]
    pub fn genesis(
        config: &Config,
        genesis_root: H256,
        balances: impl IntoIterator<Item = Gwei>,
    ) -> Self {
        let balances = balances.into_iter().collect::<Vector<_>>();

        let validators = balances
            .iter()
            .map(|balance| Validator {
                effective_balance: initial_effective_balance(config, *balance),
            })
            .collect::<Vector<_>>();

        let validator_count = validators.len();

        let genesis_checkpoint = Checkpoint {
            epoch: GENESIS_EPOCH,
            root: genesis_root,
        };

        Self {
            slot: GENESIS_SLOT,
            latest_block_root: genesis_root,
            inactivity_scores: Vector::from(vec![0; validator_count]),
            previous_epoch_participation: Vector::from(vec![0; validator_count]),
            current_epoch_participation: Vector::from(vec![0; validator_count]),
            validators,
            balances,
            justification_bits: JustificationBits::default(),
            previous_justified_checkpoint: genesis_checkpoint,
            current_justified_checkpoint: genesis_checkpoint,
            finalized_checkpoint: genesis_checkpoint,
        }
    }

    #[must_use]
    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    #[must_use]
    pub fn effective_balance(&self, validator_index: usize) -> Option<Gwei> {
        self.validators
            .get(validator_index)
            .map(|validator| validator.effective_balance)
    }

    #[must_use]
    pub fn current_epoch(&self, config: &Config) -> Epoch {
        self.slot / config.slots_per_epoch
    }
}

fn initial_effective_balance(config: &Config, balance: Gwei) -> Gwei {
    let increment = config.effective_balance_increment.get();
    (balance - balance % increment).min(config.max_effective_balance)
}
