use anyhow::{ensure, Result};
use arithmetic::U64Ext as _;
use bit_field::BitField as _;
use types::{
    config::Config,
    consensus_state::ConsensusState,
    consts::{
        GENESIS_EPOCH, TIMELY_HEAD_FLAG_INDEX, TIMELY_SOURCE_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX,
    },
    containers::{Attestation, Checkpoint},
    primitives::{Epoch, Gwei, ParticipationFlags, ValidatorIndex, H256},
    traits::ChainView,
};

use crate::{error::Error, misc};

#[must_use]
pub fn get_current_epoch(config: &Config, state: &ConsensusState) -> Epoch {
    misc::compute_epoch_at_slot(config, state.slot)
}

#[must_use]
pub fn get_previous_epoch(config: &Config, state: &ConsensusState) -> Epoch {
    get_current_epoch(config, state)
        .saturating_sub(1)
        .max(GENESIS_EPOCH)
}

#[must_use]
pub fn get_finality_delay(config: &Config, state: &ConsensusState) -> u64 {
    get_previous_epoch(config, state).saturating_sub(state.finalized_checkpoint.epoch)
}

/// Whether an attestation targeting `epoch` counts toward the previous epoch's participation.
pub fn is_previous_epoch_attestation(
    config: &Config,
    state: &ConsensusState,
    epoch: Epoch,
) -> Result<bool> {
    let current_epoch = get_current_epoch(config, state);

    match current_epoch.checked_sub(epoch) {
        None => Err(Error::EpochInTheFuture { epoch }.into()),
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        Some(_) => Err(Error::EpochBeforePrevious { epoch }.into()),
    }
}

/// Sum of all effective balances, but never less than one increment.
#[must_use]
pub fn total_active_balance(config: &Config, state: &ConsensusState) -> Gwei {
    state
        .validators
        .iter()
        .map(|validator| validator.effective_balance)
        .fold(0, Gwei::saturating_add)
        .max(config.effective_balance_increment.get())
}

#[must_use]
pub fn get_base_reward_per_increment(config: &Config, state: &ConsensusState) -> Gwei {
    let total = total_active_balance(config, state);

    config
        .effective_balance_increment
        .get()
        .saturating_mul(config.base_reward_factor)
        .checked_div(total.integer_sqrt())
        .unwrap_or_default()
}

#[must_use]
pub fn compute_base_reward(
    config: &Config,
    effective_balance: Gwei,
    base_reward_per_increment: Gwei,
) -> Gwei {
    let increments = effective_balance / config.effective_balance_increment;
    increments.saturating_mul(base_reward_per_increment)
}

pub fn get_base_reward(
    config: &Config,
    state: &ConsensusState,
    validator_index: ValidatorIndex,
    base_reward_per_increment: Gwei,
) -> Result<Gwei> {
    let effective_balance = usize::try_from(validator_index)
        .ok()
        .and_then(|index| state.effective_balance(index))
        .ok_or(Error::ValidatorIndexOutOfBounds { validator_index })?;

    Ok(compute_base_reward(
        config,
        effective_balance,
        base_reward_per_increment,
    ))
}

/// Checkpoint for `epoch` as seen from the chain ending at `viewpoint`.
///
/// The latest block at or before the epoch's last slot is used, so empty slots are skipped and
/// a viewpoint inside the epoch is its own checkpoint. Returns `None` if `viewpoint` is not known
/// to `chain`.
#[must_use]
pub fn get_checkpoint_from_epoch(
    config: &Config,
    chain: &(impl ChainView + ?Sized),
    viewpoint: H256,
    epoch: Epoch,
) -> Option<Checkpoint> {
    let slot = misc::slots_in_epoch(config, epoch).next_back()?;
    let root = chain.block_root_at_or_before(viewpoint, slot)?;
    Some(Checkpoint { epoch, root })
}

/// Flags earned by `attestation` if it is included in a block built on `viewpoint` at
/// `state.slot`.
pub fn get_attestation_participation_flags(
    config: &Config,
    state: &ConsensusState,
    chain: &(impl ChainView + ?Sized),
    viewpoint: H256,
    attestation: &Attestation,
) -> Result<ParticipationFlags> {
    let is_previous = is_previous_epoch_attestation(config, state, attestation.target.epoch)?;

    let inclusion_delay = state.slot.saturating_sub(attestation.slot);

    ensure!(
        attestation.slot < state.slot
            && inclusion_delay >= config.min_attestation_inclusion_delay.get(),
        Error::AttestationTooEarly {
            attestation_slot: attestation.slot,
            state_slot: state.slot,
        },
    );

    let justified_checkpoint = if is_previous {
        state.previous_justified_checkpoint
    } else {
        state.current_justified_checkpoint
    };

    let expected_target =
        get_checkpoint_from_epoch(config, chain, viewpoint, attestation.target.epoch);
    let expected_head = chain.block_root_at_or_before(viewpoint, attestation.slot);

    // Matching roots
    let is_matching_source = attestation.source == justified_checkpoint;
    let is_matching_target = is_matching_source && expected_target == Some(attestation.target);
    let is_matching_head =
        is_matching_target && expected_head == Some(attestation.beacon_block_root);

    ensure!(is_matching_source, Error::AttestationSourceMismatch);

    let mut participation_flags = 0;

    if inclusion_delay <= config.slots_per_epoch.get().integer_sqrt() {
        participation_flags.set_bit(TIMELY_SOURCE_FLAG_INDEX, true);
    }

    if is_matching_target && inclusion_delay <= config.slots_per_epoch.get() {
        participation_flags.set_bit(TIMELY_TARGET_FLAG_INDEX, true);
    }

    if is_matching_head && inclusion_delay == config.min_attestation_inclusion_delay.get() {
        participation_flags.set_bit(TIMELY_HEAD_FLAG_INDEX, true);
    }

    Ok(participation_flags)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use test_case::test_case;
    use types::primitives::Slot;

    use super::*;

    const GENESIS_ROOT: H256 = H256::repeat_byte(0xaa);
    const BLOCK_5_ROOT: H256 = H256::repeat_byte(0x05);
    const BLOCK_9_ROOT: H256 = H256::repeat_byte(0x09);

    /// A single chain with blocks at slots 0, 5 and 9.
    struct Chain(BTreeMap<Slot, H256>);

    impl Chain {
        fn new() -> Self {
            Self(BTreeMap::from([
                (0, GENESIS_ROOT),
                (5, BLOCK_5_ROOT),
                (9, BLOCK_9_ROOT),
            ]))
        }
    }

    impl ChainView for Chain {
        fn block_root_at_or_before(&self, viewpoint: H256, slot: Slot) -> Option<H256> {
            let tip = self.0.iter().find(|(_, root)| **root == viewpoint)?.0;

            self.0
                .range(..=slot.min(*tip))
                .next_back()
                .map(|(_, root)| *root)
        }
    }

    fn state_at(slot: Slot) -> ConsensusState {
        let mut state =
            ConsensusState::genesis(&Config::minimal(), GENESIS_ROOT, [32_000_000_000; 4]);
        state.slot = slot;
        state
    }

    fn attestation(slot: Slot, head: H256, target: Checkpoint) -> Attestation {
        let config = Config::minimal();

        Attestation {
            validator_index: 0,
            epoch: misc::compute_epoch_at_slot(&config, slot),
            slot,
            index: 0,
            beacon_block_root: head,
            source: Checkpoint {
                epoch: 0,
                root: GENESIS_ROOT,
            },
            target,
        }
    }

    // Epoch 0 spans slots 0..=7 and epoch 1 spans slots 8..=15.
    #[test_case(BLOCK_9_ROOT, 0 => Some(BLOCK_5_ROOT); "last block of a finished epoch")]
    #[test_case(BLOCK_9_ROOT, 1 => Some(BLOCK_9_ROOT); "viewpoint inside the epoch")]
    #[test_case(BLOCK_9_ROOT, 3 => Some(BLOCK_9_ROOT); "epochs after the viewpoint")]
    #[test_case(BLOCK_5_ROOT, 1 => Some(BLOCK_5_ROOT); "empty epoch")]
    #[test_case(H256::zero(), 1 => None; "unknown viewpoint")]
    fn checkpoint_is_latest_block_in_epoch(viewpoint: H256, epoch: Epoch) -> Option<H256> {
        let config = Config::minimal();
        let checkpoint = get_checkpoint_from_epoch(&config, &Chain::new(), viewpoint, epoch)?;

        assert_eq!(checkpoint.epoch, epoch);

        Some(checkpoint.root)
    }

    #[test_case(10 => 0b111; "included in the next slot")]
    #[test_case(11 => 0b011; "too late for head")]
    #[test_case(12 => 0b010; "too late for source")]
    #[test_case(17 => 0b010; "latest slot for target")]
    #[test_case(18 => 0b000; "too late for target")]
    fn flags_depend_on_inclusion_delay(state_slot: Slot) -> ParticipationFlags {
        let config = Config::minimal();
        let target = Checkpoint {
            epoch: 1,
            root: BLOCK_9_ROOT,
        };

        get_attestation_participation_flags(
            &config,
            &state_at(state_slot),
            &Chain::new(),
            BLOCK_9_ROOT,
            &attestation(9, BLOCK_9_ROOT, target),
        )
        .expect("source matches the genesis checkpoint")
    }

    #[test]
    fn wrong_target_only_earns_source() -> Result<()> {
        let config = Config::minimal();
        // Block 5 is the checkpoint of epoch 0, not of epoch 1.
        let target = Checkpoint {
            epoch: 1,
            root: BLOCK_5_ROOT,
        };

        let flags = get_attestation_participation_flags(
            &config,
            &state_at(10),
            &Chain::new(),
            BLOCK_9_ROOT,
            &attestation(9, BLOCK_9_ROOT, target),
        )?;

        assert_eq!(flags, 0b001);

        Ok(())
    }

    #[test]
    fn mismatched_source_is_rejected() {
        let config = Config::minimal();
        let mut attestation = attestation(9, BLOCK_9_ROOT, Checkpoint::default());
        attestation.source.root = BLOCK_5_ROOT;

        get_attestation_participation_flags(
            &config,
            &state_at(10),
            &Chain::new(),
            BLOCK_9_ROOT,
            &attestation,
        )
        .expect_err("source must match the justified checkpoint");
    }

    #[test_case(9, 9 => matches Err(_); "same slot")]
    #[test_case(1, 25 => matches Err(_); "two epochs old")]
    #[test_case(9, 10 => matches Ok(false); "current epoch")]
    #[test_case(7, 10 => matches Ok(true); "previous epoch")]
    fn attestation_epoch_is_checked(attestation_slot: Slot, state_slot: Slot) -> Result<bool> {
        let config = Config::minimal();
        let state = state_at(state_slot);
        let target = Checkpoint {
            epoch: misc::compute_epoch_at_slot(&config, attestation_slot),
            root: GENESIS_ROOT,
        };
        let attestation = attestation(attestation_slot, GENESIS_ROOT, target);

        get_attestation_participation_flags(
            &config,
            &state,
            &Chain::new(),
            BLOCK_9_ROOT,
            &attestation,
        )?;

        is_previous_epoch_attestation(&config, &state, attestation.target.epoch)
    }

    #[test]
    fn base_reward_scales_with_total_balance() {
        let config = Config::mainnet();
        let state = ConsensusState::genesis(&config, GENESIS_ROOT, [32_000_000_000; 64]);

        // isqrt(64 * 32 ETH in Gwei) = 1_431_083
        let per_increment = get_base_reward_per_increment(&config, &state);

        assert_eq!(per_increment, 1_000_000_000 * 64 / 1_431_083);
        assert_eq!(
            compute_base_reward(&config, 32_000_000_000, per_increment),
            32 * per_increment,
        );
    }
}
