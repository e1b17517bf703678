use anyhow::{ensure, Result};
use helper_functions::{
    accessors::{
        get_attestation_participation_flags, get_base_reward, get_base_reward_per_increment,
        is_previous_epoch_attestation,
    },
    mutators::{add_flag, balance, increase_balance},
    predicates::has_flag,
};
use types::{
    config::Config,
    consensus_state::ConsensusState,
    consts::{PARTICIPATION_FLAG_WEIGHTS, PROPOSER_REWARD_DENOMINATOR},
    containers::{Attestation, Block},
    primitives::{Gwei, H256},
    traits::ChainView,
};

use crate::error::Error;

/// Applies `block` to a state already advanced to `block.slot`.
///
/// The proposer is rewarded for every participation flag the block's attestations set for the
/// first time.
pub fn process_block(
    config: &Config,
    state: &mut ConsensusState,
    block: &Block,
    chain: &(impl ChainView + ?Sized),
) -> Result<()> {
    ensure!(
        block.slot == state.slot,
        Error::BlockSlotMismatch {
            state_slot: state.slot,
            block_slot: block.slot,
        },
    );

    ensure!(
        block.parent_root == state.latest_block_root,
        Error::ParentRootMismatch {
            in_state: state.latest_block_root,
            in_block: block.parent_root,
        },
    );

    let proposer_index = block.proposer_index;

    ensure!(
        usize::try_from(proposer_index).is_ok_and(|index| index < state.validator_count()),
        Error::ProposerIndexOutOfBounds { proposer_index },
    );

    state.latest_block_root = block.root;

    let base_reward_per_increment = get_base_reward_per_increment(config, state);
    let mut proposer_reward: Gwei = 0;

    for attestation in &block.attestations {
        let numerator = apply_attestation(
            config,
            state,
            chain,
            block.parent_root,
            attestation,
            base_reward_per_increment,
        )?;

        // Rounded down separately for every attestation.
        proposer_reward =
            proposer_reward.saturating_add(numerator / PROPOSER_REWARD_DENOMINATOR);
    }

    increase_balance(balance(state, proposer_index)?, proposer_reward);

    Ok(())
}

/// Records the participation earned by `attestation`.
///
/// Returns the proposer reward numerator for the flags that were not already set.
pub fn apply_attestation(
    config: &Config,
    state: &mut ConsensusState,
    chain: &(impl ChainView + ?Sized),
    viewpoint: H256,
    attestation: &Attestation,
    base_reward_per_increment: Gwei,
) -> Result<Gwei> {
    attestation.validate_structure(config)?;

    let validator_index = attestation.validator_index;

    let index = usize::try_from(validator_index)
        .ok()
        .filter(|index| *index < state.validator_count())
        .ok_or(Error::ValidatorIndexOutOfBounds { validator_index })?;

    let flags =
        get_attestation_participation_flags(config, state, chain, viewpoint, attestation)?;

    let base_reward = get_base_reward(config, state, validator_index, base_reward_per_increment)?;

    let participation = if is_previous_epoch_attestation(config, state, attestation.target.epoch)?
    {
        &mut state.previous_epoch_participation
    } else {
        &mut state.current_epoch_participation
    };

    let mut updated = participation[index];
    let mut proposer_reward_numerator: Gwei = 0;

    for (flag_index, weight) in PARTICIPATION_FLAG_WEIGHTS {
        if has_flag(flags, flag_index) && !has_flag(updated, flag_index) {
            updated = add_flag(updated, flag_index);
            proposer_reward_numerator += base_reward * weight;
        }
    }

    participation.set(index, updated);

    Ok(proposer_reward_numerator)
}
