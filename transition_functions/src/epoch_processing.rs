use core::mem;

use anyhow::Result;
use arithmetic::U64Ext as _;
use helper_functions::{
    accessors::{get_checkpoint_from_epoch, get_current_epoch, get_previous_epoch},
    mutators::{decrease_balance, increase_balance},
    predicates::{has_flag, is_in_inactivity_leak},
};
use im::Vector;
use itertools::izip;
use types::{
    config::Config,
    consensus_state::ConsensusState,
    consts::TIMELY_TARGET_FLAG_INDEX,
    containers::Checkpoint,
    primitives::{Epoch, Gwei},
    traits::ChainView,
};

use crate::{
    epoch_intermediates::{self, Statistics},
    error::Error,
};

/// Runs at the end of every epoch, while `state.slot` is still the last slot of it.
pub fn process_epoch(
    config: &Config,
    state: &mut ConsensusState,
    chain: &(impl ChainView + ?Sized),
) -> Result<()> {
    let statistics = epoch_intermediates::statistics(config, state);

    process_justification_and_finalization(config, state, chain, statistics)?;
    process_inactivity_updates(config, state);
    process_rewards_and_penalties(config, state, statistics);
    process_effective_balance_updates(config, state);
    process_participation_flag_updates(state);

    Ok(())
}

pub fn process_justification_and_finalization(
    config: &Config,
    state: &mut ConsensusState,
    chain: &(impl ChainView + ?Sized),
    statistics: Statistics,
) -> Result<()> {
    let viewpoint = state.latest_block_root;

    let checkpoint = |epoch| {
        get_checkpoint_from_epoch(config, chain, viewpoint, epoch)
            .ok_or(Error::CheckpointUnavailable { epoch, viewpoint })
    };

    let previous_epoch_checkpoint = checkpoint(get_previous_epoch(config, state))?;
    let current_epoch_checkpoint = checkpoint(get_current_epoch(config, state))?;

    weigh_justification_and_finalization(
        config,
        state,
        statistics.total_active_balance,
        (
            previous_epoch_checkpoint,
            statistics.previous_epoch_target_participating_balance,
        ),
        (
            current_epoch_checkpoint,
            statistics.current_epoch_target_participating_balance,
        ),
    );

    Ok(())
}

pub fn weigh_justification_and_finalization(
    config: &Config,
    state: &mut ConsensusState,
    total_active_balance: Gwei,
    (previous_epoch_checkpoint, previous_epoch_target_balance): (Checkpoint, Gwei),
    (current_epoch_checkpoint, current_epoch_target_balance): (Checkpoint, Gwei),
) {
    let old_previous_justified_checkpoint = state.previous_justified_checkpoint;
    let old_current_justified_checkpoint = state.current_justified_checkpoint;

    // Process justifications
    state.previous_justified_checkpoint = state.current_justified_checkpoint;
    state.justification_bits.shift();

    let mut justify_if_supermajority = |checkpoint, bit, target_balance: Gwei| {
        if target_balance.saturating_mul(3) >= total_active_balance.saturating_mul(2) {
            state.current_justified_checkpoint = checkpoint;
            state.justification_bits.set(bit);
        }
    };

    justify_if_supermajority(previous_epoch_checkpoint, 1, previous_epoch_target_balance);
    justify_if_supermajority(current_epoch_checkpoint, 0, current_epoch_target_balance);

    // Process finalizations
    let bits = state.justification_bits;
    let current_epoch = get_current_epoch(config, state);
    let is_source = |checkpoint: Checkpoint, distance: Epoch| {
        checkpoint.epoch.saturating_add(distance) == current_epoch
    };

    // The 2nd/3rd/4th most recent epochs are justified, the 2nd using the 4th as source
    if bits.all_set(1..4) && is_source(old_previous_justified_checkpoint, 3) {
        state.finalized_checkpoint = old_previous_justified_checkpoint;
    }

    // The 2nd/3rd most recent epochs are justified, the 2nd using the 3rd as source
    if bits.all_set(1..3) && is_source(old_previous_justified_checkpoint, 2) {
        state.finalized_checkpoint = old_previous_justified_checkpoint;
    }

    // The 1st/2nd/3rd most recent epochs are justified, the 1st using the 3rd as source
    if bits.all_set(0..3) && is_source(old_current_justified_checkpoint, 2) {
        state.finalized_checkpoint = old_current_justified_checkpoint;
    }

    // The 1st/2nd most recent epochs are justified, the 1st using the 2nd as source
    if bits.all_set(0..2) && is_source(old_current_justified_checkpoint, 1) {
        state.finalized_checkpoint = old_current_justified_checkpoint;
    }
}

pub fn process_inactivity_updates(config: &Config, state: &mut ConsensusState) {
    let in_inactivity_leak = is_in_inactivity_leak(config, state);

    let scores = izip!(&state.inactivity_scores, &state.current_epoch_participation)
        .map(|(inactivity_score, participation)| {
            // Increase the inactivity score of inactive validators
            let mut score = if has_flag(*participation, TIMELY_TARGET_FLAG_INDEX) {
                inactivity_score.saturating_sub(1)
            } else {
                inactivity_score.saturating_add(config.inactivity_score_bias.get())
            };

            // Decrease the inactivity score of all validators during a leak-free epoch
            if !in_inactivity_leak {
                score = score.saturating_sub(config.inactivity_score_recovery_rate);
            }

            score
        })
        .collect();

    state.inactivity_scores = scores;
}

pub fn process_rewards_and_penalties(
    config: &Config,
    state: &mut ConsensusState,
    statistics: Statistics,
) {
    let deltas = epoch_intermediates::epoch_deltas(config, state, statistics);

    for (balance, deltas) in state.balances.iter_mut().zip(deltas) {
        increase_balance(balance, deltas.rewards);
        decrease_balance(balance, deltas.penalties);
    }
}

pub fn process_effective_balance_updates(config: &Config, state: &mut ConsensusState) {
    let hysteresis_increment = config.hysteresis_increment();
    let downward_threshold = hysteresis_increment * config.hysteresis_downward_multiplier;
    let upward_threshold = hysteresis_increment * config.hysteresis_upward_multiplier;

    // Update effective balances with hysteresis
    for (validator, balance) in state.validators.iter_mut().zip(&state.balances) {
        let balance = *balance;
        let below = balance.saturating_add(downward_threshold) < validator.effective_balance;
        let above = validator.effective_balance.saturating_add(upward_threshold) < balance;

        if below || above {
            validator.effective_balance = balance
                .prev_multiple_of(config.effective_balance_increment)
                .min(config.max_effective_balance);
        }
    }
}

pub fn process_participation_flag_updates(state: &mut ConsensusState) {
    // Rotate current/previous epoch participation
    let zero_participation = Vector::from(vec![0; state.validator_count()]);

    state.previous_epoch_participation =
        mem::replace(&mut state.current_epoch_participation, zero_participation);
}
