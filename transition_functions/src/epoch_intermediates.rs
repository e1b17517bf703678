use core::num::NonZeroU64;

use arithmetic::U64Ext as _;
use helper_functions::{
    accessors::{compute_base_reward, get_base_reward_per_increment, total_active_balance},
    predicates::{has_flag, is_in_inactivity_leak},
};
use itertools::izip;
use types::{
    config::Config,
    consensus_state::ConsensusState,
    consts::{
        PARTICIPATION_FLAG_WEIGHTS, TIMELY_HEAD_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX,
        WEIGHT_DENOMINATOR,
    },
    primitives::Gwei,
};

#[derive(Clone, Copy, Default, Debug)]
pub struct Statistics {
    pub total_active_balance: Gwei,
    pub previous_epoch_target_participating_balance: Gwei,
    pub current_epoch_target_participating_balance: Gwei,
    /// Effective balance increments in the current epoch with each flag set.
    pub current_epoch_participating_increments: [u64; 3],
}

impl Statistics {
    fn active_increments(self, config: &Config) -> NonZeroU64 {
        NonZeroU64::new(self.total_active_balance / config.effective_balance_increment)
            .unwrap_or(NonZeroU64::MIN)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct EpochDeltas {
    pub rewards: Gwei,
    pub penalties: Gwei,
}

impl EpochDeltas {
    fn add_reward(&mut self, value: Gwei) {
        self.rewards = self.rewards.saturating_add(value);
    }

    fn add_penalty(&mut self, value: Gwei) {
        self.penalties = self.penalties.saturating_add(value);
    }
}

#[must_use]
pub fn statistics(config: &Config, state: &ConsensusState) -> Statistics {
    let mut statistics = Statistics {
        total_active_balance: total_active_balance(config, state),
        ..Statistics::default()
    };

    for (validator, previous, current) in izip!(
        &state.validators,
        &state.previous_epoch_participation,
        &state.current_epoch_participation,
    ) {
        let effective_balance = validator.effective_balance;
        let increments = effective_balance / config.effective_balance_increment;

        if has_flag(*previous, TIMELY_TARGET_FLAG_INDEX) {
            statistics.previous_epoch_target_participating_balance += effective_balance;
        }

        if has_flag(*current, TIMELY_TARGET_FLAG_INDEX) {
            statistics.current_epoch_target_participating_balance += effective_balance;
        }

        for (flag_index, _) in PARTICIPATION_FLAG_WEIGHTS {
            if has_flag(*current, flag_index) {
                statistics.current_epoch_participating_increments[flag_index] += increments;
            }
        }
    }

    statistics
}

/// Rewards and penalties for the epoch about to end, one entry per validator.
///
/// Computed from the current epoch's participation and the inactivity scores already updated for
/// this epoch.
#[must_use]
pub fn epoch_deltas(
    config: &Config,
    state: &ConsensusState,
    statistics: Statistics,
) -> Vec<EpochDeltas> {
    let base_reward_per_increment = get_base_reward_per_increment(config, state);
    let in_inactivity_leak = is_in_inactivity_leak(config, state);
    let reward_denominator = statistics
        .active_increments(config)
        .saturating_mul(WEIGHT_DENOMINATOR);
    let inactivity_penalty_denominator = config
        .inactivity_score_bias
        .saturating_mul(config.inactivity_penalty_quotient);

    izip!(
        &state.validators,
        &state.current_epoch_participation,
        &state.inactivity_scores,
    )
    .map(|(validator, participation, inactivity_score)| {
        let participation = *participation;
        let effective_balance = validator.effective_balance;
        let base_reward =
            compute_base_reward(config, effective_balance, base_reward_per_increment);

        let mut deltas = EpochDeltas::default();

        for (flag_index, weight) in PARTICIPATION_FLAG_WEIGHTS {
            if has_flag(participation, flag_index) {
                if !in_inactivity_leak {
                    let participating_increments =
                        statistics.current_epoch_participating_increments[flag_index];

                    deltas.add_reward(
                        base_reward
                            .saturating_mul(weight)
                            .mul_div(participating_increments, reward_denominator),
                    );
                }
            } else if flag_index != TIMELY_HEAD_FLAG_INDEX {
                deltas.add_penalty(base_reward.mul_div(weight, WEIGHT_DENOMINATOR));
            }
        }

        if !has_flag(participation, TIMELY_TARGET_FLAG_INDEX) {
            deltas.add_penalty(
                effective_balance.mul_div(*inactivity_score, inactivity_penalty_denominator),
            );
        }

        deltas
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use types::primitives::{ParticipationFlags, H256};

    use super::*;

    const MAX: Gwei = 32_000_000_000;

    fn state(participation: ParticipationFlags) -> ConsensusState {
        let config = Config::mainnet();
        let mut state = ConsensusState::genesis(&config, H256::zero(), [MAX; 32]);
        state.current_epoch_participation = [participation; 32].into_iter().collect();
        state
    }

    #[test]
    fn statistics_count_target_participation() {
        let config = Config::mainnet();
        let mut state = state(0b111);
        state.current_epoch_participation.set(0, 0b001);
        state.previous_epoch_participation.set(3, 0b010);

        let statistics = statistics(&config, &state);

        assert_eq!(statistics.total_active_balance, 32 * MAX);
        assert_eq!(statistics.current_epoch_target_participating_balance, 31 * MAX);
        assert_eq!(statistics.previous_epoch_target_participating_balance, MAX);
        assert_eq!(statistics.current_epoch_participating_increments, [1024, 992, 992]);
    }

    #[test]
    fn full_participation_earns_every_flag() {
        let config = Config::mainnet();
        let state = state(0b111);
        let deltas = epoch_deltas(&config, &state, statistics(&config, &state));

        // base reward = 32 * 1_000_000_000 * 64 / isqrt(1024 * 32 ETH) = 2_023_840
        assert_eq!(deltas[0].rewards, 2_023_840 * 54 / 64);
        assert_eq!(deltas[0].penalties, 0);
    }

    #[test]
    fn missing_flags_are_penalized_except_head() {
        let config = Config::mainnet();
        let mut state = state(0);
        state.inactivity_scores.set(0, 50_331_648);

        let deltas = epoch_deltas(&config, &state, statistics(&config, &state));

        assert_eq!(deltas[0].rewards, 0);
        assert_eq!(deltas[0].penalties, 2_023_840 * 40 / 64 + MAX / 4);
        assert_eq!(deltas[1].penalties, 2_023_840 * 40 / 64);
    }

    #[test]
    fn no_rewards_during_inactivity_leak() {
        let config = Config::mainnet();
        let mut state = state(0b111);
        state.slot = 10 * config.slots_per_epoch.get();

        let deltas = epoch_deltas(&config, &state, statistics(&config, &state));

        assert_eq!(deltas[0], EpochDeltas::default());
    }
}
