use anyhow::Result;
use bit_field::BitField as _;
use types::{
    consensus_state::ConsensusState,
    primitives::{Gwei, ParticipationFlags, ValidatorIndex},
};

use crate::error::Error;

pub fn balance(state: &mut ConsensusState, validator_index: ValidatorIndex) -> Result<&mut Gwei> {
    usize::try_from(validator_index)
        .ok()
        .and_then(|index| state.balances.get_mut(index))
        .ok_or_else(|| Error::ValidatorIndexOutOfBounds { validator_index }.into())
}

#[inline]
pub fn increase_balance(balance: &mut Gwei, delta: Gwei) {
    *balance = balance.saturating_add(delta);
}

#[inline]
pub fn decrease_balance(balance: &mut Gwei, delta: Gwei) {
    *balance = balance.saturating_sub(delta);
}

#[inline]
#[must_use]
pub fn add_flag(flags: ParticipationFlags, flag_index: usize) -> ParticipationFlags {
    let mut flags = flags;
    flags.set_bit(flag_index, true);
    flags
}

#[cfg(test)]
mod tests {
    use types::{config::Config, primitives::H256};

    use super::*;

    #[test]
    fn balance_changes_saturate() -> Result<()> {
        let mut state = ConsensusState::genesis(&Config::minimal(), H256::zero(), [10, 20]);

        decrease_balance(balance(&mut state, 0)?, 15);
        increase_balance(balance(&mut state, 1)?, Gwei::MAX);

        assert_eq!(state.balances[0], 0);
        assert_eq!(state.balances[1], Gwei::MAX);

        Ok(())
    }

    #[test]
    fn out_of_bounds_validator_is_an_error() {
        let mut state = ConsensusState::genesis(&Config::minimal(), H256::zero(), [10]);
        balance(&mut state, 1).expect_err("only validator 0 exists");
    }

    #[test]
    fn adding_a_flag_keeps_existing_ones() {
        assert_eq!(add_flag(add_flag(0, 0), 2), 0b101);
        assert_eq!(add_flag(0b101, 0), 0b101);
    }
}
