use bit_field::BitField as _;
use types::{config::Config, consensus_state::ConsensusState, primitives::ParticipationFlags};

use crate::accessors::get_finality_delay;

#[must_use]
pub fn is_in_inactivity_leak(config: &Config, state: &ConsensusState) -> bool {
    get_finality_delay(config, state) > config.min_epochs_to_inactivity_penalty
}

#[must_use]
pub fn has_flag(flags: ParticipationFlags, flag_index: usize) -> bool {
    flags.get_bit(flag_index)
}
