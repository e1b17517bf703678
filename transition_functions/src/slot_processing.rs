use anyhow::{ensure, Result};
use helper_functions::misc;
use types::{
    config::Config, consensus_state::ConsensusState, primitives::Slot, traits::ChainView,
};

use crate::{epoch_processing, error::Error};

pub fn process_slots(
    config: &Config,
    state: &mut ConsensusState,
    chain: &(impl ChainView + ?Sized),
    slot: Slot,
) -> Result<()> {
    ensure!(
        state.slot < slot,
        Error::SlotNotLater {
            current: state.slot,
            target: slot,
        },
    );

    while state.slot < slot {
        // Process epoch on the start slot of the next epoch
        if misc::is_epoch_start(config, state.slot + 1) {
            epoch_processing::process_epoch(config, state, chain)?;
        }

        state.slot += 1;
    }

    Ok(())
}
