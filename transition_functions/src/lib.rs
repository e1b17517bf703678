//! Consensus state transitions.
//!
//! A [`ConsensusState`](types::consensus_state::ConsensusState) is advanced slot by slot with
//! [`process_slots`], running epoch processing whenever an epoch ends, and then has a block applied
//! to it with [`process_block`]. [`state_transition`] does both.

pub use block_processing::{apply_attestation, process_block};
pub use epoch_intermediates::{epoch_deltas, statistics, EpochDeltas, Statistics};
pub use epoch_processing::{
    process_effective_balance_updates, process_epoch, process_inactivity_updates,
    process_justification_and_finalization, process_participation_flag_updates,
    process_rewards_and_penalties, weigh_justification_and_finalization,
};
pub use error::Error;
pub use slot_processing::process_slots;
pub use state_transition::{derive, state_transition};

mod block_processing;
mod epoch_intermediates;
mod epoch_processing;
mod error;
mod slot_processing;
mod state_transition;

#[cfg(test)]
mod fixtures;
