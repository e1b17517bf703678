use anyhow::Result;
use types::{
    config::Config, consensus_state::ConsensusState, containers::Block, primitives::Slot,
    traits::ChainView,
};

use crate::{block_processing, slot_processing};

/// Copies `parent_state` and advances the copy to `slot`, running any epoch boundaries in between.
pub fn derive(
    config: &Config,
    parent_state: &ConsensusState,
    slot: Slot,
    chain: &(impl ChainView + ?Sized),
) -> Result<ConsensusState> {
    let mut state = parent_state.clone();

    if state.slot < slot {
        slot_processing::process_slots(config, &mut state, chain, slot)?;
    }

    Ok(state)
}

/// Derives the state of `block` from the state of its parent.
///
/// `chain` must already contain the parent. `block` itself does not need to be in it.
pub fn state_transition(
    config: &Config,
    parent_state: &ConsensusState,
    block: &Block,
    chain: &(impl ChainView + ?Sized),
) -> Result<ConsensusState> {
    let mut state = derive(config, parent_state, block.slot, chain)?;
    block_processing::process_block(config, &mut state, block, chain)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use helper_functions::accessors::get_checkpoint_from_epoch;
    use types::{
        containers::{Attestation, Checkpoint},
        primitives::H256,
    };

    use crate::fixtures::Chain;

    use super::*;

    const VALIDATOR_COUNT: u64 = 32;

    #[test]
    fn two_epochs_of_votes_justify_epoch_1_and_finalize_epoch_0() -> Result<()> {
        let config = Config::mainnet();
        let genesis = Block::genesis();
        let mut chain = Chain::new(&genesis);
        let mut state =
            ConsensusState::genesis(&config, genesis.root, [32_000_000_000; VALIDATOR_COUNT as usize]);

        let attest = |state: &ConsensusState, chain: &Chain, block: &Block| -> Option<Attestation> {
            let epoch = block.epoch(&config);

            Some(Attestation {
                validator_index: block.slot % VALIDATOR_COUNT,
                epoch,
                slot: block.slot,
                index: 0,
                beacon_block_root: block.root,
                source: state.current_justified_checkpoint,
                target: get_checkpoint_from_epoch(&config, chain, block.root, epoch)?,
            })
        };

        let mut pending = attest(&state, &chain, &genesis);
        let mut parent = genesis.root;
        let slots_per_epoch = config.slots_per_epoch.get();
        let mut epoch_0_root = H256::zero();
        let mut epoch_1_root = H256::zero();

        for slot in 1..=2 * slots_per_epoch {
            let block = Block::new(
                parent,
                slot % VALIDATOR_COUNT,
                slot,
                vec![],
                pending.take().into_iter().collect(),
                H256::zero(),
            );

            state = state_transition(&config, &state, &block, &chain)?;
            chain.insert(&block);

            // Checkpoints are the last blocks of their epochs.
            if slot == slots_per_epoch - 1 {
                epoch_0_root = block.root;
            }

            if slot == 2 * slots_per_epoch - 1 {
                epoch_1_root = block.root;
            }

            pending = attest(&state, &chain, &block);
            parent = block.root;
        }

        assert_eq!(
            state.current_justified_checkpoint,
            Checkpoint {
                epoch: 1,
                root: epoch_1_root,
            },
        );

        assert_eq!(
            state.finalized_checkpoint,
            Checkpoint {
                epoch: 0,
                root: epoch_0_root,
            },
        );

        Ok(())
    }

    #[test]
    fn derive_to_same_slot_only_copies() -> Result<()> {
        let config = Config::minimal();
        let genesis = Block::genesis();
        let chain = Chain::new(&genesis);
        let state = ConsensusState::genesis(&config, genesis.root, [32_000_000_000; 4]);

        assert_eq!(derive(&config, &state, 0, &chain)?, state);

        Ok(())
    }
}
