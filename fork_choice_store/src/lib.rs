//! Block tree and attestation-weighted fork choice.
//!
//! [`BlockTree`] stores every admitted block in an arena indexed by [`NodeIndex`]. Parents and
//! children refer to each other by index. Blocks whose parent is not known yet are staged until
//! the parent arrives.
//!
//! [`ForkChoiceAggregator`] keeps the latest vote of every validator and the weight each vote adds
//! to the blocks between the justified block and the voted block. Head selection starts at the
//! justified block and follows the heaviest child at every fork.
//!
//! Both report head movements as a [`ChainChange`] listing the blocks that left the canonical
//! chain and the blocks that joined it.

pub use crate::{
    aggregator::ForkChoiceAggregator,
    block_tree::BlockTree,
    error::Error,
    misc::{Admission, ChainChange, ChainLink, LatestMessage, NodeIndex},
    store_config::StoreConfig,
};

mod aggregator;
mod block_tree;
mod error;
mod misc;
mod store_config;

#[cfg(test)]
mod fixtures;
