pub mod config;
pub mod consensus_state;
pub mod consts;
pub mod containers;
pub mod error;
pub mod primitives;
pub mod traits;
pub mod transactions;
