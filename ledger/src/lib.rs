//! Account registry mutated only through invertible [`StateChange`]s.
//!
//! Every mutation of a [`LedgerState`] is expressed as a change whose [`StateChange::revert`]
//! undoes it exactly. Receipts record the changes made by a transaction so that the
//! transaction can be rolled back when its block leaves the canonical chain.

pub use crate::{
    account::Account, changes::StateChange, error::Error, ledger_state::LedgerState,
    receipt::Receipt,
};

mod account;
mod changes;
mod error;
mod ledger_state;
mod receipt;
