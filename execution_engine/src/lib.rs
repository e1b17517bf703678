//! Transaction execution against a [`LedgerState`](ledger::LedgerState).
//!
//! A transaction is classified, then run inside an [`ExecutionContext`]. Nested calls get their
//! own frames. A failed frame leaves no trace in its caller apart from the error it returns.

pub use crate::{
    classification::{classify, TransactionKind},
    context::ExecutionContext,
    contracts::Contract,
    error::{ExecutionError, InvalidTransaction},
    processing::{contract_address, process_tx},
};

mod classification;
mod context;
mod contracts;
mod error;
mod processing;
