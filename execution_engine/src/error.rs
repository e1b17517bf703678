use std::borrow::Cow;

use thiserror::Error;
use types::primitives::{AccountId, Balance, Nonce};

/// Failure of a single call frame. Reverts the frame but not the transaction's nonce or fee.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("call depth limit exceeded (depth: {depth}, limit: {limit})")]
    CallDepthExceeded { depth: usize, limit: usize },
    #[error("insufficient balance (account: {account:?}, balance: {balance}, amount: {amount})")]
    InsufficientBalance {
        account: AccountId,
        balance: Balance,
        amount: Balance,
    },
    #[error("account has no contract code: {account:?}")]
    NoContract { account: AccountId },
    #[error("an account already exists at the deployment address: {address:?}")]
    AddressCollision { address: AccountId },
    #[error("contract has no method named {method:?}")]
    UnknownMethod { method: String },
    #[error("argument {index} of {method:?} is out of range")]
    ArgumentOutOfRange { method: String, index: usize },
    #[error("execution reverted: {reason}")]
    Reverted { reason: Cow<'static, str> },
    #[error(transparent)]
    Ledger(#[from] ledger::Error),
}

/// Reasons a transaction cannot be included at all.
#[derive(Debug, Error)]
pub enum InvalidTransaction {
    #[error("sender account does not exist: {sender:?}")]
    UnknownSender { sender: AccountId },
    #[error("nonce mismatch (sender: {sender:?}, expected: {expected}, actual: {actual})")]
    NonceMismatch {
        sender: AccountId,
        expected: Nonce,
        actual: Nonce,
    },
    #[error("sender cannot pay the fee (sender: {sender:?}, balance: {balance}, fee: {fee})")]
    InsufficientFee {
        sender: AccountId,
        balance: Balance,
        fee: Balance,
    },
    #[error(transparent)]
    Ledger(#[from] ledger::Error),
}
