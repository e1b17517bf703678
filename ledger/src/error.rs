use thiserror::Error;
use types::primitives::{AccountId, Balance, StorageKey, StorageValue};

#[derive(Debug, Error)]
pub enum Error {
    #[error("account already exists: {account:?}")]
    AccountAlreadyExists { account: AccountId },
    #[error("account does not exist: {account:?}")]
    AccountNotFound { account: AccountId },
    #[error("account cannot be deleted because it has been modified: {account:?}")]
    AccountNotPristine { account: AccountId },
    #[error("account code does not match (account: {account:?})")]
    CodeMismatch { account: AccountId },
    #[error("balance overflow (account: {account:?}, balance: {balance}, amount: {amount})")]
    BalanceOverflow {
        account: AccountId,
        balance: Balance,
        amount: Balance,
    },
    #[error("insufficient balance (account: {account:?}, balance: {balance}, amount: {amount})")]
    InsufficientBalance {
        account: AccountId,
        balance: Balance,
        amount: Balance,
    },
    #[error("nonce overflow (account: {account:?})")]
    NonceOverflow { account: AccountId },
    #[error("nonce underflow (account: {account:?})")]
    NonceUnderflow { account: AccountId },
    #[error(
        "storage value does not match \
         (account: {account:?}, key: {key:?}, expected: {expected}, actual: {actual})"
    )]
    StorageMismatch {
        account: AccountId,
        key: StorageKey,
        expected: StorageValue,
        actual: StorageValue,
    },
}
