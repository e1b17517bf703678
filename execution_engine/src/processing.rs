use hashing::ContentHasher;
use ledger::{LedgerState, Receipt, StateChange};
use tracing::debug;
use types::{
    config::Config,
    primitives::{AccountId, Nonce},
    transactions::Transaction,
};

use crate::{
    classification::{classify, TransactionKind},
    context::ExecutionContext,
    error::{ExecutionError, InvalidTransaction},
};

/// Address of the contract deployed by the transaction with `nonce` sent by `sender`.
#[must_use]
pub fn contract_address(sender: AccountId, nonce: Nonce) -> AccountId {
    let hash = ContentHasher::new().h160(sender).u64(nonce).finish();
    AccountId::from(hash)
}

/// Executes `transaction` on top of `ledger`.
///
/// Invalid transactions leave `ledger` untouched. Valid ones always increment the sender's nonce
/// and burn the fee, even if execution reverts.
pub fn process_tx(
    config: &Config,
    ledger: &mut LedgerState,
    transaction: &Transaction,
) -> Result<Receipt, InvalidTransaction> {
    let sender = transaction.sender;

    let Some(account) = ledger.account(sender) else {
        return Err(InvalidTransaction::UnknownSender { sender });
    };

    if account.nonce() != transaction.nonce {
        return Err(InvalidTransaction::NonceMismatch {
            sender,
            expected: account.nonce(),
            actual: transaction.nonce,
        });
    }

    if account.balance() < transaction.fee {
        return Err(InvalidTransaction::InsufficientFee {
            sender,
            balance: account.balance(),
            fee: transaction.fee,
        });
    }

    let mut changes = vec![StateChange::IncrementNonce { account: sender }];

    if transaction.fee > 0 {
        changes.push(StateChange::RemoveBalance {
            account: sender,
            amount: transaction.fee,
        });
    }

    ledger.apply_all(&changes)?;

    let kind = classify(ledger, transaction);
    let mut context = ExecutionContext::new(config, sender, ledger.clone());

    let (reverted, revert_reason) = match execute(&mut context, transaction, kind) {
        Ok(()) => {
            let (new_ledger, executed) = context.into_parts();
            *ledger = new_ledger;
            changes.extend(executed);
            (false, None)
        }
        Err(error) => {
            debug!("transaction {:?} reverted: {error}", transaction.hash());
            (true, Some(error.to_string()))
        }
    };

    Ok(Receipt {
        transaction: transaction.hash(),
        changes,
        reverted,
        revert_reason,
    })
}

fn execute(
    context: &mut ExecutionContext<'_>,
    transaction: &Transaction,
    kind: TransactionKind<'_>,
) -> Result<(), ExecutionError> {
    let Transaction {
        sender,
        nonce,
        value,
        ..
    } = *transaction;

    match kind {
        TransactionKind::Deployment { code, args } => {
            context.deploy(contract_address(sender, nonce), code, args, value)
        }
        TransactionKind::Transfer { destination } => context.transfer(sender, destination, value),
        TransactionKind::Call { destination, call } => context.call(destination, value, call),
        TransactionKind::NoOp => Ok(()),
    }
}
