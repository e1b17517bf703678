use ledger::LedgerState;
use types::{
    primitives::{AccountId, U256},
    transactions::{Call, ContractCode, Payload, Transaction},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransactionKind<'tx> {
    Deployment {
        code: &'tx ContractCode,
        args: &'tx [U256],
    },
    Transfer {
        destination: AccountId,
    },
    Call {
        destination: AccountId,
        call: &'tx Call,
    },
    NoOp,
}

/// Decides how a transaction will be executed. Does not modify anything.
#[must_use]
pub fn classify<'tx>(ledger: &LedgerState, transaction: &'tx Transaction) -> TransactionKind<'tx> {
    let Some(destination) = transaction.destination else {
        return match &transaction.payload {
            Payload::Deploy { code, args } => TransactionKind::Deployment { code, args },
            Payload::Empty | Payload::Call(_) => TransactionKind::NoOp,
        };
    };

    let has_code = ledger.code(destination).is_some();

    match &transaction.payload {
        _ if !has_code && transaction.value > 0 => TransactionKind::Transfer { destination },
        Payload::Call(call) if has_code => TransactionKind::Call { destination, call },
        _ => TransactionKind::NoOp,
    }
}

#[cfg(test)]
mod tests {
    use ledger::StateChange;
    use test_case::test_case;

    use super::*;

    const ALICE: AccountId = AccountId::repeat_byte(0xa1);
    const CONTRACT: AccountId = AccountId::repeat_byte(0xc0);
    const NOBODY: AccountId = AccountId::repeat_byte(0x00);

    fn ledger() -> LedgerState {
        let mut ledger = LedgerState::with_balances([(ALICE, 100)]);

        ledger
            .apply(&StateChange::CreateAccount {
                account: CONTRACT,
                code: Some(ContractCode::Counter),
            })
            .expect("contract address is unused");

        ledger
    }

    fn transaction(destination: Option<AccountId>, value: u64, payload: Payload) -> Transaction {
        Transaction {
            sender: ALICE,
            nonce: 0,
            destination,
            value,
            fee: 1,
            payload,
        }
    }

    fn increment() -> Payload {
        Payload::Call(Call::new("increment", []))
    }

    #[test_case(None, 0, Payload::Deploy { code: ContractCode::Vault, args: vec![] } => "deployment")]
    #[test_case(None, 5, Payload::Empty => "no-op"; "nothing to deploy")]
    #[test_case(Some(NOBODY), 5, Payload::Empty => "transfer"; "transfer to new account")]
    #[test_case(Some(ALICE), 5, increment() => "transfer"; "payload ignored without code")]
    #[test_case(Some(NOBODY), 0, Payload::Empty => "no-op"; "zero-value transfer")]
    #[test_case(Some(CONTRACT), 0, increment() => "call")]
    #[test_case(Some(CONTRACT), 5, increment() => "call"; "call with value")]
    #[test_case(Some(CONTRACT), 5, Payload::Empty => "no-op"; "value to contract without payload")]
    fn classification(
        destination: Option<AccountId>,
        value: u64,
        payload: Payload,
    ) -> &'static str {
        match classify(&ledger(), &transaction(destination, value, payload)) {
            TransactionKind::Deployment { .. } => "deployment",
            TransactionKind::Transfer { .. } => "transfer",
            TransactionKind::Call { .. } => "call",
            TransactionKind::NoOp => "no-op",
        }
    }
}
