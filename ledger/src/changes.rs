use serde::{Deserialize, Serialize};
use types::{
    primitives::{AccountId, Balance, StorageKey, StorageValue},
    transactions::ContractCode,
};

/// A single invertible mutation of the ledger.
///
/// `ledger.apply(&change)` followed by `ledger.apply(&change.revert())` leaves the ledger
/// unchanged whenever the first application succeeds.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub enum StateChange {
    CreateAccount {
        account: AccountId,
        code: Option<ContractCode>,
    },
    DeleteAccount {
        account: AccountId,
        code: Option<ContractCode>,
    },
    AddBalance {
        account: AccountId,
        amount: Balance,
    },
    RemoveBalance {
        account: AccountId,
        amount: Balance,
    },
    IncrementNonce {
        account: AccountId,
    },
    DecrementNonce {
        account: AccountId,
    },
    UpdateStorage {
        account: AccountId,
        key: StorageKey,
        old: StorageValue,
        new: StorageValue,
    },
}

impl StateChange {
    #[must_use]
    pub fn revert(&self) -> Self {
        match self.clone() {
            Self::CreateAccount { account, code } => Self::DeleteAccount { account, code },
            Self::DeleteAccount { account, code } => Self::CreateAccount { account, code },
            Self::AddBalance { account, amount } => Self::RemoveBalance { account, amount },
            Self::RemoveBalance { account, amount } => Self::AddBalance { account, amount },
            Self::IncrementNonce { account } => Self::DecrementNonce { account },
            Self::DecrementNonce { account } => Self::IncrementNonce { account },
            Self::UpdateStorage {
                account,
                key,
                old,
                new,
            } => Self::UpdateStorage {
                account,
                key,
                old: new,
                new: old,
            },
        }
    }

    #[must_use]
    pub const fn account(&self) -> AccountId {
        match self {
            Self::CreateAccount { account, .. }
            | Self::DeleteAccount { account, .. }
            | Self::AddBalance { account, .. }
            | Self::RemoveBalance { account, .. }
            | Self::IncrementNonce { account }
            | Self::DecrementNonce { account }
            | Self::UpdateStorage { account, .. } => *account,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;
    use types::primitives::{H256, U256};

    use super::*;

    const ACCOUNT: AccountId = AccountId::repeat_byte(1);

    #[test_case(StateChange::CreateAccount { account: ACCOUNT, code: Some(ContractCode::Vault) })]
    #[test_case(StateChange::AddBalance { account: ACCOUNT, amount: 5 })]
    #[test_case(StateChange::IncrementNonce { account: ACCOUNT })]
    #[test_case(StateChange::UpdateStorage {
        account: ACCOUNT,
        key: H256::repeat_byte(2),
        old: U256::zero(),
        new: U256::from(9),
    })]
    fn revert_is_an_involution(change: StateChange) {
        assert_ne!(change.revert(), change);
        assert_eq!(change.revert().revert(), change);
        assert_eq!(change.revert().account(), change.account());
    }
}
