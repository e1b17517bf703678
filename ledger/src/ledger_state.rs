use core::ops::{AddAssign as _, SubAssign as _};

use im::HashMap;
use tracing::trace;
use types::{
    primitives::{AccountId, Balance, Nonce, StorageKey, StorageValue},
    transactions::ContractCode,
};

use crate::{account::Account, changes::StateChange, error::Error, receipt::Receipt};

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct LedgerState {
    accounts: HashMap<AccountId, Account>,
}

impl LedgerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger in which every listed account holds the given balance.
    #[must_use]
    pub fn with_balances(balances: impl IntoIterator<Item = (AccountId, Balance)>) -> Self {
        let accounts = balances
            .into_iter()
            .map(|(account, balance)| {
                let account_state = Account {
                    balance,
                    ..Account::default()
                };

                (account, account_state)
            })
            .collect();

        Self { accounts }
    }

    #[must_use]
    pub fn account(&self, account: AccountId) -> Option<&Account> {
        self.accounts.get(&account)
    }

    #[must_use]
    pub fn contains(&self, account: AccountId) -> bool {
        self.accounts.contains_key(&account)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn balance(&self, account: AccountId) -> Balance {
        self.account(account).map(Account::balance).unwrap_or_default()
    }

    #[must_use]
    pub fn nonce(&self, account: AccountId) -> Nonce {
        self.account(account).map(Account::nonce).unwrap_or_default()
    }

    #[must_use]
    pub fn storage(&self, account: AccountId, key: StorageKey) -> StorageValue {
        self.account(account)
            .map(|account| account.storage(key))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn code(&self, account: AccountId) -> Option<&ContractCode> {
        self.account(account).and_then(Account::code)
    }

    pub fn apply(&mut self, change: &StateChange) -> Result<(), Error> {
        trace!("applying state change: {change:?}");

        match change {
            StateChange::CreateAccount { account, code } => {
                if self.contains(*account) {
                    return Err(Error::AccountAlreadyExists { account: *account });
                }

                self.accounts.insert(*account, Account::new(code.clone()));
            }
            StateChange::DeleteAccount { account, code } => {
                let existing = self.existing(*account)?;

                if !existing.is_pristine() {
                    return Err(Error::AccountNotPristine { account: *account });
                }

                if existing.code.as_ref() != code.as_ref() {
                    return Err(Error::CodeMismatch { account: *account });
                }

                self.accounts.remove(account);
            }
            StateChange::AddBalance { account, amount } => {
                let existing = self.existing_mut(*account)?;

                let balance = existing
                    .balance
                    .checked_add(*amount)
                    .ok_or(Error::BalanceOverflow {
                        account: *account,
                        balance: existing.balance,
                        amount: *amount,
                    })?;

                existing.balance = balance;
            }
            StateChange::RemoveBalance { account, amount } => {
                let existing = self.existing_mut(*account)?;

                if existing.balance < *amount {
                    return Err(Error::InsufficientBalance {
                        account: *account,
                        balance: existing.balance,
                        amount: *amount,
                    });
                }

                existing.balance.sub_assign(*amount);
            }
            StateChange::IncrementNonce { account } => {
                let existing = self.existing_mut(*account)?;

                if existing.nonce == Nonce::MAX {
                    return Err(Error::NonceOverflow { account: *account });
                }

                existing.nonce.add_assign(1);
            }
            StateChange::DecrementNonce { account } => {
                let existing = self.existing_mut(*account)?;

                existing.nonce = existing
                    .nonce
                    .checked_sub(1)
                    .ok_or(Error::NonceUnderflow { account: *account })?;
            }
            StateChange::UpdateStorage {
                account,
                key,
                old,
                new,
            } => {
                let existing = self.existing_mut(*account)?;
                let actual = existing.storage(*key);

                if actual != *old {
                    return Err(Error::StorageMismatch {
                        account: *account,
                        key: *key,
                        expected: *old,
                        actual,
                    });
                }

                existing.set_storage(*key, *new);
            }
        }

        Ok(())
    }

    /// Applies `changes` in order. Either all of them are applied or none are.
    pub fn apply_all<'changes>(
        &mut self,
        changes: impl IntoIterator<Item = &'changes StateChange>,
    ) -> Result<(), Error> {
        let mut working = self.clone();

        for change in changes {
            working.apply(change)?;
        }

        *self = working;

        Ok(())
    }

    /// Undoes `changes` by applying their inverses in reverse order.
    pub fn revert_all(&mut self, changes: &[StateChange]) -> Result<(), Error> {
        let inverses = changes.iter().rev().map(StateChange::revert).collect::<Vec<_>>();
        self.apply_all(&inverses)
    }

    pub fn revert_receipt(&mut self, receipt: &Receipt) -> Result<(), Error> {
        self.revert_all(&receipt.changes)
    }

    fn existing(&self, account: AccountId) -> Result<&Account, Error> {
        self.accounts
            .get(&account)
            .ok_or(Error::AccountNotFound { account })
    }

    fn existing_mut(&mut self, account: AccountId) -> Result<&mut Account, Error> {
        self.accounts
            .get_mut(&account)
            .ok_or(Error::AccountNotFound { account })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;
    use test_case::test_case;
    use types::primitives::{H256, U256};

    use super::*;

    const ALICE: AccountId = AccountId::repeat_byte(0xa1);
    const BOB: AccountId = AccountId::repeat_byte(0xb0);
    const FRESH: AccountId = AccountId::repeat_byte(0xf0);
    const KEY: StorageKey = H256::repeat_byte(0x01);

    fn ledger_with_alice(balance: Balance, nonce: Nonce, value: u64) -> LedgerState {
        let mut changes = vec![StateChange::CreateAccount {
            account: BOB,
            code: None,
        }];

        changes.extend((0..nonce).map(|_| StateChange::IncrementNonce { account: ALICE }));

        changes.push(StateChange::UpdateStorage {
            account: ALICE,
            key: KEY,
            old: U256::zero(),
            new: U256::from(value),
        });

        let mut ledger = LedgerState::with_balances([(ALICE, balance)]);

        ledger
            .apply_all(&changes)
            .expect("setup changes apply to a ledger containing only Alice");

        ledger
    }

    fn arbitrary_change(ledger: &LedgerState, selector: u8, amount: u64, value: u64) -> StateChange {
        match selector % 7 {
            0 => StateChange::CreateAccount {
                account: FRESH,
                code: (amount % 2 == 0).then_some(ContractCode::Counter),
            },
            1 => StateChange::DeleteAccount {
                account: BOB,
                code: None,
            },
            2 => StateChange::AddBalance {
                account: ALICE,
                amount: amount % (Balance::MAX - ledger.balance(ALICE)).saturating_add(1),
            },
            3 => StateChange::RemoveBalance {
                account: ALICE,
                amount: amount % ledger.balance(ALICE).saturating_add(1),
            },
            4 => StateChange::IncrementNonce { account: ALICE },
            5 => StateChange::DecrementNonce { account: ALICE },
            _ => StateChange::UpdateStorage {
                account: ALICE,
                key: KEY,
                old: ledger.storage(ALICE, KEY),
                new: U256::from(value),
            },
        }
    }

    #[quickcheck]
    fn applying_a_change_and_its_revert_is_the_identity(
        balance: u32,
        nonce: u8,
        stored: u64,
        selector: u8,
        amount: u64,
        value: u64,
    ) -> TestResult {
        let original = ledger_with_alice(balance.into(), nonce.into(), stored);
        let change = arbitrary_change(&original, selector, amount, value);
        let mut ledger = original.clone();

        if ledger.apply(&change).is_err() {
            // Only decrementing a zero nonce is expected to fail.
            return TestResult::from_bool(matches!(change, StateChange::DecrementNonce { .. }));
        }

        TestResult::from_bool(ledger.apply(&change.revert()).is_ok() && ledger == original)
    }

    #[quickcheck]
    fn reverting_a_sequence_restores_the_ledger(
        selectors: Vec<u8>,
        amount: u64,
        value: u64,
    ) -> TestResult {
        let original = ledger_with_alice(1_000, 3, 7);
        let mut ledger = original.clone();
        let mut applied = vec![];

        for selector in selectors {
            let change = arbitrary_change(&ledger, selector, amount, value);

            if ledger.apply(&change).is_ok() {
                applied.push(change);
            }
        }

        TestResult::from_bool(ledger.revert_all(&applied).is_ok() && ledger == original)
    }

    #[test_case(
        StateChange::RemoveBalance { account: ALICE, amount: 101 }
        => matches Err(Error::InsufficientBalance { balance: 100, amount: 101, .. })
    )]
    #[test_case(
        StateChange::AddBalance { account: FRESH, amount: 1 }
        => matches Err(Error::AccountNotFound { .. })
    )]
    #[test_case(
        StateChange::CreateAccount { account: BOB, code: None }
        => matches Err(Error::AccountAlreadyExists { .. })
    )]
    #[test_case(
        StateChange::DeleteAccount { account: ALICE, code: None }
        => matches Err(Error::AccountNotPristine { .. })
    )]
    #[test_case(
        StateChange::DeleteAccount { account: BOB, code: Some(ContractCode::Vault) }
        => matches Err(Error::CodeMismatch { .. })
    )]
    #[test_case(
        StateChange::UpdateStorage { account: ALICE, key: KEY, old: U256::zero(), new: U256::one() }
        => matches Err(Error::StorageMismatch { .. })
    )]
    fn invalid_changes_are_rejected(change: StateChange) -> Result<(), Error> {
        let mut ledger = ledger_with_alice(100, 0, 5);

        let before = ledger.clone();
        let result = ledger.apply(&change);

        assert_eq!(ledger, before);

        result
    }

    #[test]
    fn zero_storage_values_are_not_stored() -> Result<()> {
        let mut ledger = ledger_with_alice(0, 0, 5);

        ledger.apply(&StateChange::UpdateStorage {
            account: ALICE,
            key: KEY,
            old: U256::from(5),
            new: U256::zero(),
        })?;

        assert!(ledger.account(ALICE).is_some_and(Account::is_pristine));

        Ok(())
    }

    #[test]
    fn apply_all_is_atomic() {
        let mut ledger = ledger_with_alice(10, 0, 0);
        let before = ledger.clone();

        let result = ledger.apply_all(&[
            StateChange::RemoveBalance {
                account: ALICE,
                amount: 4,
            },
            StateChange::RemoveBalance {
                account: ALICE,
                amount: 7,
            },
        ]);

        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));
        assert_eq!(ledger, before);
    }

    #[test]
    fn receipt_reverts_in_reverse_order() -> Result<()> {
        let mut ledger = LedgerState::with_balances([(ALICE, 50)]);
        let before = ledger.clone();

        // Creation must be undone last because the later changes touch the new account.
        let receipt = Receipt {
            transaction: H256::zero(),
            changes: vec![
                StateChange::IncrementNonce { account: ALICE },
                StateChange::CreateAccount {
                    account: BOB,
                    code: None,
                },
                StateChange::RemoveBalance {
                    account: ALICE,
                    amount: 20,
                },
                StateChange::AddBalance {
                    account: BOB,
                    amount: 20,
                },
            ],
            reverted: false,
            revert_reason: None,
        };

        ledger.apply_all(&receipt.changes)?;

        assert_eq!(ledger.balance(BOB), 20);
        assert_eq!(ledger.nonce(ALICE), 1);

        ledger.revert_receipt(&receipt)?;

        assert_eq!(ledger, before);
        assert!(!ledger.contains(BOB));

        Ok(())
    }

    #[test]
    fn receipt_round_trips_through_json() -> Result<()> {
        let receipt = Receipt {
            transaction: H256::repeat_byte(3),
            changes: vec![StateChange::UpdateStorage {
                account: ALICE,
                key: KEY,
                old: U256::from(1),
                new: U256::from(2),
            }],
            reverted: true,
            revert_reason: Some("out of gas".to_owned()),
        };

        let decoded = serde_json::from_str::<Receipt>(&serde_json::to_string(&receipt)?)?;

        assert_eq!(decoded, receipt);

        Ok(())
    }
}
