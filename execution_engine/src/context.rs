use ledger::{LedgerState, StateChange};
use types::{
    config::Config,
    primitives::{AccountId, Balance, StorageKey, StorageValue, U256},
    transactions::{Call, ContractCode},
};

use crate::{contracts::Contract as _, error::ExecutionError};

/// One call frame.
///
/// Changes are applied to the frame's own copy of the ledger and logged. A successful nested
/// frame is absorbed into its caller. A failed one is dropped.
pub struct ExecutionContext<'config> {
    config: &'config Config,
    origin: AccountId,
    caller: AccountId,
    callee: AccountId,
    value: Balance,
    depth: usize,
    ledger: LedgerState,
    changes: Vec<StateChange>,
}

impl<'config> ExecutionContext<'config> {
    /// Creates the outermost frame of a transaction sent by `origin`.
    #[must_use]
    pub const fn new(config: &'config Config, origin: AccountId, ledger: LedgerState) -> Self {
        Self {
            config,
            origin,
            caller: origin,
            callee: origin,
            value: 0,
            depth: 0,
            ledger,
            changes: vec![],
        }
    }

    #[must_use]
    pub const fn origin(&self) -> AccountId {
        self.origin
    }

    #[must_use]
    pub const fn caller(&self) -> AccountId {
        self.caller
    }

    #[must_use]
    pub const fn callee(&self) -> AccountId {
        self.callee
    }

    #[must_use]
    pub const fn value(&self) -> Balance {
        self.value
    }

    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub const fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    #[must_use]
    pub fn changes(&self) -> &[StateChange] {
        &self.changes
    }

    #[must_use]
    pub fn into_parts(self) -> (LedgerState, Vec<StateChange>) {
        (self.ledger, self.changes)
    }

    pub fn record(&mut self, change: StateChange) -> Result<(), ExecutionError> {
        self.ledger.apply(&change)?;
        self.changes.push(change);
        Ok(())
    }

    #[must_use]
    pub fn read_storage(&self, key: StorageKey) -> StorageValue {
        self.ledger.storage(self.callee, key)
    }

    pub fn write_storage(&mut self, key: StorageKey, value: StorageValue) -> Result<(), ExecutionError> {
        let old = self.read_storage(key);

        if old == value {
            return Ok(());
        }

        self.record(StateChange::UpdateStorage {
            account: self.callee,
            key,
            old,
            new: value,
        })
    }

    /// Moves `amount` from `from` to `to`, creating `to` if it does not exist yet.
    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Balance,
    ) -> Result<(), ExecutionError> {
        if amount == 0 {
            return Ok(());
        }

        let balance = self.ledger.balance(from);

        if balance < amount {
            return Err(ExecutionError::InsufficientBalance {
                account: from,
                balance,
                amount,
            });
        }

        if !self.ledger.contains(to) {
            self.record(StateChange::CreateAccount {
                account: to,
                code: None,
            })?;
        }

        self.record(StateChange::RemoveBalance {
            account: from,
            amount,
        })?;

        self.record(StateChange::AddBalance {
            account: to,
            amount,
        })
    }

    /// Runs `call` against the contract at `target` in a nested frame.
    pub fn call(
        &mut self,
        target: AccountId,
        value: Balance,
        call: &Call,
    ) -> Result<(), ExecutionError> {
        let code = self
            .ledger
            .code(target)
            .cloned()
            .ok_or(ExecutionError::NoContract { account: target })?;

        let mut frame = self.nested(target, value)?;

        frame.transfer(self.callee, target, value)?;
        code.invoke(&mut frame, call)?;

        self.absorb(frame);

        Ok(())
    }

    /// Creates a contract account at `address` and runs its constructor in a nested frame.
    pub fn deploy(
        &mut self,
        address: AccountId,
        code: &ContractCode,
        args: &[U256],
        value: Balance,
    ) -> Result<(), ExecutionError> {
        if self.ledger.contains(address) {
            return Err(ExecutionError::AddressCollision { address });
        }

        let mut frame = self.nested(address, value)?;

        frame.record(StateChange::CreateAccount {
            account: address,
            code: Some(code.clone()),
        })?;

        frame.transfer(self.callee, address, value)?;

        if code.has_constructor() {
            code.construct(&mut frame, args)?;
        }

        self.absorb(frame);

        Ok(())
    }

    fn nested(&self, callee: AccountId, value: Balance) -> Result<Self, ExecutionError> {
        let depth = self.depth + 1;
        let limit = self.config.max_call_depth;

        if depth > limit {
            return Err(ExecutionError::CallDepthExceeded { depth, limit });
        }

        Ok(Self {
            config: self.config,
            origin: self.origin,
            caller: self.callee,
            callee,
            value,
            depth,
            ledger: self.ledger.clone(),
            changes: vec![],
        })
    }

    fn absorb(&mut self, frame: Self) {
        self.ledger = frame.ledger;
        self.changes.extend(frame.changes);
    }
}
