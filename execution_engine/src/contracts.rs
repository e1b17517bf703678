use std::borrow::Cow;

use types::{
    consts::CONSTRUCTOR,
    primitives::{AccountId, Balance, StorageKey, U256},
    transactions::{Call, ContractCode},
};

use crate::{context::ExecutionContext, error::ExecutionError};

const COUNTER_KEY: StorageKey = StorageKey::zero();
const FAILURES_KEY: StorageKey = StorageKey::repeat_byte(0xff);
const TRY_PREFIX: &str = "try_";

/// Behavior of a contract account.
pub trait Contract {
    /// Runs once when the contract is deployed.
    fn construct(
        &self,
        context: &mut ExecutionContext<'_>,
        args: &[U256],
    ) -> Result<(), ExecutionError> {
        let _ = (context, args);
        Ok(())
    }

    fn invoke(&self, context: &mut ExecutionContext<'_>, call: &Call) -> Result<(), ExecutionError>;
}

impl Contract for ContractCode {
    fn construct(
        &self,
        context: &mut ExecutionContext<'_>,
        args: &[U256],
    ) -> Result<(), ExecutionError> {
        match self {
            Self::Counter => Counter.construct(context, args),
            Self::Vault | Self::Forwarder { .. } | Self::Reverter | Self::Recurser => Ok(()),
        }
    }

    fn invoke(&self, context: &mut ExecutionContext<'_>, call: &Call) -> Result<(), ExecutionError> {
        if call.method == CONSTRUCTOR {
            return Err(unknown_method(call));
        }

        match self {
            Self::Counter => Counter.invoke(context, call),
            Self::Vault => Vault.invoke(context, call),
            Self::Forwarder { target } => Forwarder { target: *target }.invoke(context, call),
            Self::Reverter => Reverter.invoke(context, call),
            Self::Recurser => Recurser.invoke(context, call),
        }
    }
}

struct Counter;

impl Contract for Counter {
    fn construct(
        &self,
        context: &mut ExecutionContext<'_>,
        args: &[U256],
    ) -> Result<(), ExecutionError> {
        match args.first() {
            Some(initial) => context.write_storage(COUNTER_KEY, *initial),
            None => Ok(()),
        }
    }

    fn invoke(&self, context: &mut ExecutionContext<'_>, call: &Call) -> Result<(), ExecutionError> {
        let count = context.read_storage(COUNTER_KEY);
        let step = call.arg(0).unwrap_or_else(U256::one);

        let new_count = match call.method.as_str() {
            "increment" => count.checked_add(step).ok_or_else(|| revert("counter overflow"))?,
            "decrement" => count.checked_sub(step).ok_or_else(|| revert("counter underflow"))?,
            _ => return Err(unknown_method(call)),
        };

        context.write_storage(COUNTER_KEY, new_count)
    }
}

/// Deposits are keyed by the depositor's address.
struct Vault;

impl Contract for Vault {
    fn invoke(&self, context: &mut ExecutionContext<'_>, call: &Call) -> Result<(), ExecutionError> {
        let depositor = context.caller();
        let key = StorageKey::from(depositor);
        let deposited = context.read_storage(key);

        match call.method.as_str() {
            "deposit" => {
                let value = U256::from(context.value());
                let total = deposited
                    .checked_add(value)
                    .ok_or_else(|| revert("deposit overflow"))?;

                context.write_storage(key, total)
            }
            "withdraw" => {
                let amount = balance_arg(call, 0)?;

                if deposited < U256::from(amount) {
                    return Err(revert("withdrawal exceeds deposit"));
                }

                context.write_storage(key, deposited - U256::from(amount))?;
                context.transfer(context.callee(), depositor, amount)
            }
            _ => Err(unknown_method(call)),
        }
    }
}

/// Relays every call to `target` along with the value it received.
///
/// Methods prefixed with `try_` are relayed without the prefix. Their failures are counted in
/// storage instead of being propagated.
struct Forwarder {
    target: AccountId,
}

impl Contract for Forwarder {
    fn invoke(&self, context: &mut ExecutionContext<'_>, call: &Call) -> Result<(), ExecutionError> {
        let value = context.value();

        let Some(method) = call.method.strip_prefix(TRY_PREFIX) else {
            return context.call(self.target, value, call);
        };

        let relayed = Call::new(method, call.args.iter().copied());

        if context.call(self.target, value, &relayed).is_ok() {
            return Ok(());
        }

        let failures = context.read_storage(FAILURES_KEY);
        context.write_storage(FAILURES_KEY, failures + 1)?;

        // The value was never forwarded, so it has to go back.
        context.transfer(context.callee(), context.caller(), value)
    }
}

/// Writes to storage and then fails, leaving nothing behind.
struct Reverter;

impl Contract for Reverter {
    fn invoke(&self, context: &mut ExecutionContext<'_>, _call: &Call) -> Result<(), ExecutionError> {
        context.write_storage(COUNTER_KEY, U256::one())?;
        Err(revert("reverter always reverts"))
    }
}

/// `recurse(n)` bumps its counter and calls `recurse(n - 1)` on itself until `n` is 0.
struct Recurser;

impl Contract for Recurser {
    fn invoke(&self, context: &mut ExecutionContext<'_>, call: &Call) -> Result<(), ExecutionError> {
        if call.method != "recurse" {
            return Err(unknown_method(call));
        }

        let remaining = call.arg(0).unwrap_or_default();
        let count = context.read_storage(COUNTER_KEY);

        context.write_storage(COUNTER_KEY, count + 1)?;

        if remaining.is_zero() {
            return Ok(());
        }

        let next = Call::new("recurse", [remaining - 1]);
        context.call(context.callee(), 0, &next)
    }
}

fn balance_arg(call: &Call, index: usize) -> Result<Balance, ExecutionError> {
    call.arg(index)
        .and_then(|word| Balance::try_from(word).ok())
        .ok_or_else(|| ExecutionError::ArgumentOutOfRange {
            method: call.method.clone(),
            index,
        })
}

fn unknown_method(call: &Call) -> ExecutionError {
    ExecutionError::UnknownMethod {
        method: call.method.clone(),
    }
}

const fn revert(reason: &'static str) -> ExecutionError {
    ExecutionError::Reverted {
        reason: Cow::Borrowed(reason),
    }
}
