use hashing::ContentHasher;
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::{
    error::Error,
    primitives::{AccountId, Balance, Nonce, H256, U256},
};

/// Behavior bound to a contract account.
///
/// Contracts are built into the execution engine. The variant decides how calls are dispatched.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize, AsRefStr)]
pub enum ContractCode {
    /// Keeps a single counter in storage slot 0.
    Counter,
    /// Tracks deposits per caller and pays them back on withdrawal.
    Vault,
    /// Relays every call to `target`.
    Forwarder { target: AccountId },
    /// Writes to storage and then fails.
    Reverter,
    /// Calls itself until its argument reaches zero.
    Recurser,
}

impl ContractCode {
    #[must_use]
    pub const fn has_constructor(&self) -> bool {
        matches!(self, Self::Counter)
    }

    fn hash_into(&self, hasher: ContentHasher) -> ContentHasher {
        let hasher = hasher.bytes(self.as_ref());

        match self {
            Self::Forwarder { target } => hasher.h160(*target),
            Self::Counter | Self::Vault | Self::Reverter | Self::Recurser => hasher,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
pub struct Call {
    pub method: String,
    pub args: Vec<U256>,
}

impl Call {
    #[must_use]
    pub fn new(method: impl Into<String>, args: impl IntoIterator<Item = U256>) -> Self {
        Self {
            method: method.into(),
            args: args.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn arg(&self, index: usize) -> Option<U256> {
        self.args.get(index).copied()
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Default, Debug, Deserialize, Serialize)]
pub enum Payload {
    #[default]
    Empty,
    Deploy {
        code: ContractCode,
        args: Vec<U256>,
    },
    Call(Call),
}

impl Payload {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    pub sender: AccountId,
    pub nonce: Nonce,
    pub destination: Option<AccountId>,
    pub value: Balance,
    pub fee: Balance,
    pub payload: Payload,
}

impl Transaction {
    pub fn new(
        sender: AccountId,
        nonce: Nonce,
        destination: Option<AccountId>,
        value: Balance,
        fee: Balance,
        payload: Payload,
    ) -> Result<Self, Error> {
        match (&payload, destination) {
            (Payload::Deploy { .. }, Some(_)) => return Err(Error::DeploymentWithDestination),
            (Payload::Call(_), None) => return Err(Error::CallWithoutDestination),
            (Payload::Call(call), Some(_)) if call.method.is_empty() => {
                return Err(Error::CallWithoutMethod)
            }
            _ => {}
        }

        Ok(Self {
            sender,
            nonce,
            destination,
            value,
            fee,
            payload,
        })
    }

    #[must_use]
    pub const fn transfer(
        sender: AccountId,
        nonce: Nonce,
        destination: AccountId,
        value: Balance,
        fee: Balance,
    ) -> Self {
        Self {
            sender,
            nonce,
            destination: Some(destination),
            value,
            fee,
            payload: Payload::Empty,
        }
    }

    #[must_use]
    pub const fn deploy(
        sender: AccountId,
        nonce: Nonce,
        code: ContractCode,
        args: Vec<U256>,
        value: Balance,
        fee: Balance,
    ) -> Self {
        Self {
            sender,
            nonce,
            destination: None,
            value,
            fee,
            payload: Payload::Deploy { code, args },
        }
    }

    pub fn call(
        sender: AccountId,
        nonce: Nonce,
        destination: AccountId,
        call: Call,
        value: Balance,
        fee: Balance,
    ) -> Result<Self, Error> {
        Self::new(
            sender,
            nonce,
            Some(destination),
            value,
            fee,
            Payload::Call(call),
        )
    }

    #[must_use]
    pub fn hash(&self) -> H256 {
        let hasher = ContentHasher::new()
            .h160(self.sender)
            .u64(self.nonce)
            .u64(self.value)
            .u64(self.fee);

        let hasher = match self.destination {
            Some(destination) => hasher.u8(1).h160(destination),
            None => hasher.u8(0),
        };

        let hasher = match &self.payload {
            Payload::Empty => hasher.u8(0),
            Payload::Deploy { code, args } => hash_words(code.hash_into(hasher.u8(1)), args),
            Payload::Call(Call { method, args }) => hash_words(hasher.u8(2).bytes(method), args),
        };

        hasher.finish()
    }
}

fn hash_words(hasher: ContentHasher, words: &[U256]) -> ContentHasher {
    words
        .iter()
        .fold(hasher.length(words.len()), |hasher, word| hasher.u256(*word))
}
