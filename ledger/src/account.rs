use im::HashMap;
use types::{
    primitives::{Balance, Nonce, StorageKey, StorageValue},
    transactions::ContractCode,
};

/// Zero-valued storage words are never stored so that structurally equal accounts compare equal.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Account {
    pub(crate) balance: Balance,
    pub(crate) nonce: Nonce,
    pub(crate) storage: HashMap<StorageKey, StorageValue>,
    pub(crate) code: Option<ContractCode>,
}

impl Account {
    pub(crate) fn new(code: Option<ContractCode>) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn balance(&self) -> Balance {
        self.balance
    }

    #[must_use]
    pub const fn nonce(&self) -> Nonce {
        self.nonce
    }

    #[must_use]
    pub const fn code(&self) -> Option<&ContractCode> {
        self.code.as_ref()
    }

    #[must_use]
    pub fn storage(&self, key: StorageKey) -> StorageValue {
        self.storage.get(&key).copied().unwrap_or_default()
    }

    /// Whether the account is indistinguishable from one that was just created.
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.balance == 0 && self.nonce == 0 && self.storage.is_empty()
    }

    pub(crate) fn set_storage(&mut self, key: StorageKey, value: StorageValue) {
        if value.is_zero() {
            self.storage.remove(&key);
        } else {
            self.storage.insert(key, value);
        }
    }
}
