pub use ethereum_types::{H160, H256, U256};

pub type AccountId = H160;
pub type Balance = u64;
pub type CommitteeIndex = u64;
pub type Epoch = u64;
pub type Gwei = u64;
pub type Height = u64;
pub type InactivityScore = u64;
pub type Nonce = u64;
pub type ParticipationFlags = u8;
pub type Slot = u64;
pub type StorageKey = H256;
pub type StorageValue = U256;
pub type ValidatorIndex = u64;
