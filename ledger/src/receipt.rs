use serde::{Deserialize, Serialize};
use types::primitives::H256;

use crate::changes::StateChange;

/// Outcome of executing one transaction.
///
/// `changes` includes the nonce increment and fee payment even when `reverted` is set.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Receipt {
    pub transaction: H256,
    pub changes: Vec<StateChange>,
    pub reverted: bool,
    pub revert_reason: Option<String>,
}

impl Receipt {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        !self.reverted
    }
}
