use std::collections::BTreeSet;

use derivative::Derivative;
use types::primitives::ValidatorIndex;

/// Node-local settings. Unlike [`Config`](types::config::Config) these may differ between nodes.
#[derive(Clone, Derivative)]
#[derivative(Default, Debug)]
pub struct StoreConfig {
    /// Blocks further than this many slots ahead of their parent are rejected.
    #[derivative(Default(value = "32"))]
    pub max_empty_slots: u64,
    /// Validators whose attestations this node produces.
    pub local_validators: BTreeSet<ValidatorIndex>,
}

impl StoreConfig {
    #[must_use]
    pub fn with_local_validators(validators: impl IntoIterator<Item = ValidatorIndex>) -> Self {
        Self {
            local_validators: validators.into_iter().collect(),
            ..Self::default()
        }
    }
}
