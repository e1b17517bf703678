use std::collections::{btree_map::Entry, BTreeMap, HashMap, HashSet};

use ledger::LedgerState;
use types::{
    containers::{Attestation, Block},
    primitives::{AccountId, Nonce, Slot, H256},
    transactions::Transaction,
};

/// Transactions waiting for inclusion, keyed by sender and nonce.
#[derive(Clone, Default, Debug)]
pub struct TransactionPool {
    by_account: BTreeMap<AccountId, BTreeMap<Nonce, Transaction>>,
}

impl TransactionPool {
    /// Adds `transaction` unless another one with the same sender and nonce is pending.
    pub fn insert(&mut self, transaction: Transaction) -> bool {
        let pending = self.by_account.entry(transaction.sender).or_default();

        match pending.entry(transaction.nonce) {
            Entry::Vacant(vacant) => {
                vacant.insert(transaction);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Drops transactions whose nonces have already been used in `ledger`.
    pub fn prune(&mut self, ledger: &LedgerState) {
        self.by_account.retain(|sender, pending| {
            let next_nonce = ledger.nonce(*sender);
            pending.retain(|nonce, _| *nonce >= next_nonce);
            !pending.is_empty()
        });
    }

    /// Transactions that can be applied to `ledger` one after another.
    ///
    /// For every sender these are the pending nonces counting up from the sender's next nonce,
    /// stopping at the first gap.
    #[must_use]
    pub fn executable(&self, ledger: &LedgerState) -> Vec<Transaction> {
        self.by_account
            .iter()
            .flat_map(|(sender, pending)| {
                let next_nonce = ledger.nonce(*sender);

                pending
                    .range(next_nonce..)
                    .zip(next_nonce..)
                    .take_while(|((nonce, _), expected)| **nonce == *expected)
                    .map(|((_, transaction), _)| transaction.clone())
            })
            .collect()
    }

    #[must_use]
    pub const fn by_account(&self) -> &BTreeMap<AccountId, BTreeMap<Nonce, Transaction>> {
        &self.by_account
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_account.values().map(BTreeMap::len).sum()
    }
}

/// Attestations known to the node, split by whether the canonical chain includes them.
#[derive(Clone, Default, Debug)]
pub struct AttestationPool {
    pending: HashSet<Attestation>,
    // Maps to the canonical block that includes the attestation.
    included: HashMap<Attestation, H256>,
}

impl AttestationPool {
    /// Adds `attestation` to the pending set unless it is known already.
    pub fn insert(&mut self, attestation: Attestation) -> bool {
        !self.included.contains_key(&attestation) && self.pending.insert(attestation)
    }

    #[must_use]
    pub fn contains(&self, attestation: &Attestation) -> bool {
        self.pending.contains(attestation) || self.included.contains_key(attestation)
    }

    #[must_use]
    pub fn is_included(&self, attestation: &Attestation) -> bool {
        self.included.contains_key(attestation)
    }

    /// Records that `block` joined the canonical chain.
    pub fn include(&mut self, block: &Block) {
        for attestation in &block.attestations {
            self.pending.remove(attestation);
            self.included.insert(*attestation, block.root);
        }
    }

    /// Records that `block` left the canonical chain. Its attestations become pending again.
    pub fn exclude(&mut self, block: &Block) {
        for attestation in &block.attestations {
            if self.included.get(attestation) == Some(&block.root) {
                self.included.remove(attestation);
                self.pending.insert(*attestation);
            }
        }
    }

    /// Forgets attestations from before `oldest_slot`.
    pub fn prune(&mut self, oldest_slot: Slot) {
        self.pending.retain(|attestation| attestation.slot >= oldest_slot);
        self.included
            .retain(|attestation, _| attestation.slot >= oldest_slot);
    }

    pub fn pending(&self) -> impl Iterator<Item = &Attestation> {
        self.pending.iter()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
