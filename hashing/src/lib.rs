//! Content hashing over a canonical little-endian encoding.
//!
//! Every identity hash in the workspace is produced by feeding fields into a [`ContentHasher`]
//! in a fixed order. Variable-length sequences are prefixed with their length so that
//! concatenations of different field lists cannot collide.

use ethereum_types::{H160, H256, U256};
use sha2::{Digest as _, Sha256};

#[derive(Clone, Default)]
pub struct ContentHasher {
    sha256: Sha256,
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn u8(mut self, value: u8) -> Self {
        self.sha256.update([value]);
        self
    }

    #[must_use]
    pub fn u64(mut self, value: u64) -> Self {
        self.sha256.update(value.to_le_bytes());
        self
    }

    #[must_use]
    pub fn h160(mut self, value: H160) -> Self {
        self.sha256.update(value.as_bytes());
        self
    }

    #[must_use]
    pub fn h256(mut self, value: H256) -> Self {
        self.sha256.update(value.as_bytes());
        self
    }

    #[must_use]
    pub fn u256(mut self, value: U256) -> Self {
        let mut bytes = [0; 32];
        value.to_little_endian(&mut bytes);
        self.sha256.update(bytes);
        self
    }

    #[must_use]
    pub fn bytes(self, bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref();
        let mut hasher = self.length(bytes.len());
        hasher.sha256.update(bytes);
        hasher
    }

    /// Prefixes a sequence with its length.
    #[must_use]
    pub fn length(self, length: usize) -> Self {
        // `usize` is at most 64 bits wide on every supported target.
        self.u64(length as u64)
    }

    #[must_use]
    pub fn finish(self) -> H256 {
        H256::from_slice(self.sha256.finalize().as_slice())
    }
}

#[inline]
#[must_use]
pub fn hash_64(value: u64) -> H256 {
    ContentHasher::new().u64(value).finish()
}

#[inline]
#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    ContentHasher::new().h256(left).h256(right).finish()
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn empty_input_hashes_to_sha256_of_empty_string() {
        assert_eq!(
            ContentHasher::new().finish(),
            H256(hex!(
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
            )),
        );
    }

    #[test]
    fn hash_256_256_matches_sha256_of_concatenation() {
        // SHA-256 of 64 zero bytes.
        assert_eq!(
            hash_256_256(H256::zero(), H256::zero()),
            H256(hex!(
                "f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b"
            )),
        );
    }

    #[test]
    fn length_prefix_separates_adjacent_sequences() {
        let split_early = ContentHasher::new().bytes([1]).bytes([2, 3]).finish();
        let split_late = ContentHasher::new().bytes([1, 2]).bytes([3]).finish();

        assert_ne!(split_early, split_late);
    }

    #[test]
    fn field_order_matters() {
        assert_ne!(
            ContentHasher::new().u64(1).u64(2).finish(),
            ContentHasher::new().u64(2).u64(1).finish(),
        );
    }
}
