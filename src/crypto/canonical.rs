use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Key/value payload that hashes independently of insertion order.
///
/// Values are concatenated in ascending key order with no separators. Keys only
/// decide the order; they are not part of the hashed bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalPayload {
    fields: BTreeMap<String, String>,
}

impl CanonicalPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. A repeated key overwrites the previous value.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    pub fn to_canonical_string(&self) -> String {
        self.fields.values().map(String::as_str).collect()
    }

    /// SHA-256 of the canonical string.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.to_canonical_string().as_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest[..]);
        out
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.digest())
    }
}
