use serde::{Deserialize, Serialize};

use super::merkle::{EMPTY_MERKLE_ROOT, merkle_root};
use super::{GENESIS_CREATOR, GENESIS_PREDECESSOR, GENESIS_TIMESTAMP};
use crate::crypto::{self, CanonicalPayload};
use crate::error::TransactionError;
use crate::transaction::Transaction;

/// A batch of transactions plus linkage and Proof-of-Work metadata.
///
/// The block hash is derived from the header (id, Merkle root, predecessor,
/// creator, nonce) and is never stored on the block itself. The timestamp and
/// the transaction bodies are outside the hashed header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: u64,
    pub previous_hash: String,
    pub merkle_root: String,
    pub creator: String,
    pub nonce: Option<u64>, // set once mining succeeds
    pub timestamp: Option<f64>, // Unix seconds, set once mining succeeds
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The fixed first block. Identical on every node.
    pub fn genesis() -> Self {
        Self {
            id: 0,
            previous_hash: GENESIS_PREDECESSOR.to_string(),
            merkle_root: EMPTY_MERKLE_ROOT.to_string(),
            creator: GENESIS_CREATOR.to_string(),
            nonce: Some(0),
            timestamp: Some(GENESIS_TIMESTAMP),
            transactions: Vec::new(),
        }
    }

    /// Create a candidate block (not mined yet). Every transaction must be signed.
    pub fn new(
        id: u64,
        previous_hash: String,
        creator: String,
        transactions: Vec<Transaction>,
    ) -> Result<Self, TransactionError> {
        Ok(Self {
            id,
            previous_hash,
            merkle_root: merkle_root(&transactions)?,
            creator,
            nonce: None,
            timestamp: None,
            transactions,
        })
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_hash == GENESIS_PREDECESSOR
    }

    /// Header fields as hashed, with an explicit nonce.
    pub fn header_payload(&self, nonce: u64) -> CanonicalPayload {
        CanonicalPayload::new()
            .with("index", self.id)
            .with("tree_hash", &self.merkle_root)
            .with("pre_hash", &self.previous_hash)
            .with("creator", &self.creator)
            .with("nonce", nonce)
    }

    pub fn hash_with_nonce(&self, nonce: u64) -> String {
        crypto::hash(&self.header_payload(nonce))
    }

    /// Header hash. An unmined block hashes with nonce 0.
    pub fn compute_hash(&self) -> String {
        self.hash_with_nonce(self.nonce.unwrap_or(0))
    }

    pub fn has_valid_merkle_root(&self) -> bool {
        merkle_root(&self.transactions).is_ok_and(|root| root == self.merkle_root)
    }

    pub fn is_mined(&self) -> bool {
        self.nonce.is_some() && self.timestamp.is_some()
    }
}
