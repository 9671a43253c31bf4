use serde::{Deserialize, Serialize};

use crate::crypto::{self, CanonicalPayload};
use crate::error::TransactionError;

/// A signed transfer record between two public keys.
///
/// The signature and hash are written once by [`Transaction::sign`] and are
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub payload: String,
    signature: Option<String>,
    transaction_hash: Option<String>,
}

impl Transaction {
    /// Create an unsigned transaction. Keys are hex compressed secp256k1 public keys.
    pub fn new(sender: String, receiver: String, payload: String) -> Self {
        Self {
            sender,
            receiver,
            payload,
            signature: None,
            transaction_hash: None,
        }
    }

    /// Rebuild a transaction received from elsewhere. Nothing is verified here;
    /// use [`Transaction::verify_signature`] and [`Transaction::has_valid_hash`].
    pub fn from_parts(
        sender: String,
        receiver: String,
        payload: String,
        signature: String,
        transaction_hash: String,
    ) -> Self {
        Self {
            sender,
            receiver,
            payload,
            signature: Some(signature),
            transaction_hash: Some(transaction_hash),
        }
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn transaction_hash(&self) -> Option<&str> {
        self.transaction_hash.as_deref()
    }

    /// Payload covered by the signature (excludes the signature itself).
    pub fn signing_payload(&self) -> CanonicalPayload {
        CanonicalPayload::new()
            .with("sender", &self.sender)
            .with("receiver", &self.receiver)
            .with("payload", &self.payload)
    }

    /// Sign with the sender's private key and fix the transaction hash.
    pub fn sign(&mut self, private_key_hex: &str) -> Result<(), TransactionError> {
        if self.signature.is_some() {
            return Err(TransactionError::AlreadySigned);
        }
        let signature = crypto::sign(private_key_hex, &self.signing_payload())?;
        self.signature = Some(signature);
        self.transaction_hash = Some(self.compute_hash()?);
        Ok(())
    }

    /// Hash of the full canonical representation, signature included.
    pub fn compute_hash(&self) -> Result<String, TransactionError> {
        let signature = self.signature.as_ref().ok_or(TransactionError::Unsigned)?;
        let payload = self.signing_payload().with("signature", signature);
        Ok(crypto::hash(&payload))
    }

    /// True iff the signature is present and verifies against the sender key.
    pub fn verify_signature(&self) -> bool {
        match &self.signature {
            Some(sig) => crypto::verify(&self.sender, &self.signing_payload(), sig),
            None => false,
        }
    }

    /// True iff the stored hash matches the recomputed one.
    pub fn has_valid_hash(&self) -> bool {
        match (&self.transaction_hash, self.compute_hash()) {
            (Some(stored), Ok(computed)) => *stored == computed,
            _ => false,
        }
    }

    /// Signed, verifying, and carrying the right hash.
    pub fn is_valid(&self) -> bool {
        self.verify_signature() && self.has_valid_hash()
    }
}
