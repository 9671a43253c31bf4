//! Hashing and secp256k1 signing over canonical payloads.

pub mod canonical;

use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

pub use canonical::CanonicalPayload;

/// Hex SHA-256 of raw bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Deterministic hex digest of a canonical payload.
pub fn hash(payload: &CanonicalPayload) -> String {
    payload.hash_hex()
}

/// Generate a new secp256k1 keypair and return (priv_hex, pub_hex_compressed).
pub fn generate_keypair_hex() -> (String, String) {
    let secp = Secp256k1::new();
    let (sk, pk) = secp.generate_keypair(&mut OsRng);
    (hex::encode(sk.secret_bytes()), hex::encode(pk.serialize()))
}

/// Sign the canonical hash of `payload`. Returns a hex DER ECDSA signature.
pub fn sign(private_key_hex: &str, payload: &CanonicalPayload) -> Result<String, CryptoError> {
    let secp = Secp256k1::signing_only();
    let sk_bytes = hex::decode(private_key_hex).map_err(|_| CryptoError::InvalidKeyHex)?;
    let sk = SecretKey::from_slice(&sk_bytes).map_err(|_| CryptoError::InvalidKey)?;
    let msg = Message::from_slice(&payload.digest()).map_err(|_| CryptoError::InvalidKey)?;
    let sig = secp.sign_ecdsa(&msg, &sk);
    Ok(hex::encode(sig.serialize_der().to_vec()))
}

/// Verify a hex DER signature against a hex compressed public key.
/// Any malformed input yields `false`.
pub fn verify(public_key_hex: &str, payload: &CanonicalPayload, signature_hex: &str) -> bool {
    let secp = Secp256k1::verification_only();

    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(sig) = Signature::from_der(&sig_bytes) else {
        return false;
    };
    let Ok(pk_bytes) = hex::decode(public_key_hex) else {
        return false;
    };
    let Ok(pk) = PublicKey::from_slice(&pk_bytes) else {
        return false;
    };
    let Ok(msg) = Message::from_slice(&payload.digest()) else {
        return false;
    };
    secp.verify_ecdsa(&msg, &sig, &pk).is_ok()
}
