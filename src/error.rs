use thiserror::Error;

/// Failures while producing a signature. Verification never errors; it returns `false`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid private key hex")]
    InvalidKeyHex,

    #[error("invalid private key bytes")]
    InvalidKey,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction is not signed")]
    Unsigned,

    /// The hash is fixed once set, so a second signature is refused.
    #[error("transaction is already signed")]
    AlreadySigned,

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown predecessor block {0}")]
    UnknownPredecessor(String),

    #[error("malformed transaction: {0}")]
    Transaction(#[from] TransactionError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max difficulty must be at least 1")]
    ZeroMaxDifficulty,

    #[error("max difficulty {0} exceeds the 64 hex characters of a SHA-256 digest")]
    MaxDifficultyTooHigh(u32),

    #[error("difficulty window must contain at least one block")]
    ZeroDifficultyWindow,

    #[error("a block must be allowed at least one transaction")]
    ZeroBlockSize,
}
