//! Error types for powledger

use thiserror::Error;

/// Submission-time rejection of a transaction handed to the pool.
///
/// These are local and recoverable: the pool is left untouched and the caller is
/// expected to fix the transaction and resubmit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Missing signature")]
    MissingSignature,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Block not found at index {0}")]
    BlockNotFound(u64),

    #[error("Mining cancelled")]
    MiningCancelled,

    #[error("Mining task failed: {0}")]
    MiningTaskFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transaction rejected: {0}")]
    Tx(#[from] TxError),
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
