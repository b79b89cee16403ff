//! powledger - An in-memory, hash-linked proof-of-work ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the chain, balance replay and chain validation
//! - [`transaction`] - Transaction type, canonical signing message, submission checks
//! - [`mempool`] - Pool of transactions waiting to be mined
//!
//! ## Consensus
//! - [`miner`] - Cooperative, cancellable proof-of-work search
//!
//! ## Cryptography
//! - [`crypto`] - SHA-256 hashing and secp256k1 signatures
//!
//! ## Engine
//! - [`ledger`] - The explicitly owned engine handle exposed to collaborators
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Engine
// ============================================================================
pub mod ledger;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;

pub use blockchain::{Block, Blockchain, InvalidReason, ValidationReport};
pub use config::LedgerConfig;
pub use error::{ChainError, TxError};
pub use ledger::{Ledger, MiningTask};
pub use miner::{CancelToken, MiningEvent};
pub use transaction::Transaction;
