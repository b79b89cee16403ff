use super::chain::{Block, Blockchain};
use serde::Serialize;

/// Why a block failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InvalidReason {
    /// `previous_hash` differs from the predecessor's `hash`.
    BrokenLink,
    /// A non-system transaction's signature does not verify against its sender.
    BadSignature { tx_id: String },
    /// The stored hash no longer matches the block's contents.
    HashMismatch,
}

/// Outcome of a full chain walk. `first_invalid_index` is `None` for a valid chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub first_invalid_index: Option<u64>,
    pub reason: Option<InvalidReason>,
}

impl ValidationReport {
    fn valid() -> Self {
        ValidationReport {
            valid: true,
            first_invalid_index: None,
            reason: None,
        }
    }

    fn invalid(index: u64, reason: InvalidReason) -> Self {
        ValidationReport {
            valid: false,
            first_invalid_index: Some(index),
            reason: Some(reason),
        }
    }

    /// The failing index, or `-1` when the chain is valid.
    pub fn first_invalid_index_or_sentinel(&self) -> i64 {
        self.first_invalid_index
            .and_then(|i| i64::try_from(i).ok())
            .unwrap_or(-1)
    }
}

fn check_block(previous: &Block, block: &Block) -> Option<InvalidReason> {
    if block.previous_hash != previous.hash {
        return Some(InvalidReason::BrokenLink);
    }

    if let Some(tx) = block
        .transactions
        .iter()
        .find(|tx| !tx.is_system() && !tx.verify_signature())
    {
        return Some(InvalidReason::BadSignature {
            tx_id: tx.id.clone(),
        });
    }

    if block.recompute_hash() != block.hash {
        return Some(InvalidReason::HashMismatch);
    }

    None
}

/// Walks blocks 1..N in order and stops at the first problem.
///
/// Genesis is trusted by construction and never checked. Difficulty is not re-checked
/// either; only links, signatures and hashes are.
pub fn validate_chain(blocks: &[Block]) -> ValidationReport {
    for (position, pair) in blocks.windows(2).enumerate() {
        let (previous, block) = (&pair[0], &pair[1]);
        if let Some(reason) = check_block(previous, block) {
            // Reported by position in the chain; the stored index may itself be tampered.
            let index = position as u64 + 1;
            tracing::warn!(
                index,
                stored_index = block.index,
                ?reason,
                "chain validation failed"
            );
            return ValidationReport::invalid(index, reason);
        }
    }
    ValidationReport::valid()
}

impl Blockchain {
    pub fn validate(&self) -> ValidationReport {
        validate_chain(&self.blocks)
    }
}
