/// Transaction types for powledger
use crate::crypto::KeyPair;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender and signature value marking a miner reward issued by the engine itself.
pub const SYSTEM_SENDER: &str = "SYSTEM";

/// A value transfer between two addresses.
///
/// `sender` and `recipient` are hex-encoded public keys. The signature covers
/// [`Transaction::signable_message`], never the id.
///
/// Field order here is the order used when a block serializes its transaction list
/// for hashing, so it must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub signature: String,
}

impl Transaction {
    /// Creates an unsigned transfer stamped with a fresh id and the current time.
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Self {
        Transaction {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            fee: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
            signature: String::new(),
        }
    }

    /// Attaches a fee. Must be called before signing, since the fee is part of the signed message.
    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee = Some(fee);
        self
    }

    /// The system reward crediting `miner_address` with `reward`.
    pub fn reward(miner_address: impl Into<String>, reward: f64) -> Self {
        Transaction {
            signature: SYSTEM_SENDER.to_string(),
            ..Transaction::new(SYSTEM_SENDER, miner_address, reward)
        }
    }

    pub fn is_system(&self) -> bool {
        self.sender == SYSTEM_SENDER
    }

    /// `amount + fee`, the total a sender gives up for this transaction.
    pub fn total_debit(&self) -> f64 {
        self.amount + self.fee.unwrap_or(0.0)
    }

    /// Canonical message: sender ∥ recipient ∥ amount ∥ [fee] ∥ timestamp.
    ///
    /// The fee only takes part when present, so transactions created without one
    /// sign and verify exactly as before fees existed.
    pub fn signable_message(&self) -> Vec<u8> {
        let mut message = String::new();
        message.push_str(&self.sender);
        message.push_str(&self.recipient);
        message.push_str(&self.amount.to_string());
        if let Some(fee) = self.fee {
            message.push_str(&fee.to_string());
        }
        message.push_str(&self.timestamp.to_string());
        message.into_bytes()
    }

    pub fn sign(&mut self, keypair: &KeyPair) {
        self.signature = keypair.sign(&self.signable_message());
    }

    /// Consuming variant of [`Transaction::sign`].
    pub fn signed(mut self, keypair: &KeyPair) -> Self {
        self.sign(keypair);
        self
    }
}
