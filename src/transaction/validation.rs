/// Validation logic for transactions separated from type definitions
use crate::error::TxError;
use crate::transaction::types::Transaction;

impl Transaction {
    /// Field presence checks applied when a transaction enters the pool.
    ///
    /// The signature is only checked for presence here; whether it actually
    /// verifies is decided when the chain is validated.
    pub fn check_submission(&self) -> Result<(), TxError> {
        if self.sender.is_empty() {
            return Err(TxError::MissingField("sender"));
        }
        if self.recipient.is_empty() {
            return Err(TxError::MissingField("recipient"));
        }
        if self.signature.is_empty() {
            return Err(TxError::MissingSignature);
        }
        Ok(())
    }

    /// Verifies the signature against the sender's public key over the canonical message.
    pub fn verify_signature(&self) -> bool {
        crate::crypto::verify_signature(&self.sender, &self.signature, &self.signable_message())
    }
}
