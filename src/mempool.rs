//! Pool of submitted transactions waiting to be mined.

use crate::error::TxError;
use crate::transaction::Transaction;

/// FIFO queue of unconfirmed transactions.
///
/// Admission only checks that the required fields are present. Signatures, balances and
/// duplicates are not checked, so an already-confirmed transaction can be queued again.
#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    transactions: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `tx` in arrival order, or rejects it without touching the pool.
    pub fn submit(&mut self, tx: Transaction) -> Result<(), TxError> {
        tx.check_submission()?;
        tracing::debug!(id = %tx.id, amount = tx.amount, "transaction queued");
        self.transactions.push(tx);
        Ok(())
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Total of `amount + fee` over pooled transactions sent by `address`.
    pub fn pending_debit(&self, address: &str) -> f64 {
        self.transactions
            .iter()
            .filter(|tx| tx.sender == address)
            .map(Transaction::total_debit)
            .sum()
    }

    /// Empties the pool, returning what it held.
    pub fn take(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn signed(sender: &KeyPair, recipient: &str, amount: f64) -> Transaction {
        Transaction::new(sender.public_key_hex(), recipient, amount).signed(sender)
    }

    #[test]
    fn test_submit_keeps_arrival_order() {
        let alice = KeyPair::generate();
        let mut pool = TransactionPool::new();

        let first = signed(&alice, "bob", 1.0);
        let second = signed(&alice, "carol", 2.0);
        pool.submit(first.clone()).unwrap();
        pool.submit(second.clone()).unwrap();

        assert_eq!(pool.transactions(), &[first, second]);
    }

    #[test]
    fn test_rejection_leaves_pool_untouched() {
        let alice = KeyPair::generate();
        let mut pool = TransactionPool::new();
        pool.submit(signed(&alice, "bob", 1.0)).unwrap();

        let mut unsigned = Transaction::new(alice.public_key_hex(), "bob", 3.0);
        assert_eq!(pool.submit(unsigned.clone()), Err(TxError::MissingSignature));

        unsigned.recipient.clear();
        assert_eq!(pool.submit(unsigned), Err(TxError::MissingField("recipient")));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_bad_signature_is_still_admitted() {
        let alice = KeyPair::generate();
        let mut tx = signed(&alice, "bob", 1.0);
        tx.signature = "deadbeef".to_string();

        let mut pool = TransactionPool::new();
        assert!(pool.submit(tx).is_ok());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_duplicate_is_admitted() {
        let alice = KeyPair::generate();
        let tx = signed(&alice, "bob", 1.0);

        let mut pool = TransactionPool::new();
        pool.submit(tx.clone()).unwrap();
        pool.submit(tx).unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_pending_debit_counts_only_sender() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let mut pool = TransactionPool::new();

        pool.submit(signed(&alice, &bob.public_key_hex(), 4.0)).unwrap();
        pool.submit(
            Transaction::new(alice.public_key_hex(), bob.public_key_hex(), 1.0)
                .with_fee(0.5)
                .signed(&alice),
        )
        .unwrap();
        pool.submit(signed(&bob, &alice.public_key_hex(), 7.0)).unwrap();

        assert_eq!(pool.pending_debit(&alice.public_key_hex()), 5.5);
        assert_eq!(pool.pending_debit(&bob.public_key_hex()), 7.0);
        assert_eq!(pool.pending_debit("nobody"), 0.0);
    }

    #[test]
    fn test_take_empties_pool() {
        let alice = KeyPair::generate();
        let mut pool = TransactionPool::new();
        pool.submit(signed(&alice, "bob", 1.0)).unwrap();

        let drained = pool.take();
        assert_eq!(drained.len(), 1);
        assert!(pool.is_empty());
    }
}
