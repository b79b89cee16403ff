use crate::transaction::Transaction;
use std::collections::BTreeMap;

use super::chain::{Block, Blockchain};

/// Net effect of `tx` on `address`: debits amount and fee when sending, credits amount
/// when receiving. Fees are credited to no one, and the system sender is never debited.
fn net_effect(tx: &Transaction, address: &str) -> f64 {
    let mut delta = 0.0;
    if tx.sender == address && !tx.is_system() {
        delta -= tx.total_debit();
    }
    if tx.recipient == address {
        delta += tx.amount;
    }
    delta
}

/// Replays committed history for `address`, in chain order.
pub fn committed_balance(blocks: &[Block], address: &str) -> f64 {
    blocks
        .iter()
        .flat_map(|block| block.transactions.iter())
        .map(|tx| net_effect(tx, address))
        .sum()
}

impl Blockchain {
    /// Spendable balance: committed history minus everything `address` has queued to send.
    ///
    /// Pending incoming transfers are not counted until mined.
    pub fn balance_of(&self, address: &str) -> f64 {
        committed_balance(&self.blocks, address) - self.mempool.pending_debit(address)
    }

    /// Committed balance of every address that appears in the chain.
    pub fn balances(&self) -> BTreeMap<String, f64> {
        let mut balances = BTreeMap::new();
        for tx in self.blocks.iter().flat_map(|b| b.transactions.iter()) {
            if !tx.is_system() {
                *balances.entry(tx.sender.clone()).or_insert(0.0) -= tx.total_debit();
            }
            *balances.entry(tx.recipient.clone()).or_insert(0.0) += tx.amount;
        }
        balances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;

    fn tx(sender: &str, recipient: &str, amount: f64, fee: Option<f64>) -> Transaction {
        Transaction {
            fee,
            signature: "sig".to_string(),
            ..Transaction::new(sender, recipient, amount)
        }
    }

    fn block_with(transactions: Vec<Transaction>) -> Block {
        Block {
            transactions,
            ..Block::genesis()
        }
    }

    #[test]
    fn test_replay_debits_and_credits() {
        let blocks = vec![
            Block::genesis(),
            block_with(vec![
                Transaction::reward("alice", 100.0),
                tx("alice", "bob", 30.0, None),
            ]),
            block_with(vec![tx("bob", "alice", 5.0, Some(1.0))]),
        ];

        assert_eq!(committed_balance(&blocks, "alice"), 75.0);
        assert_eq!(committed_balance(&blocks, "bob"), 24.0);
        assert_eq!(committed_balance(&blocks, "carol"), 0.0);
    }

    #[test]
    fn test_system_sender_is_not_debited() {
        let mut chain = Blockchain::new(LedgerConfig::default());
        chain.blocks.push(block_with(vec![
            Transaction::reward("alice", 50.0),
            Transaction::reward("bob", 25.0),
        ]));

        assert_eq!(chain.balance_of(crate::transaction::SYSTEM_SENDER), 0.0);
        assert_eq!(chain.balance_of("alice"), 50.0);
        assert!(!chain
            .balances()
            .contains_key(crate::transaction::SYSTEM_SENDER));
    }

    #[test]
    fn test_self_transfer_costs_only_fee() {
        let blocks = vec![block_with(vec![tx("alice", "alice", 10.0, Some(2.0))])];
        assert_eq!(committed_balance(&blocks, "alice"), -2.0);
    }

    #[test]
    fn test_pending_outgoing_is_debited_incoming_is_not() {
        let mut chain = Blockchain::new(LedgerConfig::default());
        chain
            .blocks
            .push(block_with(vec![Transaction::reward("alice", 50.0)]));

        chain.mempool.submit(tx("alice", "bob", 20.0, None)).unwrap();

        assert_eq!(chain.balance_of("alice"), 30.0);
        assert_eq!(chain.balance_of("bob"), 0.0);
    }

    #[test]
    fn test_balances_table() {
        let mut chain = Blockchain::new(LedgerConfig::default());
        chain.blocks.push(block_with(vec![
            Transaction::reward("alice", 50.0),
            tx("alice", "bob", 20.0, Some(1.0)),
        ]));

        let balances = chain.balances();
        assert_eq!(balances.get("alice"), Some(&29.0));
        assert_eq!(balances.get("bob"), Some(&20.0));
        assert!(!balances.contains_key(crate::transaction::SYSTEM_SENDER));
    }
}
