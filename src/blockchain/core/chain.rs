use crate::config::LedgerConfig;
use crate::crypto::sha256_hex;
use crate::error::ChainError;
use crate::mempool::TransactionPool;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Amount written into a block by [`Blockchain::corrupt_block`].
pub const CORRUPTED_AMOUNT: f64 = 999_999.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Milliseconds since the Unix epoch, captured once when the block is assembled.
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
    /// Leading hex zeros required of `hash`, frozen at mining time.
    pub difficulty: u32,
}

impl Block {
    /// The genesis block: no transactions, nonce 0, difficulty 0.
    pub fn genesis() -> Self {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let hash = Block::calculate_hash(0, GENESIS_PREVIOUS_HASH, timestamp, &[], 0);
        Block {
            index: 0,
            timestamp,
            transactions: Vec::new(),
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            hash,
            nonce: 0,
            difficulty: 0,
        }
    }

    /// Everything the block hash covers except the nonce:
    /// index ∥ previous_hash ∥ timestamp ∥ JSON(transactions).
    ///
    /// Split out so the miner can build it once per search instead of once per attempt.
    pub fn hash_preimage_prefix(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        transactions: &[Transaction],
    ) -> Vec<u8> {
        let mut preimage = format!("{}{}{}", index, previous_hash, timestamp).into_bytes();
        // Writing plain structs into a Vec has no failure path; NaN amounts serialize as null.
        if let Err(e) = serde_json::to_writer(&mut preimage, transactions) {
            tracing::error!("failed to serialize transactions for hashing: {}", e);
        }
        preimage
    }

    /// Completes a prefix from [`Block::hash_preimage_prefix`] with `nonce` and digests it.
    pub fn hash_with_prefix(prefix: &[u8], nonce: u64) -> String {
        let mut preimage = Vec::with_capacity(prefix.len() + 20);
        preimage.extend_from_slice(prefix);
        preimage.extend_from_slice(nonce.to_string().as_bytes());
        sha256_hex(&preimage)
    }

    pub fn calculate_hash(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        transactions: &[Transaction],
        nonce: u64,
    ) -> String {
        let prefix = Block::hash_preimage_prefix(index, previous_hash, timestamp, transactions);
        Block::hash_with_prefix(&prefix, nonce)
    }

    /// Recomputes the hash from the block's current contents.
    pub fn recompute_hash(&self) -> String {
        Block::calculate_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
            self.nonce,
        )
    }

    /// True when the first `difficulty` characters of `hash` are all `'0'`.
    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        let difficulty = difficulty as usize;
        hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
    }
}

/// The chain and its pending pool, kept together so they always change as one unit.
#[derive(Debug, Clone)]
pub struct Blockchain {
    pub blocks: Vec<Block>,
    pub mempool: TransactionPool,
    pub config: LedgerConfig,
}

impl Blockchain {
    /// Creates a chain holding only a freshly computed genesis block.
    pub fn new(config: LedgerConfig) -> Self {
        let mut blockchain = Blockchain {
            blocks: Vec::new(),
            mempool: TransactionPool::new(),
            config,
        };
        blockchain.initialize();
        blockchain
    }

    /// Ensures the chain starts with a genesis block. Does nothing if it already does.
    pub fn initialize(&mut self) {
        if self.blocks.is_empty() {
            let genesis = Block::genesis();
            tracing::info!(hash = %genesis.hash, "genesis block created");
            self.blocks.push(genesis);
        }
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn height(&self) -> u64 {
        self.latest_block().map_or(0, |b| b.index)
    }

    /// The sanctioned append path.
    ///
    /// Rejects blocks that do not extend the current tip, whose stored hash does not
    /// match their contents, or whose hash misses their own difficulty.
    pub fn apply_block(&mut self, block: Block) -> Result<(), ChainError> {
        let last_block = self.latest_block().ok_or_else(|| {
            ChainError::InvalidBlock("Cannot apply block; the chain is empty.".to_string())
        })?;

        if block.index != last_block.index + 1 {
            return Err(ChainError::InvalidBlock(format!(
                "Invalid block index. Expected {}, but got {}.",
                last_block.index + 1,
                block.index
            )));
        }

        if block.previous_hash != last_block.hash {
            return Err(ChainError::InvalidBlock(format!(
                "Invalid previous block hash. Expected {}, but got {}.",
                last_block.hash, block.previous_hash
            )));
        }

        let expected_hash = block.recompute_hash();
        if expected_hash != block.hash {
            return Err(ChainError::InvalidBlock(format!(
                "Hash mismatch. Expected {}, but got {}.",
                expected_hash, block.hash
            )));
        }

        if !Block::meets_difficulty(&block.hash, block.difficulty) {
            return Err(ChainError::InvalidBlock(format!(
                "Invalid Proof-of-Work: hash {} does not have {} leading zeros.",
                block.hash, block.difficulty
            )));
        }

        self.blocks.push(block);
        Ok(())
    }

    /// Appends a mined block and empties the pool in the same step.
    pub fn commit_block(&mut self, block: Block) -> Result<(), ChainError> {
        let index = block.index;
        let tx_count = block.transactions.len();
        let nonce = block.nonce;

        self.apply_block(block)?;
        let cleared = self.mempool.take();

        tracing::info!(
            index,
            nonce,
            transactions = tx_count,
            cleared = cleared.len(),
            "block committed"
        );
        Ok(())
    }

    /// Test/demo hook: tampers with a committed block without re-mining it.
    ///
    /// Overwrites the first transaction's amount, or injects an unsigned transaction if
    /// the block has none. The stored hash is left as is, so the block no longer matches it.
    pub fn corrupt_block(&mut self, index: u64) -> Result<(), ChainError> {
        let block = usize::try_from(index)
            .ok()
            .and_then(|i| self.blocks.get_mut(i))
            .ok_or(ChainError::BlockNotFound(index))?;

        match block.transactions.first_mut() {
            Some(tx) => tx.amount = CORRUPTED_AMOUNT,
            None => block.transactions.push(Transaction {
                signature: String::new(),
                ..Transaction::new("ATTACKER", "ATTACKER", CORRUPTED_AMOUNT)
            }),
        }

        tracing::warn!(index, "block corrupted without re-mining");
        Ok(())
    }
}
