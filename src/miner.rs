//! Proof-of-work mining.
//!
//! A [`MiningJob`] freezes everything the block hash covers except the nonce, then scans
//! nonces upward from zero until the hash has `difficulty` leading hex zeros. The async
//! [`mine`] driver runs the scan in batches of `progress_interval` attempts, reporting a
//! [`MiningEvent`] and yielding to the runtime between batches so a long search never
//! starves other tasks.

use crate::blockchain::{Block, Blockchain};
use crate::error::ChainError;
use crate::transaction::Transaction;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Snapshot of an in-flight search. `found` is only true on the last event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MiningEvent {
    pub nonce: u64,
    pub current_hash: String,
    pub found: bool,
}

/// Cooperative cancellation flag checked at every mining checkpoint.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        CancelToken {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`CancelToken::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only returns once cancelled.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

/// Result of one batch of attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStep {
    /// `nonce` satisfies the difficulty.
    Found { nonce: u64, hash: String },
    /// The batch ran out; `nonce` is the last one tried.
    Pending { nonce: u64, hash: String },
}

/// Fixed inputs of one proof-of-work search plus the next nonce to try.
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub difficulty: u32,
    prefix: Vec<u8>,
    next_nonce: u64,
}

impl MiningJob {
    pub fn new(
        index: u64,
        previous_hash: String,
        timestamp: i64,
        transactions: Vec<Transaction>,
        difficulty: u32,
    ) -> Self {
        let prefix = Block::hash_preimage_prefix(index, &previous_hash, timestamp, &transactions);
        MiningJob {
            index,
            previous_hash,
            timestamp,
            transactions,
            difficulty,
            prefix,
            next_nonce: 0,
        }
    }

    /// Builds the next block's job: pool contents in order, then a reward for `miner_address`.
    ///
    /// Difficulty and reward are read from the chain's config at this moment.
    pub fn prepare(chain: &Blockchain, miner_address: &str) -> Result<Self, ChainError> {
        let last_block = chain.latest_block().ok_or_else(|| {
            ChainError::InvalidBlock("Cannot mine on an empty chain.".to_string())
        })?;

        let mut transactions = chain.mempool.transactions().to_vec();
        transactions.push(Transaction::reward(miner_address, chain.config.reward));

        Ok(MiningJob::new(
            last_block.index + 1,
            last_block.hash.clone(),
            chrono::Utc::now().timestamp_millis(),
            transactions,
            chain.config.difficulty,
        ))
    }

    /// Restarts the search for an already assembled block, ignoring its nonce and hash.
    pub fn from_block(block: Block) -> Self {
        MiningJob::new(
            block.index,
            block.previous_hash,
            block.timestamp,
            block.transactions,
            block.difficulty,
        )
    }

    pub fn next_nonce(&self) -> u64 {
        self.next_nonce
    }

    /// Tries up to `attempts` consecutive nonces (at least one).
    pub fn search(&mut self, attempts: u64) -> SearchStep {
        let mut last = (self.next_nonce, String::new());
        for _ in 0..attempts.max(1) {
            let nonce = self.next_nonce;
            let hash = Block::hash_with_prefix(&self.prefix, nonce);
            if Block::meets_difficulty(&hash, self.difficulty) {
                return SearchStep::Found { nonce, hash };
            }
            self.next_nonce += 1;
            last = (nonce, hash);
        }
        SearchStep::Pending {
            nonce: last.0,
            hash: last.1,
        }
    }

    pub fn into_block(self, nonce: u64, hash: String) -> Block {
        Block {
            index: self.index,
            timestamp: self.timestamp,
            transactions: self.transactions,
            previous_hash: self.previous_hash,
            hash,
            nonce,
            difficulty: self.difficulty,
        }
    }
}

/// Mines `block` to its own difficulty without yielding. Meant for blocks built by hand.
pub fn mine_block(block: Block) -> Block {
    let mut job = MiningJob::from_block(block);
    loop {
        if let SearchStep::Found { nonce, hash } = job.search(u64::MAX) {
            return job.into_block(nonce, hash);
        }
    }
}

/// Offers a checkpoint without waiting. A full or closed channel drops it.
fn emit_checkpoint(progress: Option<&mpsc::Sender<MiningEvent>>, event: MiningEvent) {
    if let Some(sender) = progress {
        if let Err(mpsc::error::TrySendError::Full(event)) = sender.try_send(event) {
            tracing::debug!(nonce = event.nonce, "progress channel full, checkpoint dropped");
        }
    }
}

/// Delivers the `found = true` event. A dropped receiver only means nobody is watching.
pub async fn emit_found(progress: Option<&mpsc::Sender<MiningEvent>>, block: &Block) {
    if let Some(sender) = progress {
        let event = MiningEvent {
            nonce: block.nonce,
            current_hash: block.hash.clone(),
            found: true,
        };
        let _ = sender.send(event).await;
    }
}

/// Runs `job` until a nonce is found, reporting only `found = false` checkpoints.
///
/// Every `progress_interval` attempts a checkpoint is offered to `progress` and the task
/// yields. Checkpoints never wait on the channel, so a reader that falls behind misses
/// some of them. Cancellation is honoured at each checkpoint.
pub async fn search_block(
    mut job: MiningJob,
    progress_interval: u64,
    progress: Option<&mpsc::Sender<MiningEvent>>,
    cancel: &CancelToken,
) -> Result<Block, ChainError> {
    tracing::debug!(
        index = job.index,
        difficulty = job.difficulty,
        transactions = job.transactions.len(),
        "proof-of-work search started"
    );

    loop {
        if cancel.is_cancelled() {
            tracing::info!(index = job.index, nonce = job.next_nonce, "mining cancelled");
            return Err(ChainError::MiningCancelled);
        }

        match job.search(progress_interval) {
            SearchStep::Found { nonce, hash } => return Ok(job.into_block(nonce, hash)),
            SearchStep::Pending { nonce, hash } => {
                tracing::debug!(nonce, hash = %hash, "mining checkpoint");
                let event = MiningEvent {
                    nonce,
                    current_hash: hash,
                    found: false,
                };
                emit_checkpoint(progress, event);
                tokio::task::yield_now().await;
            }
        }
    }
}

/// Runs `job` to completion, cooperatively.
///
/// Same as [`search_block`], followed by one `found = true` event for the winning nonce.
pub async fn mine(
    job: MiningJob,
    progress_interval: u64,
    progress: Option<&mpsc::Sender<MiningEvent>>,
    cancel: &CancelToken,
) -> Result<Block, ChainError> {
    let block = search_block(job, progress_interval, progress, cancel).await?;
    emit_found(progress, &block).await;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_job(difficulty: u32) -> MiningJob {
        MiningJob::new(
            1,
            "abc123".to_string(),
            1_700_000_000_000,
            vec![Transaction {
                id: "reward-1".to_string(),
                timestamp: 1_700_000_000_000,
                ..Transaction::reward("miner", 50.0)
            }],
            difficulty,
        )
    }

    #[test]
    fn test_mined_block_meets_difficulty_and_round_trips() {
        for difficulty in 0..=3 {
            let job = fixed_job(difficulty);
            let block = mine_block(job.clone().into_block(0, String::new()));

            assert!(Block::meets_difficulty(&block.hash, difficulty));
            assert_eq!(block.hash, block.recompute_hash());
            assert_eq!(block.difficulty, difficulty);
        }
    }

    #[test]
    fn test_search_is_sequential_from_zero() {
        let mut job = fixed_job(2);
        let winner = mine_block(job.clone().into_block(0, String::new())).nonce;

        // No nonce below the winner satisfies the difficulty.
        for nonce in 0..winner {
            let hash =
                Block::calculate_hash(1, "abc123", 1_700_000_000_000, &job.transactions, nonce);
            assert!(!Block::meets_difficulty(&hash, 2));
        }

        match job.search(winner + 1) {
            SearchStep::Found { nonce, .. } => assert_eq!(nonce, winner),
            other => panic!("expected a hit, got {:?}", other),
        }
    }

    #[test]
    fn test_search_resumes_after_pending_batch() {
        let mut job = fixed_job(64);
        match job.search(10) {
            SearchStep::Pending { nonce, hash } => {
                assert_eq!(nonce, 9);
                assert_eq!(
                    hash,
                    Block::calculate_hash(1, "abc123", 1_700_000_000_000, &job.transactions, 9)
                );
            }
            other => panic!("expected pending, got {:?}", other),
        }
        assert_eq!(job.next_nonce(), 10);
    }

    #[test]
    fn test_zero_difficulty_accepts_nonce_zero() {
        let block = mine_block(fixed_job(0).into_block(0, String::new()));
        assert_eq!(block.nonce, 0);
    }

    #[tokio::test]
    async fn test_progress_events_at_fixed_interval() {
        let interval = 200;
        let expected = mine_block(fixed_job(3).into_block(0, String::new()));

        // Room for every checkpoint, so none is dropped.
        let capacity = (expected.nonce / interval) as usize + 1;
        let (tx, mut rx) = mpsc::channel(capacity);
        let cancel = CancelToken::new();
        let handle = tokio::spawn(async move {
            mine(fixed_job(3), interval, Some(&tx), &cancel).await
        });

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        let block = handle.await.unwrap().unwrap();

        assert_eq!(block, expected);

        let (last, pending) = events.split_last().unwrap();
        assert!(last.found);
        assert_eq!(last.nonce, block.nonce);
        assert_eq!(last.current_hash, block.hash);

        assert_eq!(pending.len() as u64, block.nonce / interval);
        for (i, event) in pending.iter().enumerate() {
            assert!(!event.found);
            assert_eq!(event.nonce, (i as u64 + 1) * interval - 1);
        }
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(cancel.is_cancelled());

        let result = mine(fixed_job(1), 500, None, &cancel).await;
        assert_eq!(result, Err(ChainError::MiningCancelled));
    }

    #[tokio::test]
    async fn test_cancel_mid_search() {
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancelToken::new();
        let search_cancel = cancel.clone();
        // Difficulty 64 is never met in practice.
        let handle = tokio::spawn(async move {
            mine(fixed_job(64), 200, Some(&tx), &search_cancel).await
        });

        for _ in 0..3 {
            let event = rx.recv().await.unwrap();
            assert!(!event.found);
        }
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), Err(ChainError::MiningCancelled));
    }

    #[tokio::test]
    async fn test_full_channel_does_not_block_search() {
        let (tx, mut rx) = mpsc::channel(1);

        // Nobody reads until the search is over.
        let block = search_block(fixed_job(3), 200, Some(&tx), &CancelToken::new())
            .await
            .unwrap();
        assert!(Block::meets_difficulty(&block.hash, 3));

        drop(tx);
        let mut received = 0;
        while let Some(event) = rx.recv().await {
            assert!(!event.found);
            received += 1;
        }
        assert!(received <= 1);
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_stop_search() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let block = mine(fixed_job(2), 200, Some(&tx), &CancelToken::new())
            .await
            .unwrap();
        assert!(Block::meets_difficulty(&block.hash, 2));
    }
}
