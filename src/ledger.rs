//! The engine handle handed to collaborators.
//!
//! Chain and pool live together in one [`Blockchain`] behind a read/write lock. Every
//! mutation additionally takes the writer gate, which a mining operation holds from job
//! preparation to commit: submissions and config changes queue behind an in-flight
//! search while reads keep going against the last committed state.

use crate::blockchain::{Block, Blockchain, ValidationReport};
use crate::config::LedgerConfig;
use crate::error::{ChainError, Result, TxError};
use crate::miner::{self, CancelToken, MiningEvent, MiningJob};
use crate::transaction::Transaction;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct Ledger {
    chain: Arc<RwLock<Blockchain>>,
    writer: Arc<Mutex<()>>,
}

impl Ledger {
    /// Creates the engine with a freshly computed genesis block.
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Ledger {
            chain: Arc::new(RwLock::new(Blockchain::new(config))),
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Ensures the chain has its genesis block. Safe to call any number of times.
    pub async fn initialize(&self) {
        let _writer = self.writer.lock().await;
        self.chain.write().await.initialize();
    }

    /// Queues a transaction. Only field presence is checked; see [`Transaction::check_submission`].
    pub async fn submit(&self, tx: Transaction) -> std::result::Result<(), TxError> {
        let _writer = self.writer.lock().await;
        self.chain.write().await.mempool.submit(tx)
    }

    /// Mines the pool plus a reward for `miner_address` into a new block and commits it.
    ///
    /// Progress goes to `progress` when given; the `found` event is sent after the commit,
    /// once the writer gate is released. If `cancel` fires, or this future is dropped,
    /// before the block is found, nothing is committed and the pool keeps its transactions.
    pub async fn mine(
        &self,
        miner_address: &str,
        progress: Option<&mpsc::Sender<MiningEvent>>,
        cancel: &CancelToken,
    ) -> Result<Block> {
        let block = self.mine_and_commit(miner_address, progress, cancel).await?;
        miner::emit_found(progress, &block).await;
        Ok(block)
    }

    async fn mine_and_commit(
        &self,
        miner_address: &str,
        progress: Option<&mpsc::Sender<MiningEvent>>,
        cancel: &CancelToken,
    ) -> Result<Block> {
        let _writer = self.writer.lock().await;

        let (job, progress_interval) = {
            let chain = self.chain.read().await;
            (
                MiningJob::prepare(&chain, miner_address)?,
                chain.config.progress_interval,
            )
        };
        tracing::info!(
            index = job.index,
            difficulty = job.difficulty,
            miner = miner_address,
            "mining block"
        );

        let block = miner::search_block(job, progress_interval, progress, cancel).await?;
        self.chain.write().await.commit_block(block.clone())?;
        Ok(block)
    }

    /// Runs [`Ledger::mine`] on its own task, with a bounded progress channel sized from config.
    pub async fn spawn_mining(&self, miner_address: impl Into<String>) -> MiningTask {
        let capacity = self.chain.read().await.config.progress_channel_capacity;
        let (sender, events) = mpsc::channel(capacity);
        let cancel = CancelToken::new();

        let ledger = self.clone();
        let miner_address = miner_address.into();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            ledger
                .mine(&miner_address, Some(&sender), &task_cancel)
                .await
        });

        MiningTask {
            events,
            cancel,
            handle,
        }
    }

    pub async fn validate(&self) -> ValidationReport {
        self.chain.read().await.validate()
    }

    pub async fn balance_of(&self, address: &str) -> f64 {
        self.chain.read().await.balance_of(address)
    }

    pub async fn balances(&self) -> BTreeMap<String, f64> {
        self.chain.read().await.balances()
    }

    pub async fn blocks(&self) -> Vec<Block> {
        self.chain.read().await.blocks.clone()
    }

    pub async fn latest_block(&self) -> Option<Block> {
        self.chain.read().await.latest_block().cloned()
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.chain.read().await.mempool.transactions().to_vec()
    }

    pub async fn config(&self) -> LedgerConfig {
        self.chain.read().await.config.clone()
    }

    /// Difficulty for blocks mined from now on. Committed blocks keep their own.
    pub async fn set_difficulty(&self, difficulty: u32) -> Result<()> {
        self.update_config(|config| config.difficulty = difficulty)
            .await
    }

    /// Reward for blocks mined from now on.
    pub async fn set_reward(&self, reward: f64) -> Result<()> {
        self.update_config(|config| config.reward = reward).await
    }

    async fn update_config(&self, apply: impl FnOnce(&mut LedgerConfig)) -> Result<()> {
        let _writer = self.writer.lock().await;
        let mut chain = self.chain.write().await;

        let mut config = chain.config.clone();
        apply(&mut config);
        config.validate()?;

        tracing::info!(
            difficulty = config.difficulty,
            reward = config.reward,
            "ledger config updated"
        );
        chain.config = config;
        Ok(())
    }

    /// Test/demo hook, see [`Blockchain::corrupt_block`]. Not part of any transaction path.
    pub async fn corrupt_block(&self, index: u64) -> Result<()> {
        let _writer = self.writer.lock().await;
        self.chain.write().await.corrupt_block(index)
    }
}

/// A mining operation running on its own task.
///
/// Dropping this handle does not stop the search; call [`MiningTask::cancel`] for that.
pub struct MiningTask {
    events: mpsc::Receiver<MiningEvent>,
    cancel: CancelToken,
    handle: JoinHandle<Result<Block>>,
}

impl MiningTask {
    /// Next progress event, or `None` once the search has ended.
    pub async fn next_event(&mut self) -> Option<MiningEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Waits for the committed block, discarding any unread progress events.
    pub async fn finish(self) -> Result<Block> {
        drop(self.events);
        self.handle
            .await
            .map_err(|e| ChainError::MiningTaskFailed(e.to_string()))?
    }
}
