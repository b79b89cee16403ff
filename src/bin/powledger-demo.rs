#![forbid(unsafe_code)]
//! Walks through the ledger: fund a wallet, transfer, mine with live progress,
//! then optionally replay a confirmed transfer or tamper with a block and validate.

use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use powledger::config::load_config;
use powledger::crypto::KeyPair;
use powledger::{Block, Ledger, Transaction};
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "powledger-demo", about = "Proof-of-work ledger walkthrough")]
struct Args {
    /// Path to a TOML config file; defaults are used when it does not exist
    #[arg(long, default_value = "ledger.toml")]
    config: String,

    /// Leading hex zeros required of each block hash (overrides config)
    #[arg(long)]
    difficulty: Option<u32>,

    /// Reward paid to the miner of each block (overrides config)
    #[arg(long)]
    reward: Option<f64>,

    /// Transfers to mine after the funding block, one block each
    #[arg(long, default_value_t = 1)]
    blocks: u32,

    /// Resubmit the last confirmed transfer and mine it again
    #[arg(long)]
    replay: bool,

    /// Corrupt the block at this index before the final validation
    #[arg(long)]
    tamper: Option<u64>,
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

fn short(hash: &str) -> String {
    if hash.len() > 20 {
        format!("{}...{}", &hash[..10], &hash[hash.len() - 8..])
    } else {
        hash.to_string()
    }
}

async fn mine_with_spinner(
    ledger: &Ledger,
    miner: &str,
) -> Result<Block, Box<dyn std::error::Error>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let started = Instant::now();
    let mut task = ledger.spawn_mining(miner).await;
    while let Some(event) = task.next_event().await {
        spinner.set_message(format!("nonce {:>10}  {}", event.nonce, short(&event.current_hash)));
    }
    let block = task.finish().await?;

    spinner.finish_with_message(format!(
        "{} block #{} nonce {} in {:.2}s  {}",
        "⛏️  mined".green().bold(),
        block.index,
        block.nonce,
        started.elapsed().as_secs_f64(),
        short(&block.hash).bright_black()
    ));
    Ok(block)
}

fn print_chain(blocks: &[Block]) {
    println!("\n{}", "┌──────────── CHAIN ────────────".cyan());
    for block in blocks {
        println!(
            "│ #{:<3} txs {:<2} diff {:<2} nonce {:<8} {} ← {}",
            block.index,
            block.transactions.len(),
            block.difficulty,
            block.nonce,
            short(&block.hash).yellow(),
            short(&block.previous_hash).bright_black()
        );
    }
    println!("{}", "└───────────────────────────────".cyan());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty;
    }
    if let Some(reward) = args.reward {
        config.reward = reward;
    }

    let ledger = Ledger::new(config)?;
    ledger.initialize().await;

    let alice = KeyPair::generate();
    let bob = KeyPair::generate();
    let alice_addr = alice.public_key_hex();
    let bob_addr = bob.public_key_hex();

    println!("{} {}", "Alice:".bold(), short(&alice_addr));
    println!("{} {}", "Bob:  ".bold(), short(&bob_addr));

    // Fund alice with a reward first.
    mine_with_spinner(&ledger, &alice_addr).await?;

    let mut last_transfer = None;
    for _ in 0..args.blocks {
        let tx = Transaction::new(alice_addr.clone(), bob_addr.clone(), 10.0).signed(&alice);
        ledger.submit(tx.clone()).await?;
        mine_with_spinner(&ledger, &alice_addr).await?;
        last_transfer = Some(tx);
    }

    if args.replay {
        if let Some(tx) = last_transfer {
            println!(
                "\n{} resubmitting confirmed transfer {}",
                "⚠️".yellow(),
                short(&tx.id)
            );
            ledger.submit(tx).await?;
            mine_with_spinner(&ledger, &bob_addr).await?;
        }
    }

    if let Some(index) = args.tamper {
        ledger.corrupt_block(index).await?;
        println!("\n{} block #{} tampered", "⚠️".red(), index);
    }

    print_chain(&ledger.blocks().await);

    println!("\n{}", "Balances".bold());
    println!("  Alice: {:.2}", ledger.balance_of(&alice_addr).await);
    println!("  Bob:   {:.2}", ledger.balance_of(&bob_addr).await);

    let report = ledger.validate().await;
    if report.valid {
        println!("\n{}", "✅ Chain is valid".green().bold());
    } else {
        println!(
            "\n{} at block #{} ({:?})",
            "❌ Chain is INVALID".red().bold(),
            report.first_invalid_index_or_sentinel(),
            report.reason
        );
    }

    Ok(())
}
