use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hashchain_core::{render::render_text, Chain, ChainConfig, HashAlgorithm, Transaction};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "hashchain")]
#[command(about = "Build, mine and validate a proof-of-work hash chain")]
struct Cli {
    #[command(flatten)]
    chain: ChainArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct ChainArgs {
    /// JSON chain config; flags below override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Leading zero hex digits required of mined hashes
    #[arg(long, global = true)]
    difficulty: Option<u32>,
    /// Digest algorithm (sha256, sha512_256, blake3)
    #[arg(long, global = true)]
    algorithm: Option<HashAlgorithm>,
    /// Give up mining a block after this many trials
    #[arg(long, global = true)]
    max_trials: Option<u64>,
    /// Search nonces on all cores
    #[arg(long, global = true)]
    parallel: bool,
}

impl ChainArgs {
    fn load(&self) -> Result<ChainConfig> {
        let mut config = match &self.config {
            Some(path) => ChainConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ChainConfig::default(),
        };
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if self.max_trials.is_some() {
            config.mining.max_trials = self.max_trials;
        }
        config.mining.parallel |= self.parallel;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine three blocks, then show that tampering is detected
    Demo,
    /// Mine one block per `--block` and print the chain
    Mine {
        /// Comma separated `sender:receiver:amount` transactions for one block
        #[arg(long = "block", value_parser = parse_batch)]
        blocks: Vec<Batch>,
        /// Print the chain as JSON instead of boxes
        #[arg(long)]
        json: bool,
    },
    /// Hash a string with the configured algorithm
    Hash {
        input: String,
    },
}

/// Transactions destined for one block.
#[derive(Clone, Debug)]
struct Batch(Vec<Transaction>);

fn parse_batch(s: &str) -> Result<Batch, String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<Transaction>().map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()
        .map(Batch)
}

fn demo(config: ChainConfig) -> Result<()> {
    let mut chain = Chain::new(config);
    let batches = [
        vec![
            Transaction::new("Alice", "Bob", 50),
            Transaction::new("Bob", "Charlie", 20),
        ],
        vec![
            Transaction::new("Charlie", "Dave", 30),
            Transaction::new("Dave", "Eve", 40),
        ],
        vec![
            Transaction::new("Eve", "Frank", 25),
            Transaction::new("Frank", "Alice", 10),
        ],
    ];
    for batch in batches {
        chain.append(batch).context("mining demo block")?;
    }

    println!("{}", render_text(chain.blocks()));
    println!("chain valid: {}", chain.validate());

    info!("rewriting the transactions of block 1");
    if let Some(block) = chain.tamper_block_mut(1) {
        block.tamper_transactions(vec![Transaction::new("Alice", "Mallory", 1000)]);
    }
    println!("after tampering, chain valid: {}", chain.validate());
    if let Some(violation) = chain.first_violation() {
        println!("  {violation}");
    }

    info!("recomputing hashes from block 1 to the tip");
    let mut previous = None;
    for i in 1..chain.len() {
        let Some(block) = chain.tamper_block_mut(i) else {
            break;
        };
        if let Some(hash) = previous.take() {
            block.tamper_previous_hash(hash);
        }
        previous = Some(block.tamper_rehash());
    }
    println!("after cascading the rewrite, chain valid: {}", chain.validate());
    Ok(())
}

fn mine(config: ChainConfig, blocks: Vec<Batch>, json: bool) -> Result<()> {
    let mut chain = Chain::new(config);
    for Batch(transactions) in blocks {
        let block = chain.append(transactions)?;
        info!("appended block {} ({})", block.index(), block.hash());
    }
    if json {
        println!("{}", serde_json::to_string_pretty(chain.blocks())?);
    } else {
        println!("{}", render_text(chain.blocks()));
    }
    println!("chain valid: {}", chain.validate());
    Ok(())
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = cli.chain.load()?;
    match cli.cmd {
        Command::Demo => demo(config)?,
        Command::Mine { blocks, json } => mine(config, blocks, json)?,
        Command::Hash { input } => {
            let digest = config.algorithm.digest(input.as_bytes());
            println!("{}: {digest}", config.algorithm);
            println!("leading zeros: {}", digest.leading_zero_nibbles());
        }
    }
    Ok(())
}
