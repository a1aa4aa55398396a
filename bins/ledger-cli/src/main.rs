//! ledger-cli — command-line front end for the UTXO settler.
//!
//! Generates sample epoch batches, checks candidates against a batch's
//! starting pool, settles batches under either selection policy and prints
//! the conflict graph.

mod config;
mod demo;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ledger_core::batch::EpochBatch;
use ledger_core::traits::Ed25519Verifier;
use ledger_core::validation::validate_candidate;
use ledger_core::SelectionPolicy;
use tracing::{error, info};

use crate::config::CliConfig;

/// Epoch batch settlement tool.
#[derive(Parser, Debug)]
#[command(
    name = "ledger-cli",
    version,
    about = "Validate and settle epoch batches of UTXO transactions"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Pretty-print JSON written to files
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a sample epoch batch.
    Demo(DemoArgs),
    /// Validate every candidate against the batch's starting pool.
    Check(BatchArgs),
    /// Settle a batch and report the outcome.
    Settle(SettleArgs),
    /// Print the conflict graph of a batch.
    Conflicts(BatchArgs),
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Output file for the batch JSON
    #[arg(short, long)]
    out: PathBuf,

    /// Seed for the sample keys and genesis outputs
    #[arg(long, default_value_t = 1)]
    seed: u8,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Epoch batch JSON file
    #[arg(short, long)]
    batch: PathBuf,
}

#[derive(Args, Debug)]
struct SettleArgs {
    /// Epoch batch JSON file
    #[arg(short, long)]
    batch: PathBuf,

    /// Selection policy (input-order or max-fee); falls back to $LEDGER_POLICY
    #[arg(long)]
    policy: Option<SelectionPolicy>,

    /// Write the post-batch pool to this file
    #[arg(long)]
    pool_out: Option<PathBuf>,
}

impl Cli {
    /// Split CLI args into the shared config and the subcommand.
    fn into_config(self) -> Result<(CliConfig, Commands)> {
        let flag = match &self.command {
            Commands::Settle(args) => args.policy,
            _ => None,
        };
        let config = CliConfig {
            policy: CliConfig::policy_from_env(flag)?,
            log_level: self.log_level,
            log_format: self.log_format,
            pretty: self.pretty,
        };
        Ok((config, self.command))
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let (config, command) = match cli.into_config() {
        Ok(parts) => parts,
        Err(e) => {
            error!("invalid configuration: {e:#}");
            process::exit(1);
        }
    };

    info!("ledger-cli v{}", env!("CARGO_PKG_VERSION"));

    let result = match command {
        Commands::Demo(args) => run_demo(&config, args),
        Commands::Check(args) => run_check(args),
        Commands::Settle(args) => run_settle(&config, args),
        Commands::Conflicts(args) => run_conflicts(args),
    };

    if let Err(e) = result {
        error!("{e:#}");
        process::exit(1);
    }
}

fn load_batch(path: &Path) -> Result<EpochBatch> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read batch file: {}", path.display()))?;
    let batch = EpochBatch::from_json(&json)
        .with_context(|| format!("failed to load batch file: {}", path.display()))?;
    info!(
        pool_size = batch.pool.len(),
        candidates = batch.candidates.len(),
        "loaded {}",
        path.display()
    );
    Ok(batch)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn run_demo(config: &CliConfig, args: DemoArgs) -> Result<()> {
    let batch = demo::sample_batch(args.seed).context("failed to sign sample batch")?;
    write_file(&args.out, &config.to_json(&batch)?)?;
    println!(
        "wrote {} candidates over {} pool outputs to {}",
        batch.candidates.len(),
        batch.pool.len(),
        args.out.display()
    );
    Ok(())
}

fn run_check(args: BatchArgs) -> Result<()> {
    let batch = load_batch(&args.batch)?;
    let mut valid = 0;

    for (position, candidate) in batch.candidates.iter().enumerate() {
        let txid = candidate
            .as_ref()
            .map(|tx| tx.id().to_string())
            .unwrap_or_else(|| "-".to_string());
        match validate_candidate(candidate.as_ref(), &batch.pool, &Ed25519Verifier) {
            Ok(v) => {
                valid += 1;
                println!(
                    "#{position} {txid} valid: in {} out {} fee {}",
                    v.total_input, v.total_output, v.fee
                );
            }
            Err(reason) => println!("#{position} {txid} invalid: {reason}"),
        }
    }

    println!("{valid}/{} candidates valid against the starting pool", batch.candidates.len());
    Ok(())
}

fn run_settle(config: &CliConfig, args: SettleArgs) -> Result<()> {
    let batch = load_batch(&args.batch)?;
    let (settlement, settler) = batch
        .settle(config.policy)
        .context("settlement aborted")?;

    println!("policy: {}", config.policy);
    println!("accepted ({}):", settlement.accepted.len());
    for a in &settlement.accepted {
        println!("  #{} {} fee {}", a.position, a.txid, a.fee);
    }
    println!("rejected ({}):", settlement.rejected.len());
    for r in &settlement.rejected {
        let txid = r.txid.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        println!("  #{} {} {}", r.position, txid, r.reason);
    }
    println!("total fees: {}", settlement.total_fees());
    println!("pool size: {} -> {}", batch.pool.len(), settler.pool().len());

    if let Some(path) = args.pool_out {
        write_file(&path, &config.to_json(settler.pool())?)?;
        println!("post-batch pool written to {}", path.display());
    }
    Ok(())
}

fn run_conflicts(args: BatchArgs) -> Result<()> {
    let batch = load_batch(&args.batch)?;
    let graph = batch.conflict_graph();

    println!("{} candidates, {} conflicts", graph.len(), graph.edge_count());
    for node in 0..graph.len() {
        let neighbours = graph.conflicts_with(node);
        if !neighbours.is_empty() {
            println!("  #{node} conflicts with {neighbours:?}");
        }
    }
    for (utxo, claimants) in graph.contested_utxos() {
        println!("  {utxo} claimed by {claimants:?}");
    }
    Ok(())
}

/// Initialize the tracing subscriber; `RUST_LOG` overrides `level_str`.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
            .init();
    }
}
