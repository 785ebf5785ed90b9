//! Offload CLI.
//!
//! # Commands
//! ```text
//! offload serve    [--host <ip>] [--port <n>] [--database <file>]
//! offload compare  [--mode sequential|concurrent] [--total 30] [--batch-size 5] [--delay-ms 500]
//! offload batch    [--total 30] [--batch-size 5] [--delay-ms 300]
//! offload info
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use offload_core::{
    BatchExecutor, BatchResult, CancellationToken, Mode, SimulatedCall, TimingHarness, TimingReport,
};

mod cmd_serve;
mod config;
mod tracing_setup;

use config::AppConfig;
use tracing_setup::init_tracing;

#[derive(Parser)]
#[command(
    name = "offload",
    about = "Run blocking calls and batched remote calls without stalling the scheduler",
    version
)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the demo request handlers over HTTP
    Serve {
        #[arg(long)]
        host: Option<IpAddr>,
        #[arg(long)]
        port: Option<u16>,
        /// SQLite database file (default: in-memory store)
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Time two batches run sequentially and/or concurrently
    Compare {
        /// Only run this mode (default: both)
        #[arg(long)]
        mode: Option<Mode>,
        /// Calls per batch (default: batch.total)
        #[arg(long)]
        total: Option<usize>,
        /// Calls per chunk (default: batch.chunk_size)
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one batch of simulated remote calls
    Batch {
        #[arg(long)]
        total: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long, default_value_t = 300)]
        delay_ms: u64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print version and effective configuration
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Commands::Serve { host, port, database } = &cli.command {
        if let Some(host) = host {
            config.web.host = *host;
        }
        if let Some(port) = port {
            config.web.port = *port;
        }
        if database.is_some() {
            config.web.database = database.clone();
        }
    }
    if cli.verbose {
        config.log.level = "debug".into();
    }
    config.validate()?;

    init_tracing(&config.log);

    // One scheduler thread; blocking work goes to a pool capped at max_workers.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .max_blocking_threads(config.bridge.max_workers)
        .thread_name("offload-worker")
        .build()
        .context("build tokio runtime")?;

    runtime.block_on(run(cli.command, config))
}

async fn run(command: Commands, config: AppConfig) -> Result<()> {
    match command {
        Commands::Serve { .. } => cmd_serve::run(config).await,

        Commands::Compare { mode, total, batch_size, delay_ms, json } => {
            let total = total.unwrap_or(config.batch.total);
            let batch_size = batch_size.unwrap_or(config.batch.chunk_size);
            cmd_compare(&config, mode, total, batch_size, delay_ms, json).await
        }

        Commands::Batch { total, batch_size, delay_ms, json } => {
            let total = total.unwrap_or(config.batch.total);
            let batch_size = batch_size.unwrap_or(config.batch.chunk_size);
            cmd_batch(&config, total, batch_size, delay_ms, json).await
        }

        Commands::Info => cmd_info(&config),
    }
}

// ─── Command implementations ─────────────────────────────────────────────────

async fn cmd_compare(
    config: &AppConfig,
    mode: Option<Mode>,
    total: usize,
    batch_size: usize,
    delay_ms: u64,
    as_json: bool,
) -> Result<()> {
    let harness = TimingHarness::new(BatchExecutor::new(&config.batch));
    let delay = Duration::from_millis(delay_ms);
    let modes = match mode {
        Some(mode) => vec![mode],
        None => vec![Mode::Sequential, Mode::Concurrent],
    };

    let mut reports: Vec<TimingReport> = Vec::with_capacity(modes.len());
    for mode in modes {
        reports.push(harness.compare(mode, total, batch_size, delay).await?);
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for r in &reports {
        println!(
            "Ran {} batches of {} calls {} in {:.3}s ({} per chunk, {:.3}s per call)",
            r.batches, r.total, r.label, r.elapsed_secs, r.chunk_size, r.per_unit_delay_secs
        );
    }
    if let [seq, conc] = reports.as_slice() {
        if conc.elapsed_secs > 0.0 {
            println!("Speedup: {:.2}x", seq.elapsed_secs / conc.elapsed_secs);
        }
    }
    Ok(())
}

async fn cmd_batch(
    config: &AppConfig,
    total: usize,
    batch_size: usize,
    delay_ms: u64,
    as_json: bool,
) -> Result<()> {
    let executor = BatchExecutor::new(&config.batch);
    let call = Arc::new(SimulatedCall::new(Duration::from_millis(delay_ms)));

    let token = CancellationToken::new();
    let on_ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };
    let outcome = executor.run_with_cancel(total, batch_size, call, &token).await;
    on_ctrl_c.abort();
    let batch: BatchResult<_> = outcome?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&batch.results)?);
        return Ok(());
    }

    println!(
        "{} calls in {} chunks of {} took {:.3}s",
        batch.len(),
        batch.chunks,
        batch_size,
        batch.elapsed.as_secs_f64()
    );
    for r in batch.iter() {
        println!("  #{:<3} {:.6}", r.index, r.result);
    }
    Ok(())
}

fn cmd_info(config: &AppConfig) -> Result<()> {
    println!("offload v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
