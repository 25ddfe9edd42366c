//! cloudsweep CLI
//!
//! Scans cloud inventory for idle and unused resources and reports a
//! before/after monthly cost estimate per finding. Inventory and telemetry
//! are read through port adapters; this binary ships a snapshot-file
//! adapter for offline scans of exported provider state.

mod config;
mod output;
mod sink;
mod snapshot;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sweep_lib::pricing::ComputePricing;
use sweep_lib::{Inventory, ReportSink, ScanCoordinator, VecSink};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Idle-resource scanner with cost-optimization recommendations
#[derive(Parser)]
#[command(name = "sweep")]
#[command(author, version, about = "Scan cloud accounts for idle resources", long_about = None)]
pub struct Cli {
    /// Inventory + metrics snapshot to scan (exported JSON, can also be set
    /// via SWEEP_SNAPSHOT)
    #[arg(long, env = "SWEEP_SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Scan every account in the snapshot (organization-wide)
    #[arg(long)]
    pub org: bool,

    /// Restrict the scan to these accounts (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub accounts: Vec<String>,

    /// Only scan resources in this region
    #[arg(long)]
    pub region: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Also write findings to this CSV file as they are emitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Compute pricing table override (JSON, region -> class -> hourly USD)
    #[arg(long)]
    pub pricing: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = config::SweepConfig::load()?;

    let pricing = match &cli.pricing {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read pricing table {}", path.display()))?;
            ComputePricing::from_json_str(&raw).context("invalid pricing table")?
        }
        None => ComputePricing::bundled(),
    };

    let store = Arc::new(
        snapshot::SnapshotStore::load(&cli.snapshot)
            .with_context(|| format!("failed to load snapshot {}", cli.snapshot.display()))?,
    );

    let accounts = resolve_accounts(&cli, store.as_ref()).await?;
    info!(accounts = accounts.len(), "starting scan");

    // Stop issuing new evaluations on Ctrl-C; in-flight ones finish
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let sink: Arc<dyn ReportSink> = match &cli.output {
        Some(path) => Arc::new(sink::CsvFileSink::create(path)?),
        None => Arc::new(VecSink::new()),
    };

    let coordinator = ScanCoordinator::new(
        store.clone(),
        store.clone(),
        Arc::new(pricing),
        settings.scan_config(),
    );
    let report = coordinator
        .run(&accounts, cli.region.as_deref(), sink, shutdown_rx)
        .await;

    output::print_report(&report, cli.format)?;
    if let Some(path) = &cli.output {
        output::print_success(&format!("findings written to {}", path.display()));
    }

    // Per-resource failures are logged, not fatal: a completed scan exits 0
    Ok(())
}

/// Which accounts to scan: explicit selection, the whole organization, or
/// the snapshot's first account
async fn resolve_accounts(cli: &Cli, store: &snapshot::SnapshotStore) -> Result<Vec<String>> {
    if !cli.accounts.is_empty() {
        return Ok(cli.accounts.clone());
    }
    let all = store.accounts().await?;
    if cli.org {
        return Ok(all);
    }
    Ok(all.into_iter().take(1).collect())
}
