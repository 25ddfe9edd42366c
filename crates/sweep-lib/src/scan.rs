//! Scan coordination
//!
//! Iterates accounts, regions, and resource kinds, invoking the evaluator
//! for each inventoried resource and forwarding findings to the report
//! sink. Error isolation is the core contract: a failing resource is logged
//! and skipped, a failing kind cannot abort its sibling kinds, and a
//! failing region or account skips only that scope. The scan always
//! completes.
//!
//! Regions run on a bounded worker pool; findings flow through a channel
//! into a single collector, never through shared mutable appends.

use crate::error::EvaluationError;
use crate::evaluator::evaluator_for;
use crate::inventory::Inventory;
use crate::metrics::MetricsPort;
use crate::models::{Finding, ResourceKind};
use crate::pricing::ComputePricing;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex, Semaphore};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Configuration for a scan run
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Regions evaluated concurrently per scan
    pub max_concurrent_regions: usize,
    /// Deadline for each classification or savings computation
    pub evaluation_timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent_regions: 4,
            evaluation_timeout: Duration::from_secs(30),
        }
    }
}

/// Destination for findings
///
/// Append-only; duplicate emission across repeated scans is the sink's
/// concern, not the coordinator's.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn emit(&self, finding: &Finding) -> anyhow::Result<()>;
}

/// In-memory sink for tests and summaries
#[derive(Default)]
pub struct VecSink {
    findings: Mutex<Vec<Finding>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn collected(&self) -> Vec<Finding> {
        self.findings.lock().await.clone()
    }
}

#[async_trait]
impl ReportSink for VecSink {
    async fn emit(&self, finding: &Finding) -> anyhow::Result<()> {
        self.findings.lock().await.push(finding.clone());
        Ok(())
    }
}

/// Warn-level failures surfaced after a scan
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub accounts_scanned: usize,
    /// Account id plus reason, one entry per skipped account
    pub accounts_failed: Vec<String>,
    /// Account/region plus reason, one entry per skipped region
    pub regions_failed: Vec<String>,
    /// Region/kind plus reason, one entry per skipped kind
    pub kind_failures: Vec<String>,
    pub resources_evaluated: usize,
    pub findings_emitted: usize,
    pub total_monthly_savings: f64,
}

/// Everything a completed scan determined
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub findings: Vec<Finding>,
    pub summary: ScanSummary,
}

/// Outcome of one region's scan, folded into the summary
#[derive(Debug, Default)]
struct RegionOutcome {
    evaluated: usize,
    kind_failures: Vec<String>,
}

pub struct ScanCoordinator {
    inventory: Arc<dyn Inventory>,
    metrics: Arc<dyn MetricsPort>,
    pricing: Arc<ComputePricing>,
    config: ScanConfig,
}

impl ScanCoordinator {
    pub fn new(
        inventory: Arc<dyn Inventory>,
        metrics: Arc<dyn MetricsPort>,
        pricing: Arc<ComputePricing>,
        config: ScanConfig,
    ) -> Self {
        Self {
            inventory,
            metrics,
            pricing,
            config,
        }
    }

    /// Run a full scan over the given accounts
    ///
    /// `region_filter` restricts the scan to one region, skipping region
    /// enumeration. A shutdown signal stops new evaluations; in-flight
    /// evaluations complete and their findings are kept.
    pub async fn run(
        &self,
        accounts: &[String],
        region_filter: Option<&str>,
        sink: Arc<dyn ReportSink>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> ScanReport {
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancel_flag = cancelled.clone();
        let cancel_listener = tokio::spawn(async move {
            if shutdown.recv().await.is_ok() {
                info!("shutdown requested, stopping new evaluations");
                cancel_flag.store(true, Ordering::Relaxed);
            }
        });

        let (finding_tx, mut finding_rx) = mpsc::channel::<Finding>(256);
        let collector_sink = sink.clone();
        let collector = tokio::spawn(async move {
            let mut findings = Vec::new();
            while let Some(finding) = finding_rx.recv().await {
                if let Err(e) = collector_sink.emit(&finding).await {
                    warn!(resource_id = %finding.resource_id, error = %e, "sink emit failed");
                }
                findings.push(finding);
            }
            findings
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_regions.max(1)));
        let mut summary = ScanSummary::default();
        let mut region_tasks = Vec::new();

        for account in accounts {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }

            if let Err(e) = self.inventory.authenticate(account).await {
                warn!(account = %account, error = %e, "skipping account");
                summary.accounts_failed.push(format!("{account}: {e}"));
                continue;
            }

            let regions = match region_filter {
                Some(region) => vec![region.to_string()],
                None => match self.inventory.regions(account).await {
                    Ok(regions) => regions,
                    Err(e) => {
                        warn!(account = %account, error = %e, "region enumeration failed");
                        summary.accounts_failed.push(format!("{account}: {e}"));
                        continue;
                    }
                },
            };
            summary.accounts_scanned += 1;

            for region in regions {
                if cancelled.load(Ordering::Relaxed) {
                    break;
                }
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("scan semaphore never closes");

                let inventory = self.inventory.clone();
                let metrics = self.metrics.clone();
                let pricing = self.pricing.clone();
                let config = self.config.clone();
                let account = account.clone();
                let tx = finding_tx.clone();
                let cancelled = cancelled.clone();

                region_tasks.push((
                    account.clone(),
                    region.clone(),
                    tokio::spawn(async move {
                        let _permit = permit;
                        scan_region(
                            inventory, metrics, pricing, config, &account, &region, cancelled, tx,
                        )
                        .await
                    }),
                ));
            }
        }

        for (account, region, task) in region_tasks {
            match task.await {
                Ok(outcome) => {
                    summary.resources_evaluated += outcome.evaluated;
                    summary.kind_failures.extend(outcome.kind_failures);
                }
                Err(e) => {
                    warn!(account = %account, region = %region, error = %e, "region task failed");
                    summary
                        .regions_failed
                        .push(format!("{account}/{region}: {e}"));
                }
            }
        }

        drop(finding_tx);
        let findings = collector.await.unwrap_or_default();
        cancel_listener.abort();

        summary.findings_emitted = findings.len();
        summary.total_monthly_savings = findings
            .iter()
            .map(|f| f.estimate.monthly_savings())
            .sum();

        ScanReport { findings, summary }
    }
}

/// Scan every resource kind in one region
///
/// Each kind runs in its own failure scope: a listing or evaluation failure
/// is recorded and the remaining kinds still run.
#[allow(clippy::too_many_arguments)]
async fn scan_region(
    inventory: Arc<dyn Inventory>,
    metrics: Arc<dyn MetricsPort>,
    pricing: Arc<ComputePricing>,
    config: ScanConfig,
    account: &str,
    region: &str,
    cancelled: Arc<AtomicBool>,
    tx: mpsc::Sender<Finding>,
) -> RegionOutcome {
    info!(account = %account, region = %region, "scanning region");
    let mut outcome = RegionOutcome::default();

    for kind in ResourceKind::ALL {
        if cancelled.load(Ordering::Relaxed) {
            break;
        }

        let descriptors = match inventory.list(account, region, kind).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                warn!(account = %account, region = %region, kind = %kind, error = %e, "kind enumeration failed");
                outcome.kind_failures.push(format!("{region}/{kind}: {e}"));
                continue;
            }
        };

        for descriptor in descriptors {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let id = descriptor.id.clone();
            outcome.evaluated += 1;

            match evaluate_resource(
                descriptor,
                metrics.clone(),
                inventory.clone(),
                pricing.clone(),
                &config,
            )
            .await
            {
                Ok(Some(finding)) => {
                    if tx.send(finding).await.is_err() {
                        // Collector gone, nothing left to report into
                        return outcome;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(resource_id = %id, error = %e, "resource skipped");
                }
            }
        }
    }

    outcome
}

/// Evaluate one resource: specs, then metrics, then classification
///
/// Returns `Ok(None)` for in-use resources — findings are emitted only for
/// resources classified as not in active use.
async fn evaluate_resource(
    descriptor: crate::models::ResourceDescriptor,
    metrics: Arc<dyn MetricsPort>,
    inventory: Arc<dyn Inventory>,
    pricing: Arc<ComputePricing>,
    config: &ScanConfig,
) -> Result<Option<Finding>, EvaluationError> {
    let timeout_secs = config.evaluation_timeout.as_secs();
    let evaluator = evaluator_for(descriptor, metrics, inventory, pricing)?;
    let descriptor = evaluator.descriptor();
    let (account, region, kind, id) = (
        descriptor.account.clone(),
        descriptor.region.clone(),
        descriptor.kind(),
        descriptor.id.clone(),
    );

    let in_use = timeout(config.evaluation_timeout, evaluator.is_in_use())
        .await
        .map_err(|_| EvaluationError::Timeout {
            id: id.clone(),
            seconds: timeout_secs,
        })??;
    if in_use {
        debug!(resource_id = %id, kind = %kind, "in use, no finding");
        return Ok(None);
    }

    let estimate = timeout(config.evaluation_timeout, evaluator.evaluate_savings())
        .await
        .map_err(|_| EvaluationError::Timeout {
            id: id.clone(),
            seconds: timeout_secs,
        })??;

    info!(
        resource_id = %id,
        kind = %kind,
        current_monthly_cost = estimate.current_monthly_cost,
        recommended_class = %estimate.recommended_class,
        "finding emitted"
    );

    Ok(Some(Finding {
        account,
        region,
        kind,
        resource_id: id,
        estimate,
        flags: evaluator.flags(),
    }))
}
