//! Resource evaluators
//!
//! One evaluator per resource kind, each encapsulating a usage-classification
//! rule driven by the metrics port and a recommendation rule driven by the
//! pricing model. Dispatch is by the descriptor's kind tag via
//! [`evaluator_for`].

mod db_instance;
mod db_snapshot;
mod filesystem;
mod floating_ip;
mod load_balancer;
mod nat_gateway;
mod table_store;
mod virtual_network;
mod volume;

pub use db_instance::DbInstanceEvaluator;
pub use db_snapshot::DbSnapshotEvaluator;
pub use filesystem::FileSystemEvaluator;
pub use floating_ip::FloatingIpEvaluator;
pub use load_balancer::LoadBalancerEvaluator;
pub use nat_gateway::NatGatewayEvaluator;
pub use table_store::TableStoreEvaluator;
pub use virtual_network::VirtualNetworkEvaluator;
pub use volume::VolumeEvaluator;

use crate::error::EvaluationError;
use crate::inventory::Inventory;
use crate::metrics::{MetricQuery, MetricSeries, MetricsPort};
use crate::models::{CostEstimate, FindingFlags, ResourceDescriptor, ResourceKind};
use crate::pricing::ComputePricing;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// The two-operation evaluator contract
///
/// `is_in_use` queries the metrics port over the kind's lookback window and
/// applies its threshold rule; it tolerates an empty series per the kind's
/// documented policy and never fails the resource for missing telemetry.
/// `evaluate_savings` computes the current monthly cost from the descriptor
/// attributes and the recommended class/cost from the usage verdict.
#[async_trait]
pub trait Evaluate: Send + Sync {
    fn descriptor(&self) -> &ResourceDescriptor;

    async fn is_in_use(&self) -> Result<bool, EvaluationError>;

    async fn evaluate_savings(&self) -> Result<CostEstimate, EvaluationError>;

    /// Degraded-confidence conditions hit so far during this evaluation
    fn flags(&self) -> FindingFlags;
}

/// Construct the evaluator for a descriptor's kind
pub fn evaluator_for(
    descriptor: ResourceDescriptor,
    metrics: Arc<dyn MetricsPort>,
    inventory: Arc<dyn Inventory>,
    pricing: Arc<ComputePricing>,
) -> Result<Box<dyn Evaluate>, EvaluationError> {
    let evaluator: Box<dyn Evaluate> = match descriptor.kind() {
        ResourceKind::Volume => Box::new(VolumeEvaluator::new(descriptor, metrics)?),
        ResourceKind::FloatingIp => Box::new(FloatingIpEvaluator::new(descriptor)?),
        ResourceKind::LoadBalancer => Box::new(LoadBalancerEvaluator::new(descriptor, metrics)?),
        ResourceKind::NatGateway => Box::new(NatGatewayEvaluator::new(descriptor, metrics)?),
        ResourceKind::FileSystem => Box::new(FileSystemEvaluator::new(descriptor, metrics)?),
        ResourceKind::DbInstance => {
            Box::new(DbInstanceEvaluator::new(descriptor, metrics, pricing)?)
        }
        ResourceKind::DbSnapshot => Box::new(DbSnapshotEvaluator::new(descriptor)?),
        ResourceKind::TableStoreTable => Box::new(TableStoreEvaluator::new(descriptor, metrics)?),
        ResourceKind::VirtualNetwork => {
            Box::new(VirtualNetworkEvaluator::new(descriptor, inventory)?)
        }
    };
    Ok(evaluator)
}

/// Shared degraded-confidence tracker
///
/// Atomics so evaluators can record conditions through `&self` from async
/// methods.
#[derive(Debug, Default)]
pub(crate) struct Degraded {
    metrics_unavailable: AtomicBool,
    pricing_missing: AtomicBool,
}

impl Degraded {
    pub(crate) fn mark_metrics_unavailable(&self) {
        self.metrics_unavailable.store(true, Ordering::Relaxed);
    }

    pub(crate) fn mark_pricing_missing(&self) {
        self.pricing_missing.store(true, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> FindingFlags {
        FindingFlags {
            metrics_unavailable: self.metrics_unavailable.load(Ordering::Relaxed),
            pricing_missing: self.pricing_missing.load(Ordering::Relaxed),
        }
    }
}

/// Fetch a series, degrading a port failure to the empty-series policy
pub(crate) async fn fetch_series_or_empty(
    metrics: &dyn MetricsPort,
    query: &MetricQuery,
    degraded: &Degraded,
    resource_id: &str,
) -> MetricSeries {
    match metrics.get_series(query).await {
        Ok(series) => series,
        Err(e) => {
            debug!(
                resource_id,
                metric = %query.metric,
                error = %e,
                "metrics unavailable, applying empty-series policy"
            );
            degraded.mark_metrics_unavailable();
            MetricSeries::empty()
        }
    }
}
