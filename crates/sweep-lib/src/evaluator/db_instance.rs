//! Relational DB instance evaluator
//!
//! Polarity: the natural rule is idleness. An instance is idle when the
//! maximum daily connection sum over the lookback window equals zero. The
//! maximum starts from a sentinel of -1, so an empty series (or a metrics
//! outage) never compares equal to zero and the instance stays not idle —
//! an instance without telemetry is never flagged for deletion.
//!
//! An idle instance is recommended for deletion; its single finding carries
//! compute plus storage monthly cost. Active instances are not right-sized:
//! the engine only flags idle ones.

use super::{fetch_series_or_empty, Degraded, Evaluate};
use crate::error::EvaluationError;
use crate::metrics::{MetricQuery, MetricsPort, Statistic};
use crate::models::{CostEstimate, FindingFlags, ResourceAttributes, ResourceDescriptor, ResourceKind};
use crate::pricing::compute::{serverless_monthly, SERVERLESS_CLASS};
use crate::pricing::storage::{DEFAULT_IOPS, DEFAULT_THROUGHPUT_MBS};
use crate::pricing::{storage_cost, ComputePricing, StorageClass};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

const CONNECTIONS_LOOKBACK_DAYS: i64 = 3;
const SERVERLESS_LOOKBACK_DAYS: i64 = 30;
const DAILY_PERIOD_SECS: u32 = 86_400;

const METRIC_NAMESPACE: &str = "AWS/RDS";
const CONNECTIONS_METRIC: &str = "DatabaseConnections";
const SERVERLESS_CAPACITY_METRIC: &str = "ServerlessDatabaseCapacity";

const AVAILABLE_STATUS: &str = "available";

/// No connection data observed; distinct from a measured zero
const NO_DATA_SENTINEL: f64 = -1.0;

impl std::fmt::Debug for DbInstanceEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbInstanceEvaluator")
            .field("descriptor", &self.descriptor)
            .field("instance_class", &self.instance_class)
            .field("engine", &self.engine)
            .field("storage_class", &self.storage_class)
            .field("storage_gib", &self.storage_gib)
            .field("iops", &self.iops)
            .field("throughput_mbs", &self.throughput_mbs)
            .field("max_connections", &self.max_connections)
            .field("degraded", &self.degraded)
            .finish_non_exhaustive()
    }
}

pub struct DbInstanceEvaluator {
    descriptor: ResourceDescriptor,
    instance_class: String,
    engine: String,
    storage_class: String,
    storage_gib: u64,
    iops: u32,
    throughput_mbs: u32,
    metrics: Arc<dyn MetricsPort>,
    pricing: Arc<ComputePricing>,
    max_connections: OnceCell<f64>,
    degraded: Degraded,
}

impl DbInstanceEvaluator {
    pub fn new(
        descriptor: ResourceDescriptor,
        metrics: Arc<dyn MetricsPort>,
        pricing: Arc<ComputePricing>,
    ) -> Result<Self, EvaluationError> {
        let ResourceAttributes::DbInstance {
            instance_class,
            engine,
            status,
            storage_class,
            storage_gib,
            provisioned_iops,
            provisioned_throughput_mbs,
            multi_az: _,
        } = &descriptor.attributes
        else {
            return Err(EvaluationError::AttributeMismatch {
                id: descriptor.id.clone(),
                expected: ResourceKind::DbInstance,
            });
        };

        if status != AVAILABLE_STATUS {
            return Err(EvaluationError::UnknownResourceState {
                id: descriptor.id.clone(),
                state: status.clone(),
            });
        }

        Ok(Self {
            instance_class: instance_class.clone(),
            engine: engine.clone(),
            storage_class: storage_class.clone(),
            storage_gib: *storage_gib,
            iops: provisioned_iops.unwrap_or(DEFAULT_IOPS),
            throughput_mbs: provisioned_throughput_mbs.unwrap_or(DEFAULT_THROUGHPUT_MBS),
            descriptor,
            metrics,
            pricing,
            max_connections: OnceCell::new(),
            degraded: Degraded::default(),
        })
    }

    /// Engine-managed cluster storage is billed separately, not per instance
    fn cluster_storage(&self) -> bool {
        self.engine.contains("aurora")
    }

    fn serverless(&self) -> bool {
        self.instance_class == SERVERLESS_CLASS
    }

    /// Maximum daily connection sum over the lookback window, or the
    /// sentinel when no data was observed
    async fn max_daily_connections(&self) -> f64 {
        *self
            .max_connections
            .get_or_init(|| async {
                let end = Utc::now();
                let query = MetricQuery::resource(
                    METRIC_NAMESPACE,
                    CONNECTIONS_METRIC,
                    ("DBInstanceIdentifier", &self.descriptor.id),
                    end - Duration::days(CONNECTIONS_LOOKBACK_DAYS),
                    end,
                    DAILY_PERIOD_SECS,
                    Statistic::Sum,
                );
                let series = fetch_series_or_empty(
                    self.metrics.as_ref(),
                    &query,
                    &self.degraded,
                    &self.descriptor.id,
                )
                .await;
                series
                    .values()
                    .fold(NO_DATA_SENTINEL, |max, daily| daily.max(max))
            })
            .await
    }

    /// Idle means a measured zero, not an absence of measurements
    pub async fn is_idle(&self) -> bool {
        self.max_daily_connections().await == 0.0
    }

    /// Monthly compute cost, or `None` when the pricing table has no entry
    async fn compute_monthly(&self) -> Option<f64> {
        if self.serverless() {
            let end = Utc::now();
            let query = MetricQuery::resource(
                METRIC_NAMESPACE,
                SERVERLESS_CAPACITY_METRIC,
                ("DBInstanceIdentifier", &self.descriptor.id),
                end - Duration::days(SERVERLESS_LOOKBACK_DAYS),
                end,
                DAILY_PERIOD_SECS,
                Statistic::Average,
            );
            let series = fetch_series_or_empty(
                self.metrics.as_ref(),
                &query,
                &self.degraded,
                &self.descriptor.id,
            )
            .await;
            // No capacity samples means zero measured capacity
            return Some(serverless_monthly(series.mean().unwrap_or(0.0)));
        }

        match self
            .pricing
            .monthly(&self.descriptor.region, &self.instance_class)
        {
            Ok(monthly) => Some(monthly),
            Err(e) => {
                debug!(db_instance = %self.descriptor.id, error = %e, "no compute pricing data");
                self.degraded.mark_pricing_missing();
                None
            }
        }
    }

    /// Monthly instance storage cost; cluster-managed storage contributes
    /// nothing here
    fn storage_monthly(&self) -> f64 {
        if self.cluster_storage() {
            return 0.0;
        }
        match StorageClass::parse(&self.storage_class) {
            Ok(class) => storage_cost(class, self.storage_gib, self.iops, self.throughput_mbs),
            Err(e) => {
                debug!(db_instance = %self.descriptor.id, error = %e, "unknown storage class");
                self.degraded.mark_pricing_missing();
                0.0
            }
        }
    }
}

#[async_trait]
impl Evaluate for DbInstanceEvaluator {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    async fn is_in_use(&self) -> Result<bool, EvaluationError> {
        Ok(!self.is_idle().await)
    }

    async fn evaluate_savings(&self) -> Result<CostEstimate, EvaluationError> {
        let storage = self.storage_monthly();
        let compute = self.compute_monthly().await;

        let Some(compute) = compute else {
            // No pricing data: report what is computable, recommend nothing
            return Ok(CostEstimate::parity(self.instance_class.clone(), storage));
        };

        let total = compute + storage;
        if self.is_idle().await {
            Ok(CostEstimate::delete(self.instance_class.clone(), total))
        } else {
            Ok(CostEstimate::parity(self.instance_class.clone(), total))
        }
    }

    fn flags(&self) -> FindingFlags {
        self.degraded.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::testing::StaticMetrics;

    fn descriptor(instance_class: &str, engine: &str, status: &str) -> ResourceDescriptor {
        ResourceDescriptor {
            id: "orders-db".to_string(),
            account: "111111111111".to_string(),
            region: "us-east-1".to_string(),
            attributes: ResourceAttributes::DbInstance {
                instance_class: instance_class.to_string(),
                engine: engine.to_string(),
                status: status.to_string(),
                storage_class: "gp3".to_string(),
                storage_gib: 200,
                provisioned_iops: Some(3000),
                provisioned_throughput_mbs: Some(125),
                multi_az: false,
            },
        }
    }

    fn pricing() -> Arc<ComputePricing> {
        Arc::new(ComputePricing::bundled())
    }

    #[tokio::test]
    async fn test_empty_series_is_never_idle() {
        // Sentinel asymmetry: no data must not read as a measured zero
        let eval = DbInstanceEvaluator::new(
            descriptor("db.m5.large", "postgres", "available"),
            Arc::new(StaticMetrics::new()),
            pricing(),
        )
        .unwrap();
        assert!(!eval.is_idle().await);
        assert!(eval.is_in_use().await.unwrap());
    }

    #[tokio::test]
    async fn test_metrics_outage_is_never_idle() {
        let eval = DbInstanceEvaluator::new(
            descriptor("db.m5.large", "postgres", "available"),
            Arc::new(StaticMetrics::unavailable()),
            pricing(),
        )
        .unwrap();
        assert!(!eval.is_idle().await);
        assert!(eval.flags().metrics_unavailable);
    }

    #[tokio::test]
    async fn test_measured_zero_connections_is_idle() {
        let metrics = Arc::new(
            StaticMetrics::new().with_series(CONNECTIONS_METRIC, &[0.0, 0.0, 0.0]),
        );
        let eval = DbInstanceEvaluator::new(
            descriptor("db.m5.large", "postgres", "available"),
            metrics,
            pricing(),
        )
        .unwrap();
        assert!(eval.is_idle().await);

        let estimate = eval.evaluate_savings().await.unwrap();
        assert_eq!(estimate.recommended_class, CostEstimate::NONE);
        // db.m5.large at 0.171/hr plus 200 GiB gp3 storage
        let expected = 0.171 * 720.0 + 200.0 * 0.088;
        assert!((estimate.current_monthly_cost - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_any_connections_is_not_idle() {
        let metrics = Arc::new(
            StaticMetrics::new().with_series(CONNECTIONS_METRIC, &[0.0, 17.0, 0.0]),
        );
        let eval = DbInstanceEvaluator::new(
            descriptor("db.m5.large", "postgres", "available"),
            metrics,
            pricing(),
        )
        .unwrap();
        assert!(!eval.is_idle().await);
    }

    #[tokio::test]
    async fn test_serverless_bills_from_capacity_average() {
        let metrics = Arc::new(
            StaticMetrics::new()
                .with_series(CONNECTIONS_METRIC, &[0.0, 0.0, 0.0])
                .with_series(SERVERLESS_CAPACITY_METRIC, &[2.0, 4.0]),
        );
        let eval = DbInstanceEvaluator::new(
            descriptor("db.serverless", "aurora-postgresql", "available"),
            metrics,
            pricing(),
        )
        .unwrap();
        assert!(eval.is_idle().await);

        let estimate = eval.evaluate_savings().await.unwrap();
        // mean 3 capacity units, cluster storage excluded
        assert!((estimate.current_monthly_cost - 3.0 * 0.14 * 720.0).abs() < 1e-9);
        assert_eq!(estimate.recommended_class, CostEstimate::NONE);
    }

    #[tokio::test]
    async fn test_cluster_engine_skips_instance_storage() {
        let metrics = Arc::new(
            StaticMetrics::new().with_series(CONNECTIONS_METRIC, &[0.0, 0.0, 0.0]),
        );
        let eval = DbInstanceEvaluator::new(
            descriptor("db.r5.large", "aurora-mysql", "available"),
            metrics,
            pricing(),
        )
        .unwrap();
        let estimate = eval.evaluate_savings().await.unwrap();
        assert!((estimate.current_monthly_cost - 0.25 * 720.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_pricing_reports_current_cost_only() {
        let metrics = Arc::new(
            StaticMetrics::new().with_series(CONNECTIONS_METRIC, &[0.0, 0.0, 0.0]),
        );
        let mut desc = descriptor("db.m5.large", "postgres", "available");
        desc.region = "sa-east-1".to_string();
        let eval = DbInstanceEvaluator::new(desc, metrics, pricing()).unwrap();

        let estimate = eval.evaluate_savings().await.unwrap();
        // Idle, but without pricing data no recommendation is made
        assert_eq!(estimate.current_class, estimate.recommended_class);
        assert_eq!(estimate.monthly_savings(), 0.0);
        assert!(eval.flags().pricing_missing);
    }

    #[test]
    fn test_non_available_status_is_rejected() {
        let err = DbInstanceEvaluator::new(
            descriptor("db.m5.large", "postgres", "stopped"),
            Arc::new(StaticMetrics::new()),
            pricing(),
        )
        .unwrap_err();
        assert!(matches!(err, EvaluationError::UnknownResourceState { .. }));
    }
}
