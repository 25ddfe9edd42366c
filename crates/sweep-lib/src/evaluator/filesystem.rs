//! Shared filesystem evaluator
//!
//! A filesystem is in use when any client-connections data point exists in
//! the lookback window; an empty series classifies as not in use. Cost is
//! the sum of the standard and infrequent-access tier sizes at their
//! per-GiB rates.

use super::{fetch_series_or_empty, Degraded, Evaluate};
use crate::error::EvaluationError;
use crate::metrics::{MetricQuery, MetricsPort, Statistic};
use crate::models::{CostEstimate, FindingFlags, ResourceAttributes, ResourceDescriptor, ResourceKind};
use crate::pricing::filesystem_monthly;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::OnceCell;

const LOOKBACK_DAYS: i64 = 14;
const SAMPLE_PERIOD_SECS: u32 = 60;

const METRIC_NAMESPACE: &str = "AWS/EFS";
const CLIENT_CONNECTIONS_METRIC: &str = "ClientConnections";

const CLASS_LABEL: &str = "file-system";

pub struct FileSystemEvaluator {
    descriptor: ResourceDescriptor,
    standard_bytes: u64,
    infrequent_access_bytes: u64,
    metrics: Arc<dyn MetricsPort>,
    verdict: OnceCell<bool>,
    degraded: Degraded,
}

impl FileSystemEvaluator {
    pub fn new(
        descriptor: ResourceDescriptor,
        metrics: Arc<dyn MetricsPort>,
    ) -> Result<Self, EvaluationError> {
        let ResourceAttributes::FileSystem {
            standard_bytes,
            infrequent_access_bytes,
        } = &descriptor.attributes
        else {
            return Err(EvaluationError::AttributeMismatch {
                id: descriptor.id.clone(),
                expected: ResourceKind::FileSystem,
            });
        };

        Ok(Self {
            standard_bytes: *standard_bytes,
            infrequent_access_bytes: *infrequent_access_bytes,
            descriptor,
            metrics,
            verdict: OnceCell::new(),
            degraded: Degraded::default(),
        })
    }

    async fn usage(&self) -> bool {
        *self
            .verdict
            .get_or_init(|| async {
                let end = Utc::now();
                let query = MetricQuery::resource(
                    METRIC_NAMESPACE,
                    CLIENT_CONNECTIONS_METRIC,
                    ("FileSystemId", &self.descriptor.id),
                    end - Duration::days(LOOKBACK_DAYS),
                    end,
                    SAMPLE_PERIOD_SECS,
                    Statistic::Maximum,
                );
                let series = fetch_series_or_empty(
                    self.metrics.as_ref(),
                    &query,
                    &self.degraded,
                    &self.descriptor.id,
                )
                .await;
                // Any reported data point means a client connected
                !series.is_empty()
            })
            .await
    }
}

#[async_trait]
impl Evaluate for FileSystemEvaluator {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    async fn is_in_use(&self) -> Result<bool, EvaluationError> {
        Ok(self.usage().await)
    }

    async fn evaluate_savings(&self) -> Result<CostEstimate, EvaluationError> {
        let monthly = filesystem_monthly(self.standard_bytes, self.infrequent_access_bytes);
        if self.usage().await {
            Ok(CostEstimate::parity(CLASS_LABEL, monthly))
        } else {
            Ok(CostEstimate::delete(CLASS_LABEL, monthly))
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

    const ONE_GIB: u64 = 1024 * 1024 * 1024;

    fn descriptor(standard_gib: u64, ia_gib: u64) -> ResourceDescriptor {
        ResourceDescriptor {
            id: "fs-0d1".to_string(),
            account: "111111111111".to_string(),
            region: "us-west-2".to_string(),
            attributes: ResourceAttributes::FileSystem {
                standard_bytes: standard_gib * ONE_GIB,
                infrequent_access_bytes: ia_gib * ONE_GIB,
            },
        }
    }

    #[tokio::test]
    async fn test_any_data_point_means_in_use() {
        // Even an all-zero connection sample counts as presence
        let metrics = Arc::new(
            StaticMetrics::new().with_series(CLIENT_CONNECTIONS_METRIC, &[0.0]),
        );
        let eval = FileSystemEvaluator::new(descriptor(10, 0), metrics).unwrap();
        assert!(eval.is_in_use().await.unwrap());
    }

    #[tokio::test]
    async fn test_no_data_points_means_unused() {
        let eval =
            FileSystemEvaluator::new(descriptor(10, 100), Arc::new(StaticMetrics::new())).unwrap();
        assert!(!eval.is_in_use().await.unwrap());

        let estimate = eval.evaluate_savings().await.unwrap();
        assert_eq!(estimate.recommended_class, CostEstimate::NONE);
        assert!((estimate.current_monthly_cost - (10.0 * 0.33 + 100.0 * 0.025)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_metrics_outage_degrades_and_flags() {
        let eval = FileSystemEvaluator::new(
            descriptor(10, 0),
            Arc::new(StaticMetrics::unavailable()),
        )
        .unwrap();
        assert!(!eval.is_in_use().await.unwrap());
        assert!(eval.flags().metrics_unavailable);
    }
}
