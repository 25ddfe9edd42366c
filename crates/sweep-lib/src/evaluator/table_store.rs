//! Table-store table evaluator
//!
//! Polarity: the natural rule is unused. A table is unused when both its
//! average consumed read and write capacity over the lookback window fall
//! below one unit per hour; an empty series averages to zero, so a table
//! with no telemetry classifies as unused.
//!
//! Savings: an unused table is recommended for deletion at its current
//! billing mode's cost. An in-use provisioned table evaluates to an
//! on-demand retier from its observed consumption (never forwarded by the
//! coordinator, which reports unused resources only).

use super::{fetch_series_or_empty, Degraded, Evaluate};
use crate::error::EvaluationError;
use crate::metrics::{MetricQuery, MetricsPort, Statistic};
use crate::models::{
    BillingMode, CostEstimate, FindingFlags, ResourceAttributes, ResourceDescriptor, ResourceKind,
};
use crate::pricing::{
    table_store_on_demand_monthly, table_store_provisioned_monthly, table_store_storage_monthly,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::OnceCell;

const LOOKBACK_DAYS: i64 = 14;
const HOURLY_PERIOD_SECS: u32 = 3_600;

const METRIC_NAMESPACE: &str = "AWS/DynamoDB";
const READ_CAPACITY_METRIC: &str = "ConsumedReadCapacityUnits";
const WRITE_CAPACITY_METRIC: &str = "ConsumedWriteCapacityUnits";

/// Below this many consumed units per hour a table counts as inactive
const ACTIVITY_THRESHOLD_UNITS: f64 = 1.0;

const PROVISIONED_LABEL: &str = "provisioned";
const ON_DEMAND_LABEL: &str = "on-demand";

pub struct TableStoreEvaluator {
    descriptor: ResourceDescriptor,
    billing_mode: BillingMode,
    provisioned_read_units: u64,
    provisioned_write_units: u64,
    size_bytes: u64,
    metrics: Arc<dyn MetricsPort>,
    consumption: OnceCell<(f64, f64)>,
    degraded: Degraded,
}

impl TableStoreEvaluator {
    pub fn new(
        descriptor: ResourceDescriptor,
        metrics: Arc<dyn MetricsPort>,
    ) -> Result<Self, EvaluationError> {
        let ResourceAttributes::TableStoreTable {
            billing_mode,
            provisioned_read_units,
            provisioned_write_units,
            size_bytes,
            item_count: _,
        } = &descriptor.attributes
        else {
            return Err(EvaluationError::AttributeMismatch {
                id: descriptor.id.clone(),
                expected: ResourceKind::TableStoreTable,
            });
        };

        Ok(Self {
            billing_mode: *billing_mode,
            provisioned_read_units: *provisioned_read_units,
            provisioned_write_units: *provisioned_write_units,
            size_bytes: *size_bytes,
            descriptor,
            metrics,
            consumption: OnceCell::new(),
            degraded: Degraded::default(),
        })
    }

    async fn hourly_average(&self, metric: &str) -> f64 {
        let end = Utc::now();
        let query = MetricQuery::resource(
            METRIC_NAMESPACE,
            metric,
            ("TableName", &self.descriptor.id),
            end - Duration::days(LOOKBACK_DAYS),
            end,
            HOURLY_PERIOD_SECS,
            Statistic::Sum,
        );
        let series = fetch_series_or_empty(
            self.metrics.as_ref(),
            &query,
            &self.degraded,
            &self.descriptor.id,
        )
        .await;
        series.mean().unwrap_or(0.0)
    }

    /// Average consumed (read, write) capacity units per hour
    async fn consumed_units(&self) -> (f64, f64) {
        *self
            .consumption
            .get_or_init(|| async {
                let read = self.hourly_average(READ_CAPACITY_METRIC).await;
                let write = self.hourly_average(WRITE_CAPACITY_METRIC).await;
                (read, write)
            })
            .await
    }

    pub async fn is_unused(&self) -> bool {
        let (read, write) = self.consumed_units().await;
        read < ACTIVITY_THRESHOLD_UNITS && write < ACTIVITY_THRESHOLD_UNITS
    }
}

#[async_trait]
impl Evaluate for TableStoreEvaluator {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    async fn is_in_use(&self) -> Result<bool, EvaluationError> {
        Ok(!self.is_unused().await)
    }

    async fn evaluate_savings(&self) -> Result<CostEstimate, EvaluationError> {
        let storage = table_store_storage_monthly(self.size_bytes);
        let (read, write) = self.consumed_units().await;
        let unused = self.is_unused().await;

        match self.billing_mode {
            BillingMode::Provisioned => {
                let current = storage
                    + table_store_provisioned_monthly(
                        self.provisioned_read_units,
                        self.provisioned_write_units,
                    );
                if unused {
                    Ok(CostEstimate::delete(PROVISIONED_LABEL, current))
                } else {
                    // Active but over-provisioned tables retier to on-demand
                    Ok(CostEstimate {
                        current_class: PROVISIONED_LABEL.to_string(),
                        current_monthly_cost: current,
                        recommended_class: ON_DEMAND_LABEL.to_string(),
                        recommended_monthly_cost: storage
                            + table_store_on_demand_monthly(read, write),
                    })
                }
            }
            BillingMode::OnDemand => {
                let current = storage + table_store_on_demand_monthly(read, write);
                if unused {
                    Ok(CostEstimate::delete(ON_DEMAND_LABEL, current))
                } else {
                    Ok(CostEstimate::parity(ON_DEMAND_LABEL, current))
                }
            }
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

    fn descriptor(billing_mode: BillingMode, read_units: u64, write_units: u64) -> ResourceDescriptor {
        ResourceDescriptor {
            id: "sessions".to_string(),
            account: "111111111111".to_string(),
            region: "us-east-1".to_string(),
            attributes: ResourceAttributes::TableStoreTable {
                billing_mode,
                provisioned_read_units: read_units,
                provisioned_write_units: write_units,
                size_bytes: 4 * ONE_GIB,
                item_count: 120_000,
            },
        }
    }

    fn flat_metrics(read_per_hour: f64, write_per_hour: f64) -> Arc<StaticMetrics> {
        Arc::new(
            StaticMetrics::new()
                .with_series(READ_CAPACITY_METRIC, &[read_per_hour; 24])
                .with_series(WRITE_CAPACITY_METRIC, &[write_per_hour; 24]),
        )
    }

    #[tokio::test]
    async fn test_low_consumption_is_unused() {
        let eval = TableStoreEvaluator::new(
            descriptor(BillingMode::Provisioned, 5, 5),
            flat_metrics(0.5, 0.9),
        )
        .unwrap();
        assert!(eval.is_unused().await);
    }

    #[tokio::test]
    async fn test_read_traffic_above_threshold_is_in_use() {
        let eval = TableStoreEvaluator::new(
            descriptor(BillingMode::Provisioned, 5, 5),
            flat_metrics(1.5, 0.2),
        )
        .unwrap();
        assert!(!eval.is_unused().await);
    }

    #[tokio::test]
    async fn test_empty_series_averages_to_unused() {
        let eval = TableStoreEvaluator::new(
            descriptor(BillingMode::OnDemand, 0, 0),
            Arc::new(StaticMetrics::new()),
        )
        .unwrap();
        assert!(eval.is_unused().await);
    }

    #[tokio::test]
    async fn test_unused_provisioned_table_recommends_delete() {
        let eval = TableStoreEvaluator::new(
            descriptor(BillingMode::Provisioned, 10, 10),
            flat_metrics(0.0, 0.0),
        )
        .unwrap();
        let estimate = eval.evaluate_savings().await.unwrap();
        assert_eq!(estimate.recommended_class, CostEstimate::NONE);
        let expected = 4.0 * 0.25 + 20.0 * 0.0065 * 730.0;
        assert!((estimate.current_monthly_cost - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_active_provisioned_table_retiers_to_on_demand() {
        let eval = TableStoreEvaluator::new(
            descriptor(BillingMode::Provisioned, 100, 100),
            flat_metrics(5.0, 2.0),
        )
        .unwrap();
        let estimate = eval.evaluate_savings().await.unwrap();
        assert_eq!(estimate.current_class, PROVISIONED_LABEL);
        assert_eq!(estimate.recommended_class, ON_DEMAND_LABEL);
        let storage = 4.0 * 0.25;
        let expected = storage
            + 5.0 * 0.000_000_25 * 730.0 * 3600.0
            + 2.0 * 0.000_001_25 * 730.0 * 3600.0;
        assert!((estimate.recommended_monthly_cost - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_active_on_demand_table_stays_at_parity() {
        let eval = TableStoreEvaluator::new(
            descriptor(BillingMode::OnDemand, 0, 0),
            flat_metrics(5.0, 2.0),
        )
        .unwrap();
        let estimate = eval.evaluate_savings().await.unwrap();
        assert_eq!(estimate.monthly_savings(), 0.0);
    }

    #[tokio::test]
    async fn test_metrics_outage_degrades_and_flags() {
        let eval = TableStoreEvaluator::new(
            descriptor(BillingMode::OnDemand, 0, 0),
            Arc::new(StaticMetrics::unavailable()),
        )
        .unwrap();
        assert!(eval.is_unused().await);
        assert!(eval.flags().metrics_unavailable);
    }
}
