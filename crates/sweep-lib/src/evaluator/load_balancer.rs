//! Load balancer evaluator
//!
//! A balancer is in use when any daily processed-bytes sum over the lookback
//! window is positive. The metric namespace follows the ARN's type segment
//! (`net/...` selects the network namespace, anything else the application
//! namespace). A balancer not in `active` state is treated as in use so it
//! never receives a recommendation. An in-use balancer evaluates to a
//! price-parity estimate (allowed exception); only not-in-use balancers are
//! reported.

use super::{fetch_series_or_empty, Degraded, Evaluate};
use crate::error::EvaluationError;
use crate::metrics::{MetricQuery, MetricsPort, Statistic};
use crate::models::{CostEstimate, FindingFlags, ResourceAttributes, ResourceDescriptor, ResourceKind};
use crate::pricing::load_balancer_monthly;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

const LOOKBACK_DAYS: i64 = 14;
const DAILY_PERIOD_SECS: u32 = 86_400;

const NETWORK_NAMESPACE: &str = "AWS/NetworkELB";
const APPLICATION_NAMESPACE: &str = "AWS/ApplicationELB";
const PROCESSED_BYTES_METRIC: &str = "ProcessedBytes";

const ACTIVE_STATE: &str = "active";
const CLASS_LABEL: &str = "load-balancer";

pub struct LoadBalancerEvaluator {
    descriptor: ResourceDescriptor,
    /// Name portion of the ARN, e.g. "net/my-nlb/50dc6c495c0c9188"
    name: String,
    state: String,
    metrics: Arc<dyn MetricsPort>,
    verdict: OnceCell<bool>,
    degraded: Degraded,
}

impl LoadBalancerEvaluator {
    pub fn new(
        descriptor: ResourceDescriptor,
        metrics: Arc<dyn MetricsPort>,
    ) -> Result<Self, EvaluationError> {
        let ResourceAttributes::LoadBalancer { arn, state } = &descriptor.attributes else {
            return Err(EvaluationError::AttributeMismatch {
                id: descriptor.id.clone(),
                expected: ResourceKind::LoadBalancer,
            });
        };

        // The dimension value is everything after "loadbalancer/"
        let name = arn
            .split_once("loadbalancer/")
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| arn.clone());

        Ok(Self {
            name,
            state: state.clone(),
            descriptor,
            metrics,
            verdict: OnceCell::new(),
            degraded: Degraded::default(),
        })
    }

    fn namespace(&self) -> &'static str {
        if self.name.starts_with("net/") {
            NETWORK_NAMESPACE
        } else {
            APPLICATION_NAMESPACE
        }
    }

    async fn usage(&self) -> bool {
        *self
            .verdict
            .get_or_init(|| async {
                if self.state != ACTIVE_STATE {
                    debug!(
                        load_balancer = %self.name,
                        state = %self.state,
                        "non-active balancer treated as in use"
                    );
                    return true;
                }

                let end = Utc::now();
                let query = MetricQuery::resource(
                    self.namespace(),
                    PROCESSED_BYTES_METRIC,
                    ("LoadBalancer", &self.name),
                    end - Duration::days(LOOKBACK_DAYS),
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
                let active = series.values().any(|daily| daily > 0.0);
                active
            })
            .await
    }
}

#[async_trait]
impl Evaluate for LoadBalancerEvaluator {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    async fn is_in_use(&self) -> Result<bool, EvaluationError> {
        Ok(self.usage().await)
    }

    async fn evaluate_savings(&self) -> Result<CostEstimate, EvaluationError> {
        let monthly = load_balancer_monthly();
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

    fn descriptor(type_segment: &str, state: &str) -> ResourceDescriptor {
        ResourceDescriptor {
            id: format!("{type_segment}/edge/50dc6c495c0c9188"),
            account: "111111111111".to_string(),
            region: "us-east-1".to_string(),
            attributes: ResourceAttributes::LoadBalancer {
                arn: format!(
                    "arn:aws:elasticloadbalancing:us-east-1:111111111111:loadbalancer/{type_segment}/edge/50dc6c495c0c9188"
                ),
                state: state.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_namespace_follows_arn_type_segment() {
        let net = LoadBalancerEvaluator::new(
            descriptor("net", "active"),
            Arc::new(StaticMetrics::new()),
        )
        .unwrap();
        assert_eq!(net.namespace(), NETWORK_NAMESPACE);
        assert_eq!(net.name, "net/edge/50dc6c495c0c9188");

        let app = LoadBalancerEvaluator::new(
            descriptor("app", "active"),
            Arc::new(StaticMetrics::new()),
        )
        .unwrap();
        assert_eq!(app.namespace(), APPLICATION_NAMESPACE);
    }

    #[tokio::test]
    async fn test_any_positive_day_is_in_use() {
        let metrics = Arc::new(
            StaticMetrics::new()
                .with_series(PROCESSED_BYTES_METRIC, &[0.0, 0.0, 1_500_000.0, 0.0]),
        );
        let eval = LoadBalancerEvaluator::new(descriptor("app", "active"), metrics).unwrap();
        assert!(eval.is_in_use().await.unwrap());
    }

    #[tokio::test]
    async fn test_all_zero_days_not_in_use() {
        let metrics = Arc::new(
            StaticMetrics::new().with_series(PROCESSED_BYTES_METRIC, &[0.0, 0.0, 0.0]),
        );
        let eval = LoadBalancerEvaluator::new(descriptor("net", "active"), metrics).unwrap();
        assert!(!eval.is_in_use().await.unwrap());

        let estimate = eval.evaluate_savings().await.unwrap();
        assert_eq!(estimate.recommended_class, CostEstimate::NONE);
        assert!((estimate.current_monthly_cost - 18.144).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_series_not_in_use() {
        let eval = LoadBalancerEvaluator::new(
            descriptor("app", "active"),
            Arc::new(StaticMetrics::new()),
        )
        .unwrap();
        assert!(!eval.is_in_use().await.unwrap());
    }

    #[tokio::test]
    async fn test_non_active_state_is_in_use() {
        let eval = LoadBalancerEvaluator::new(
            descriptor("app", "provisioning"),
            Arc::new(StaticMetrics::new()),
        )
        .unwrap();
        assert!(eval.is_in_use().await.unwrap());
        // Parity: no recommendation for a balancer mid-lifecycle
        let estimate = eval.evaluate_savings().await.unwrap();
        assert_eq!(estimate.monthly_savings(), 0.0);
    }

    #[tokio::test]
    async fn test_metrics_outage_degrades_to_not_in_use() {
        let eval = LoadBalancerEvaluator::new(
            descriptor("app", "active"),
            Arc::new(StaticMetrics::unavailable()),
        )
        .unwrap();
        assert!(!eval.is_in_use().await.unwrap());
        assert!(eval.flags().metrics_unavailable);
    }
}
