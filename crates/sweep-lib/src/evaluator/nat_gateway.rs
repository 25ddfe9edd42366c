//! NAT gateway evaluator
//!
//! A gateway is in use when any daily active-connection sum over the
//! lookback window is positive; an empty series classifies as not in use.
//! A gateway not in `available` state is treated as in use so it never
//! receives a recommendation.

use super::{fetch_series_or_empty, Degraded, Evaluate};
use crate::error::EvaluationError;
use crate::metrics::{MetricQuery, MetricsPort, Statistic};
use crate::models::{CostEstimate, FindingFlags, ResourceAttributes, ResourceDescriptor, ResourceKind};
use crate::pricing::nat_gateway_monthly;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

const LOOKBACK_DAYS: i64 = 14;
const DAILY_PERIOD_SECS: u32 = 86_400;

const METRIC_NAMESPACE: &str = "AWS/NATGateway";
const ACTIVE_CONNECTIONS_METRIC: &str = "ActiveConnectionCount";

const AVAILABLE_STATE: &str = "available";
const CLASS_LABEL: &str = "nat-gateway";

pub struct NatGatewayEvaluator {
    descriptor: ResourceDescriptor,
    state: String,
    metrics: Arc<dyn MetricsPort>,
    verdict: OnceCell<bool>,
    degraded: Degraded,
}

impl NatGatewayEvaluator {
    pub fn new(
        descriptor: ResourceDescriptor,
        metrics: Arc<dyn MetricsPort>,
    ) -> Result<Self, EvaluationError> {
        let ResourceAttributes::NatGateway { state } = &descriptor.attributes else {
            return Err(EvaluationError::AttributeMismatch {
                id: descriptor.id.clone(),
                expected: ResourceKind::NatGateway,
            });
        };

        Ok(Self {
            state: state.clone(),
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
                if self.state != AVAILABLE_STATE {
                    debug!(
                        nat_gateway_id = %self.descriptor.id,
                        state = %self.state,
                        "non-available gateway treated as in use"
                    );
                    return true;
                }

                let end = Utc::now();
                let query = MetricQuery::resource(
                    METRIC_NAMESPACE,
                    ACTIVE_CONNECTIONS_METRIC,
                    ("NatGatewayId", &self.descriptor.id),
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
impl Evaluate for NatGatewayEvaluator {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    async fn is_in_use(&self) -> Result<bool, EvaluationError> {
        Ok(self.usage().await)
    }

    async fn evaluate_savings(&self) -> Result<CostEstimate, EvaluationError> {
        let monthly = nat_gateway_monthly();
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
