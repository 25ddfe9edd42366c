//! Block volume evaluator
//!
//! A volume is in use when its measured read+write throughput over the
//! lookback window is above zero. Throughput is the 99.9th percentile of
//! 1-minute byte samples divided by the sample period, read and write summed.
//! An empty series measures as zero throughput, so a volume with no
//! telemetry classifies as not in use.

use super::{fetch_series_or_empty, Degraded, Evaluate};
use crate::error::EvaluationError;
use crate::metrics::{MetricQuery, MetricsPort, Statistic};
use crate::models::{CostEstimate, FindingFlags, ResourceAttributes, ResourceDescriptor, ResourceKind};
use crate::pricing::storage::{DEFAULT_IOPS, DEFAULT_THROUGHPUT_MBS};
use crate::pricing::{recommend_storage_class, storage_cost, StorageClass};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;

const LOOKBACK_DAYS: i64 = 14;
const SAMPLE_PERIOD_SECS: u32 = 60;
const THROUGHPUT_PERCENTILE: f64 = 99.9;

const METRIC_NAMESPACE: &str = "AWS/EBS";
const READ_BYTES_METRIC: &str = "VolumeReadBytes";
const WRITE_BYTES_METRIC: &str = "VolumeWriteBytes";

impl std::fmt::Debug for VolumeEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeEvaluator")
            .field("descriptor", &self.descriptor)
            .field("class_label", &self.class_label)
            .field("size_gib", &self.size_gib)
            .field("iops", &self.iops)
            .field("throughput_mbs", &self.throughput_mbs)
            .field("degraded", &self.degraded)
            .finish_non_exhaustive()
    }
}

pub struct VolumeEvaluator {
    descriptor: ResourceDescriptor,
    class_label: String,
    size_gib: u64,
    iops: u32,
    throughput_mbs: u32,
    metrics: Arc<dyn MetricsPort>,
    degraded: Degraded,
}

impl VolumeEvaluator {
    pub fn new(
        descriptor: ResourceDescriptor,
        metrics: Arc<dyn MetricsPort>,
    ) -> Result<Self, EvaluationError> {
        let ResourceAttributes::Volume {
            class,
            size_gib,
            provisioned_iops,
            provisioned_throughput_mbs,
        } = &descriptor.attributes
        else {
            return Err(EvaluationError::AttributeMismatch {
                id: descriptor.id.clone(),
                expected: ResourceKind::Volume,
            });
        };

        Ok(Self {
            class_label: class.clone(),
            size_gib: *size_gib,
            iops: provisioned_iops.unwrap_or(DEFAULT_IOPS),
            throughput_mbs: provisioned_throughput_mbs.unwrap_or(DEFAULT_THROUGHPUT_MBS),
            descriptor,
            metrics,
            degraded: Degraded::default(),
        })
    }

    /// p99.9 of 1-minute byte samples, as bytes per second
    async fn sampled_throughput(&self, metric: &str) -> f64 {
        let end = Utc::now();
        let query = MetricQuery::resource(
            METRIC_NAMESPACE,
            metric,
            ("VolumeId", &self.descriptor.id),
            end - Duration::days(LOOKBACK_DAYS),
            end,
            SAMPLE_PERIOD_SECS,
            Statistic::Maximum,
        );
        let series =
            fetch_series_or_empty(self.metrics.as_ref(), &query, &self.degraded, &self.descriptor.id)
                .await;
        series
            .percentile(THROUGHPUT_PERCENTILE)
            .map(|bytes| bytes / SAMPLE_PERIOD_SECS as f64)
            .unwrap_or(0.0)
    }

    /// Measured read+write bytes per second over the lookback window
    async fn measured_throughput(&self) -> f64 {
        let read = self.sampled_throughput(READ_BYTES_METRIC).await;
        let write = self.sampled_throughput(WRITE_BYTES_METRIC).await;
        read + write
    }
}

#[async_trait]
impl Evaluate for VolumeEvaluator {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    async fn is_in_use(&self) -> Result<bool, EvaluationError> {
        let throughput = self.measured_throughput().await;
        debug!(
            volume_id = %self.descriptor.id,
            throughput_bytes_per_sec = throughput,
            "volume throughput measured"
        );
        Ok(throughput > 0.0)
    }

    async fn evaluate_savings(&self) -> Result<CostEstimate, EvaluationError> {
        let class = match StorageClass::parse(&self.class_label) {
            Ok(class) => class,
            Err(e) => {
                debug!(volume_id = %self.descriptor.id, error = %e, "unknown storage class");
                self.degraded.mark_pricing_missing();
                return Ok(CostEstimate::delete(self.class_label.clone(), 0.0));
            }
        };

        let current_cost = storage_cost(class, self.size_gib, self.iops, self.throughput_mbs);
        let (recommended, recommended_cost) =
            recommend_storage_class(class, self.size_gib, self.iops, self.throughput_mbs);
        Ok(CostEstimate {
            current_class: class.label().to_string(),
            current_monthly_cost: current_cost,
            recommended_class: recommended.label().to_string(),
            recommended_monthly_cost: recommended_cost,
        })
    }

    fn flags(&self) -> FindingFlags {
        self.degraded.snapshot()
    }
}
