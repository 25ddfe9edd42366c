//! Metric queries, series, and the metrics port
//!
//! Every evaluator pulls utilization telemetry through [`MetricsPort`], the
//! injected capability to fetch one named statistic for a resource over a
//! time window at a given granularity. Implementations live outside the
//! engine (provider adapters, snapshot files, test mocks).

use crate::error::MetricsError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregation applied within each period bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Sum,
    Average,
    Maximum,
}

/// One metric lookup, constructed fresh per fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    /// Provider namespace, e.g. "AWS/EBS"
    pub namespace: String,
    /// Metric name within the namespace, e.g. "VolumeReadBytes"
    pub metric: String,
    /// Dimension name/value pairs identifying the resource
    pub dimensions: BTreeMap<String, String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Aggregation bucket width in seconds
    pub period_secs: u32,
    pub statistic: Statistic,
}

impl MetricQuery {
    /// Query for a single-dimension resource metric, the common case
    pub fn resource(
        namespace: &str,
        metric: &str,
        dimension: (&str, &str),
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period_secs: u32,
        statistic: Statistic,
    ) -> Self {
        let mut dimensions = BTreeMap::new();
        dimensions.insert(dimension.0.to_string(), dimension.1.to_string());
        Self {
            namespace: namespace.to_string(),
            metric: metric.to_string(),
            dimensions,
            start,
            end,
            period_secs,
            statistic,
        }
    }
}

/// A single timestamped observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Ordered sequence of observations; may be empty
///
/// An empty series is never silently "in use": each evaluator applies its
/// documented empty-series policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    points: Vec<MetricPoint>,
}

impl MetricSeries {
    pub fn new(mut points: Vec<MetricPoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self { points }
    }

    pub fn empty() -> Self {
        Self { points: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[MetricPoint] {
        &self.points
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn sum(&self) -> f64 {
        self.values().sum()
    }

    pub fn maximum(&self) -> Option<f64> {
        self.values().fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
    }

    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.sum() / self.points.len() as f64)
    }

    /// Percentile with linear interpolation between closest ranks
    ///
    /// `p` is in percent (99.9 for p99.9). Returns `None` on an empty series.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        let mut values: Vec<f64> = self.values().collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let rank = (p / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        if lower == upper {
            return Some(values[lower]);
        }
        let weight = rank - lower as f64;
        Some(values[lower] * (1.0 - weight) + values[upper] * weight)
    }
}

/// The injected metrics capability
///
/// A failed fetch means the telemetry backend was unreachable or rejected
/// the query; callers degrade to the evaluator's empty-series policy and
/// mark the finding, they do not abort the resource.
#[async_trait]
pub trait MetricsPort: Send + Sync {
    async fn get_series(&self, query: &MetricQuery) -> Result<MetricSeries, MetricsError>;
}
