//! Engine library for the cloudsweep resource scanner
//!
//! This crate provides the core functionality for:
//! - Usage classification of inventoried cloud resources
//! - Tiered storage and compute pricing
//! - Per-kind savings evaluation
//! - Account/region scan coordination with error isolation

pub mod error;
pub mod evaluator;
pub mod inventory;
pub mod metrics;
pub mod models;
pub mod pricing;
pub mod scan;

pub use error::{EvaluationError, InventoryError, MetricsError, PricingError};
pub use inventory::{Inventory, NetworkDependents};
pub use metrics::{MetricPoint, MetricQuery, MetricSeries, MetricsPort, Statistic};
pub use models::*;
pub use scan::{ReportSink, ScanConfig, ScanCoordinator, ScanReport, ScanSummary, VecSink};
