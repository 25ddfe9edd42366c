//! Error taxonomy for the scanner
//!
//! Scope determines handling: account-level failures skip the account,
//! region/kind-level failures skip that scope, resource-level conditions
//! degrade the single evaluation. No variant ever terminates a scan.

use crate::models::ResourceKind;
use thiserror::Error;

/// Failures raised by the inventory port
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Account-level: skip the account, surface in the scan summary
    #[error("authentication failed for account {account}")]
    Auth {
        account: String,
        #[source]
        source: anyhow::Error,
    },

    /// Region/kind-level: skip that scope, surface in the scan summary
    #[error("enumeration failed for {scope}")]
    Enumeration {
        scope: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Failure fetching a metric series
///
/// Callers treat this as an empty series plus a degraded-confidence flag,
/// never as a scan failure.
#[derive(Debug, Error)]
#[error("metrics unavailable: {reason}")]
pub struct MetricsError {
    pub reason: String,
}

impl MetricsError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Pricing lookups that cannot produce a cost
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// Storage class label not in the tier model; costed at zero
    #[error("unknown storage class {0:?}")]
    UnknownStorageClass(String),

    /// Region or instance class absent from the compute pricing table;
    /// callers report current cost only and set the pricing_missing flag
    #[error("no pricing data for instance class {class} in region {region}")]
    MissingEntry { region: String, class: String },
}

/// Resource-level evaluation failures
///
/// A resource that errors here is logged and skipped; siblings are
/// unaffected.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("resource {id} is in an unrecognized state: {state}")]
    UnknownResourceState { id: String, state: String },

    #[error("descriptor for {id} does not carry {expected} attributes")]
    AttributeMismatch { id: String, expected: ResourceKind },

    #[error("evaluation of {id} timed out after {seconds}s")]
    Timeout { id: String, seconds: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_scope() {
        let err = InventoryError::Auth {
            account: "222222222222".to_string(),
            source: anyhow::anyhow!("role assumption denied"),
        };
        assert!(err.to_string().contains("222222222222"));

        let err = PricingError::MissingEntry {
            region: "eu-north-1".to_string(),
            class: "db.m5.large".to_string(),
        };
        assert!(err.to_string().contains("eu-north-1"));
        assert!(err.to_string().contains("db.m5.large"));
    }
}
