//! Core data models for the resource scanner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The resource kinds the scanner knows how to evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Volume,
    FloatingIp,
    LoadBalancer,
    NatGateway,
    FileSystem,
    DbInstance,
    DbSnapshot,
    TableStoreTable,
    VirtualNetwork,
}

impl ResourceKind {
    /// All kinds, in the order a region scan visits them
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::FloatingIp,
        ResourceKind::Volume,
        ResourceKind::LoadBalancer,
        ResourceKind::NatGateway,
        ResourceKind::FileSystem,
        ResourceKind::DbInstance,
        ResourceKind::DbSnapshot,
        ResourceKind::TableStoreTable,
        ResourceKind::VirtualNetwork,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Volume => "volume",
            ResourceKind::FloatingIp => "floating_ip",
            ResourceKind::LoadBalancer => "load_balancer",
            ResourceKind::NatGateway => "nat_gateway",
            ResourceKind::FileSystem => "file_system",
            ResourceKind::DbInstance => "db_instance",
            ResourceKind::DbSnapshot => "db_snapshot",
            ResourceKind::TableStoreTable => "table_store_table",
            ResourceKind::VirtualNetwork => "virtual_network",
        };
        f.write_str(name)
    }
}

/// Billing mode of a table-store table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
    Provisioned,
    OnDemand,
}

/// Per-kind native attributes captured at inventory time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAttributes {
    Volume {
        /// Storage class label, e.g. "gp3"
        class: String,
        size_gib: u64,
        provisioned_iops: Option<u32>,
        provisioned_throughput_mbs: Option<u32>,
    },
    FloatingIp {
        /// Present when the address is attached to an instance or interface
        association_id: Option<String>,
    },
    LoadBalancer {
        /// Full ARN; the type segment after `loadbalancer/` selects the
        /// metric namespace (net/... vs app/...)
        arn: String,
        state: String,
    },
    NatGateway {
        state: String,
    },
    FileSystem {
        standard_bytes: u64,
        infrequent_access_bytes: u64,
    },
    DbInstance {
        instance_class: String,
        engine: String,
        status: String,
        storage_class: String,
        storage_gib: u64,
        provisioned_iops: Option<u32>,
        provisioned_throughput_mbs: Option<u32>,
        multi_az: bool,
    },
    DbSnapshot {
        created_at: DateTime<Utc>,
        allocated_gib: u64,
        instance_id: String,
        /// Whether the owning instance still exists at scan time
        instance_exists: bool,
        /// Whether this is the most recent snapshot of its instance
        newest_for_instance: bool,
    },
    TableStoreTable {
        billing_mode: BillingMode,
        provisioned_read_units: u64,
        provisioned_write_units: u64,
        size_bytes: u64,
        item_count: u64,
    },
    VirtualNetwork {
        is_default: bool,
        cidr_block: String,
        name: Option<String>,
    },
}

impl ResourceAttributes {
    /// The kind tag these attributes belong to
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceAttributes::Volume { .. } => ResourceKind::Volume,
            ResourceAttributes::FloatingIp { .. } => ResourceKind::FloatingIp,
            ResourceAttributes::LoadBalancer { .. } => ResourceKind::LoadBalancer,
            ResourceAttributes::NatGateway { .. } => ResourceKind::NatGateway,
            ResourceAttributes::FileSystem { .. } => ResourceKind::FileSystem,
            ResourceAttributes::DbInstance { .. } => ResourceKind::DbInstance,
            ResourceAttributes::DbSnapshot { .. } => ResourceKind::DbSnapshot,
            ResourceAttributes::TableStoreTable { .. } => ResourceKind::TableStoreTable,
            ResourceAttributes::VirtualNetwork { .. } => ResourceKind::VirtualNetwork,
        }
    }
}

/// Immutable snapshot of one resource's provider state at scan time
///
/// Owned by the evaluator for the duration of a single evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: String,
    /// Filled by the inventory from the enumeration scope when absent
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub region: String,
    pub attributes: ResourceAttributes,
}

impl ResourceDescriptor {
    pub fn kind(&self) -> ResourceKind {
        self.attributes.kind()
    }
}

/// Before/after monthly cost for a recommended action
///
/// A `recommended_class` of `"None"` with zero cost signals a delete
/// recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub current_class: String,
    pub current_monthly_cost: f64,
    pub recommended_class: String,
    pub recommended_monthly_cost: f64,
}

impl CostEstimate {
    /// Label used for delete recommendations
    pub const NONE: &'static str = "None";

    /// Delete recommendation: keep the current class/cost, recommend nothing
    pub fn delete(current_class: impl Into<String>, current_monthly_cost: f64) -> Self {
        Self {
            current_class: current_class.into(),
            current_monthly_cost,
            recommended_class: Self::NONE.to_string(),
            recommended_monthly_cost: 0.0,
        }
    }

    /// Price-parity estimate for a resource left as is
    pub fn parity(class: impl Into<String>, monthly_cost: f64) -> Self {
        let class = class.into();
        Self {
            current_class: class.clone(),
            current_monthly_cost: monthly_cost,
            recommended_class: class,
            recommended_monthly_cost: monthly_cost,
        }
    }

    /// Monthly saving if the recommendation is taken
    pub fn monthly_savings(&self) -> f64 {
        self.current_monthly_cost - self.recommended_monthly_cost
    }
}

/// Degraded-confidence markers recorded on a finding
///
/// Set when a port failure forced the evaluator onto its empty-series policy
/// or when the pricing table had no entry for the resource's class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingFlags {
    pub metrics_unavailable: bool,
    pub pricing_missing: bool,
}

impl FindingFlags {
    pub fn is_degraded(&self) -> bool {
        self.metrics_unavailable || self.pricing_missing
    }
}

impl fmt::Display for FindingFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.metrics_unavailable, self.pricing_missing) {
            (false, false) => Ok(()),
            (true, false) => f.write_str("metrics_unavailable"),
            (false, true) => f.write_str("pricing_missing"),
            (true, true) => f.write_str("metrics_unavailable+pricing_missing"),
        }
    }
}

/// A reported idle/unused resource with its cost-optimization recommendation
///
/// Produced at most once per evaluated resource per scan; immutable once
/// emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub account: String,
    pub region: String,
    pub kind: ResourceKind,
    pub resource_id: String,
    pub estimate: CostEstimate,
    #[serde(default)]
    pub flags: FindingFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_estimate_signals_none() {
        let est = CostEstimate::delete("gp3", 44.0);
        assert_eq!(est.recommended_class, CostEstimate::NONE);
        assert_eq!(est.recommended_monthly_cost, 0.0);
        assert_eq!(est.monthly_savings(), 44.0);
    }

    #[test]
    fn test_parity_estimate_has_no_savings() {
        let est = CostEstimate::parity("ELB", 18.144);
        assert_eq!(est.current_class, est.recommended_class);
        assert_eq!(est.monthly_savings(), 0.0);
    }

    #[test]
    fn test_descriptor_kind_follows_attributes() {
        let desc = ResourceDescriptor {
            id: "vol-1".to_string(),
            account: "111111111111".to_string(),
            region: "us-east-1".to_string(),
            attributes: ResourceAttributes::Volume {
                class: "gp3".to_string(),
                size_gib: 100,
                provisioned_iops: Some(3000),
                provisioned_throughput_mbs: Some(125),
            },
        };
        assert_eq!(desc.kind(), ResourceKind::Volume);
    }

    #[test]
    fn test_flags_display() {
        let flags = FindingFlags {
            metrics_unavailable: true,
            pricing_missing: false,
        };
        assert!(flags.is_degraded());
        assert_eq!(flags.to_string(), "metrics_unavailable");
        assert_eq!(FindingFlags::default().to_string(), "");
    }
}
