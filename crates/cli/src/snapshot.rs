//! Snapshot-file port adapters
//!
//! Implements the engine's inventory and metrics ports over an exported
//! JSON snapshot of provider state, so full scans run offline without
//! credentials. Live SDK adapters plug into the same two traits.
//!
//! Snapshot layout:
//!
//! ```json
//! {
//!   "accounts": [
//!     {"id": "111111111111", "regions": [
//!       {"name": "us-east-1",
//!        "resources": [{"id": "vol-1", "attributes": {...}}],
//!        "network_dependents": {"vpc-1": {"subnets": 2}}}
//!     ]}
//!   ],
//!   "metrics": [
//!     {"namespace": "AWS/EBS", "metric": "VolumeReadBytes",
//!      "dimensions": {"VolumeId": "vol-1"}, "values": [0.0, 0.0]}
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Duration;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use sweep_lib::{
    Inventory, InventoryError, MetricPoint, MetricQuery, MetricSeries, MetricsError, MetricsPort,
    NetworkDependents, ResourceDescriptor, ResourceKind,
};

#[derive(Debug, Deserialize)]
pub struct SnapshotFile {
    pub accounts: Vec<AccountSnapshot>,
    #[serde(default)]
    pub metrics: Vec<MetricRecord>,
}

#[derive(Debug, Deserialize)]
pub struct AccountSnapshot {
    pub id: String,
    /// Simulates a failed role assumption for this account
    #[serde(default)]
    pub auth_error: Option<String>,
    #[serde(default)]
    pub regions: Vec<RegionSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct RegionSnapshot {
    pub name: String,
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
    /// Network id -> dependent counts, for virtual network evaluation
    #[serde(default)]
    pub network_dependents: HashMap<String, NetworkDependents>,
}

#[derive(Debug, Deserialize)]
pub struct MetricRecord {
    pub namespace: String,
    pub metric: String,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
    /// Simulates a telemetry outage for queries matching this record
    #[serde(default)]
    pub unavailable: bool,
    /// Sampled values in bucket order; timestamps are synthesized from the
    /// query window
    #[serde(default)]
    pub values: Vec<f64>,
}

/// Inventory and metrics ports backed by one snapshot file
pub struct SnapshotStore {
    file: SnapshotFile,
}

impl SnapshotStore {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let mut file: SnapshotFile =
            serde_json::from_str(raw).context("snapshot is not valid JSON")?;

        // Descriptors inherit account/region from their position in the file
        for account in &mut file.accounts {
            for region in &mut account.regions {
                for resource in &mut region.resources {
                    resource.account = account.id.clone();
                    resource.region = region.name.clone();
                }
            }
        }

        Ok(Self { file })
    }

    fn account(&self, id: &str) -> Option<&AccountSnapshot> {
        self.file.accounts.iter().find(|a| a.id == id)
    }

    fn region(&self, account: &str, region: &str) -> Option<&RegionSnapshot> {
        self.account(account)?.regions.iter().find(|r| r.name == region)
    }
}

#[async_trait]
impl Inventory for SnapshotStore {
    async fn accounts(&self) -> Result<Vec<String>, InventoryError> {
        Ok(self.file.accounts.iter().map(|a| a.id.clone()).collect())
    }

    async fn authenticate(&self, account: &str) -> Result<(), InventoryError> {
        match self.account(account) {
            Some(snapshot) => match &snapshot.auth_error {
                Some(reason) => Err(InventoryError::Auth {
                    account: account.to_string(),
                    source: anyhow::anyhow!("{reason}"),
                }),
                None => Ok(()),
            },
            None => Err(InventoryError::Auth {
                account: account.to_string(),
                source: anyhow::anyhow!("account not present in snapshot"),
            }),
        }
    }

    async fn regions(&self, account: &str) -> Result<Vec<String>, InventoryError> {
        match self.account(account) {
            Some(snapshot) => Ok(snapshot.regions.iter().map(|r| r.name.clone()).collect()),
            None => Err(InventoryError::Enumeration {
                scope: format!("account {account}"),
                source: anyhow::anyhow!("account not present in snapshot"),
            }),
        }
    }

    async fn list(
        &self,
        account: &str,
        region: &str,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceDescriptor>, InventoryError> {
        // A region absent from the snapshot simply lists as empty
        let Some(snapshot) = self.region(account, region) else {
            return Ok(Vec::new());
        };
        Ok(snapshot
            .resources
            .iter()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect())
    }

    async fn network_dependents(
        &self,
        account: &str,
        region: &str,
        network_id: &str,
    ) -> Result<NetworkDependents, InventoryError> {
        Ok(self
            .region(account, region)
            .and_then(|r| r.network_dependents.get(network_id))
            .copied()
            .unwrap_or_default())
    }
}

#[async_trait]
impl MetricsPort for SnapshotStore {
    async fn get_series(&self, query: &MetricQuery) -> Result<MetricSeries, MetricsError> {
        let Some(record) = self.file.metrics.iter().find(|r| {
            r.namespace == query.namespace
                && r.metric == query.metric
                && r.dimensions == query.dimensions
        }) else {
            return Ok(MetricSeries::empty());
        };

        if record.unavailable {
            return Err(MetricsError::unavailable(
                "snapshot marks this series unavailable",
            ));
        }

        Ok(MetricSeries::new(
            record
                .values
                .iter()
                .enumerate()
                .map(|(i, &value)| MetricPoint {
                    timestamp: query.start
                        + Duration::seconds(i as i64 * query.period_secs as i64),
                    value,
                })
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sweep_lib::Statistic;

    const SNAPSHOT: &str = r#"{
        "accounts": [
            {"id": "111111111111", "regions": [
                {"name": "us-east-1",
                 "resources": [
                    {"id": "eipalloc-1",
                     "attributes": {"floating_ip": {"association_id": null}}}
                 ],
                 "network_dependents": {"vpc-1": {"subnets": 2}}}
            ]},
            {"id": "222222222222", "auth_error": "role assumption denied"}
        ],
        "metrics": [
            {"namespace": "AWS/EBS", "metric": "VolumeReadBytes",
             "dimensions": {"VolumeId": "vol-1"}, "values": [1.0, 2.0, 3.0]},
            {"namespace": "AWS/EFS", "metric": "ClientConnections",
             "dimensions": {"FileSystemId": "fs-1"}, "unavailable": true}
        ]
    }"#;

    fn store() -> SnapshotStore {
        SnapshotStore::from_json_str(SNAPSHOT).unwrap()
    }

    #[tokio::test]
    async fn test_descriptors_inherit_scope() {
        let store = store();
        let resources = store
            .list("111111111111", "us-east-1", ResourceKind::FloatingIp)
            .await
            .unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].account, "111111111111");
        assert_eq!(resources[0].region, "us-east-1");
    }

    #[tokio::test]
    async fn test_auth_error_maps_to_auth_failure() {
        let store = store();
        assert!(store.authenticate("111111111111").await.is_ok());
        let err = store.authenticate("222222222222").await.unwrap_err();
        assert!(matches!(err, InventoryError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_metrics_match_on_dimensions() {
        let store = store();
        let end = Utc::now();
        let query = MetricQuery::resource(
            "AWS/EBS",
            "VolumeReadBytes",
            ("VolumeId", "vol-1"),
            end - Duration::days(14),
            end,
            60,
            Statistic::Maximum,
        );
        let series = store.get_series(&query).await.unwrap();
        assert_eq!(series.len(), 3);

        // Different resource: no record, empty series
        let other = MetricQuery::resource(
            "AWS/EBS",
            "VolumeReadBytes",
            ("VolumeId", "vol-2"),
            end - Duration::days(14),
            end,
            60,
            Statistic::Maximum,
        );
        assert!(store.get_series(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_record_is_a_port_failure() {
        let store = store();
        let end = Utc::now();
        let query = MetricQuery::resource(
            "AWS/EFS",
            "ClientConnections",
            ("FileSystemId", "fs-1"),
            end - Duration::days(14),
            end,
            60,
            Statistic::Maximum,
        );
        assert!(store.get_series(&query).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_region_lists_empty() {
        let store = store();
        let resources = store
            .list("111111111111", "eu-west-1", ResourceKind::Volume)
            .await
            .unwrap();
        assert!(resources.is_empty());
    }
}
