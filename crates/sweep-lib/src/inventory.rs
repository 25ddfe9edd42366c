//! Inventory port
//!
//! The injected data-access capability for enumerating provider state. The
//! engine never constructs provider clients; live SDK adapters, snapshot
//! files, and test mocks all implement this trait.

use crate::error::InventoryError;
use crate::models::{ResourceDescriptor, ResourceKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Counts of resources attached to a virtual network
///
/// Subnets are reported for context but do not count as dependents: a
/// network holding only subnets is still unused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkDependents {
    pub instances: u32,
    pub network_interfaces: u32,
    pub nat_gateways: u32,
    pub endpoints: u32,
    pub subnets: u32,
}

impl NetworkDependents {
    /// True when anything other than subnets is attached
    pub fn any(&self) -> bool {
        self.instances > 0
            || self.network_interfaces > 0
            || self.nat_gateways > 0
            || self.endpoints > 0
    }
}

/// The injected inventory capability
///
/// Listing methods return partial results on enumeration errors rather than
/// failing the whole listing; a hard failure maps to
/// [`InventoryError::Enumeration`] and skips only that scope.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Accounts visible to this inventory (the organization-wide set)
    async fn accounts(&self) -> Result<Vec<String>, InventoryError>;

    /// Acquire a session for the account; failure skips the account
    async fn authenticate(&self, account: &str) -> Result<(), InventoryError>;

    /// Active regions for an authenticated account
    async fn regions(&self, account: &str) -> Result<Vec<String>, InventoryError>;

    /// Resource descriptors of one kind in one region
    async fn list(
        &self,
        account: &str,
        region: &str,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceDescriptor>, InventoryError>;

    /// Dependent-resource counts for a virtual network
    async fn network_dependents(
        &self,
        account: &str,
        region: &str,
        network_id: &str,
    ) -> Result<NetworkDependents, InventoryError>;
}
