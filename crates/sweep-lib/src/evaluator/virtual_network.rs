//! Virtual network evaluator
//!
//! Polarity: the natural rule is unused. Usage is instantaneous: a network
//! with any dependent resource (compute instances, network interfaces, NAT
//! gateways, endpoints) is in use; subnets alone do not count. Default,
//! system-managed networks are always treated as in use so they never
//! appear in results. A failed dependent lookup also classifies as in use:
//! a network that could not be checked is never recommended for deletion.
//!
//! Networks carry no direct charge; an unused network reports a zero-cost
//! delete recommendation so the finding itself survives.

use super::{Degraded, Evaluate};
use crate::error::EvaluationError;
use crate::inventory::Inventory;
use crate::models::{CostEstimate, FindingFlags, ResourceAttributes, ResourceDescriptor, ResourceKind};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

const CLASS_LABEL: &str = "virtual-network";

pub struct VirtualNetworkEvaluator {
    descriptor: ResourceDescriptor,
    is_default: bool,
    inventory: Arc<dyn Inventory>,
    verdict: OnceCell<bool>,
    degraded: Degraded,
}

impl VirtualNetworkEvaluator {
    pub fn new(
        descriptor: ResourceDescriptor,
        inventory: Arc<dyn Inventory>,
    ) -> Result<Self, EvaluationError> {
        let ResourceAttributes::VirtualNetwork { is_default, .. } = &descriptor.attributes else {
            return Err(EvaluationError::AttributeMismatch {
                id: descriptor.id.clone(),
                expected: ResourceKind::VirtualNetwork,
            });
        };

        Ok(Self {
            is_default: *is_default,
            descriptor,
            inventory,
            verdict: OnceCell::new(),
            degraded: Degraded::default(),
        })
    }

    async fn usage(&self) -> bool {
        *self
            .verdict
            .get_or_init(|| async {
                if self.is_default {
                    debug!(network_id = %self.descriptor.id, "default network skipped");
                    return true;
                }

                match self
                    .inventory
                    .network_dependents(
                        &self.descriptor.account,
                        &self.descriptor.region,
                        &self.descriptor.id,
                    )
                    .await
                {
                    Ok(dependents) => dependents.any(),
                    Err(e) => {
                        warn!(
                            network_id = %self.descriptor.id,
                            error = %e,
                            "dependent lookup failed, treating network as in use"
                        );
                        true
                    }
                }
            })
            .await
    }
}

#[async_trait]
impl Evaluate for VirtualNetworkEvaluator {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    async fn is_in_use(&self) -> Result<bool, EvaluationError> {
        Ok(self.usage().await)
    }

    async fn evaluate_savings(&self) -> Result<CostEstimate, EvaluationError> {
        if self.usage().await {
            Ok(CostEstimate::parity(CLASS_LABEL, 0.0))
        } else {
            Ok(CostEstimate::delete(CLASS_LABEL, 0.0))
        }
    }

    fn flags(&self) -> FindingFlags {
        self.degraded.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::testing::StaticInventory;
    use crate::inventory::NetworkDependents;

    fn descriptor(id: &str, is_default: bool) -> ResourceDescriptor {
        ResourceDescriptor {
            id: id.to_string(),
            account: "111111111111".to_string(),
            region: "us-east-1".to_string(),
            attributes: ResourceAttributes::VirtualNetwork {
                is_default,
                cidr_block: "10.0.0.0/16".to_string(),
                name: None,
            },
        }
    }

    #[tokio::test]
    async fn test_network_with_only_subnets_is_unused() {
        let mut inventory = StaticInventory::default();
        inventory.dependents.insert(
            "vpc-1".to_string(),
            NetworkDependents {
                subnets: 2,
                ..Default::default()
            },
        );
        let eval =
            VirtualNetworkEvaluator::new(descriptor("vpc-1", false), Arc::new(inventory)).unwrap();
        assert!(!eval.is_in_use().await.unwrap());

        let estimate = eval.evaluate_savings().await.unwrap();
        assert_eq!(estimate.recommended_class, CostEstimate::NONE);
        assert_eq!(estimate.current_monthly_cost, 0.0);
    }

    #[tokio::test]
    async fn test_one_network_interface_means_in_use() {
        let mut inventory = StaticInventory::default();
        inventory.dependents.insert(
            "vpc-1".to_string(),
            NetworkDependents {
                network_interfaces: 1,
                subnets: 2,
                ..Default::default()
            },
        );
        let eval =
            VirtualNetworkEvaluator::new(descriptor("vpc-1", false), Arc::new(inventory)).unwrap();
        assert!(eval.is_in_use().await.unwrap());
    }

    #[tokio::test]
    async fn test_default_network_always_excluded() {
        // No dependents at all, but system-managed
        let eval = VirtualNetworkEvaluator::new(
            descriptor("vpc-default", true),
            Arc::new(StaticInventory::default()),
        )
        .unwrap();
        assert!(eval.is_in_use().await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_lookup_is_treated_as_in_use() {
        let inventory = StaticInventory {
            fail_dependents: true,
            ..Default::default()
        };
        let eval =
            VirtualNetworkEvaluator::new(descriptor("vpc-1", false), Arc::new(inventory)).unwrap();
        assert!(eval.is_in_use().await.unwrap());
    }
}
