//! Floating IP evaluator
//!
//! Usage is instantaneous: an address with an association is in use, one
//! without is not. No metrics are involved. An in-use address evaluates to a
//! price-parity estimate (the allowed exception to the findings invariant);
//! the coordinator still only reports unassociated addresses.

use super::{Degraded, Evaluate};
use crate::error::EvaluationError;
use crate::models::{CostEstimate, FindingFlags, ResourceAttributes, ResourceDescriptor, ResourceKind};
use crate::pricing::floating_ip_monthly;
use async_trait::async_trait;

const CLASS_LABEL: &str = "floating-ip";

pub struct FloatingIpEvaluator {
    descriptor: ResourceDescriptor,
    associated: bool,
    degraded: Degraded,
}

impl FloatingIpEvaluator {
    pub fn new(descriptor: ResourceDescriptor) -> Result<Self, EvaluationError> {
        let ResourceAttributes::FloatingIp { association_id } = &descriptor.attributes else {
            return Err(EvaluationError::AttributeMismatch {
                id: descriptor.id.clone(),
                expected: ResourceKind::FloatingIp,
            });
        };

        Ok(Self {
            associated: association_id.is_some(),
            descriptor,
            degraded: Degraded::default(),
        })
    }
}

#[async_trait]
impl Evaluate for FloatingIpEvaluator {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    async fn is_in_use(&self) -> Result<bool, EvaluationError> {
        Ok(self.associated)
    }

    async fn evaluate_savings(&self) -> Result<CostEstimate, EvaluationError> {
        let monthly = floating_ip_monthly();
        if self.associated {
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

    fn descriptor(association_id: Option<&str>) -> ResourceDescriptor {
        ResourceDescriptor {
            id: "eipalloc-01".to_string(),
            account: "111111111111".to_string(),
            region: "us-east-1".to_string(),
            attributes: ResourceAttributes::FloatingIp {
                association_id: association_id.map(str::to_string),
            },
        }
    }

    #[tokio::test]
    async fn test_associated_address_is_in_use_at_parity() {
        let eval = FloatingIpEvaluator::new(descriptor(Some("eipassoc-9"))).unwrap();
        assert!(eval.is_in_use().await.unwrap());

        let estimate = eval.evaluate_savings().await.unwrap();
        assert_eq!(estimate.monthly_savings(), 0.0);
        assert_eq!(estimate.recommended_class, CLASS_LABEL);
    }

    #[tokio::test]
    async fn test_unassociated_address_recommends_release() {
        let eval = FloatingIpEvaluator::new(descriptor(None)).unwrap();
        assert!(!eval.is_in_use().await.unwrap());

        let estimate = eval.evaluate_savings().await.unwrap();
        assert_eq!(estimate.recommended_class, CostEstimate::NONE);
        assert!((estimate.current_monthly_cost - 3.6).abs() < 1e-9);
        assert_eq!(estimate.recommended_monthly_cost, 0.0);
    }
}
