//! DB snapshot evaluator
//!
//! Polarity: the natural rule is unused. No metrics are involved; the rule
//! is age plus an orphan check. A snapshot is unused when it is older than
//! the retention threshold AND either its owning instance still exists or
//! it is not the newest snapshot of a deleted instance — the last recovery
//! point of a deleted database is never flagged.

use super::{Degraded, Evaluate};
use crate::error::EvaluationError;
use crate::models::{CostEstimate, FindingFlags, ResourceAttributes, ResourceDescriptor, ResourceKind};
use crate::pricing::db_snapshot_monthly;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

const MAX_AGE_DAYS: i64 = 30;
const CLASS_LABEL: &str = "db-snapshot";

pub struct DbSnapshotEvaluator {
    descriptor: ResourceDescriptor,
    created_at: DateTime<Utc>,
    allocated_gib: u64,
    instance_exists: bool,
    newest_for_instance: bool,
    degraded: Degraded,
}

impl DbSnapshotEvaluator {
    pub fn new(descriptor: ResourceDescriptor) -> Result<Self, EvaluationError> {
        let ResourceAttributes::DbSnapshot {
            created_at,
            allocated_gib,
            instance_id: _,
            instance_exists,
            newest_for_instance,
        } = &descriptor.attributes
        else {
            return Err(EvaluationError::AttributeMismatch {
                id: descriptor.id.clone(),
                expected: ResourceKind::DbSnapshot,
            });
        };

        Ok(Self {
            created_at: *created_at,
            allocated_gib: *allocated_gib,
            instance_exists: *instance_exists,
            newest_for_instance: *newest_for_instance,
            descriptor,
            degraded: Degraded::default(),
        })
    }

    pub fn is_unused(&self) -> bool {
        let age = Utc::now() - self.created_at;
        if age <= Duration::days(MAX_AGE_DAYS) {
            return false;
        }
        // Keep the newest snapshot of a deleted instance
        self.instance_exists || !self.newest_for_instance
    }
}

#[async_trait]
impl Evaluate for DbSnapshotEvaluator {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    async fn is_in_use(&self) -> Result<bool, EvaluationError> {
        Ok(!self.is_unused())
    }

    async fn evaluate_savings(&self) -> Result<CostEstimate, EvaluationError> {
        let monthly = db_snapshot_monthly(self.allocated_gib);
        if self.is_unused() {
            Ok(CostEstimate::delete(CLASS_LABEL, monthly))
        } else {
            Ok(CostEstimate::parity(CLASS_LABEL, monthly))
        }
    }

    fn flags(&self) -> FindingFlags {
        self.degraded.snapshot()
    }
}
