//! Tiered block-storage pricing
//!
//! Six storage classes in four shapes: capacity-only (gp2, st1, sc1), a
//! baseline-with-burst class billing IOPS and throughput over a free
//! allowance (gp3), a flat IOPS-provisioned class (io1), and a banded
//! IOPS-provisioned class (io2) whose per-IOPS rate drops at the 32,000 and
//! 64,000 breakpoints. The io2 bands are marginal: each rate applies only to
//! the units falling inside its band.

use crate::error::PricingError;
use serde::{Deserialize, Serialize};
use std::fmt;

const GP2_GIB_MONTHLY: f64 = 0.11;
const GP3_GIB_MONTHLY: f64 = 0.088;
const GP3_FREE_IOPS: u32 = 3_000;
const GP3_IOPS_MONTHLY: f64 = 0.0055;
const GP3_FREE_THROUGHPUT_MBS: u32 = 125;
const GP3_THROUGHPUT_MONTHLY: f64 = 0.044;
const ST1_GIB_MONTHLY: f64 = 0.05;
const SC1_GIB_MONTHLY: f64 = 0.0168;
const PROVISIONED_GIB_MONTHLY: f64 = 0.138;
const IO1_IOPS_MONTHLY: f64 = 0.072;
const IO2_BAND1_IOPS_MONTHLY: f64 = 0.072;
const IO2_BAND2_IOPS_MONTHLY: f64 = 0.050;
const IO2_BAND3_IOPS_MONTHLY: f64 = 0.035;
const IO2_BAND1_CEILING: u32 = 32_000;
const IO2_BAND2_CEILING: u32 = 64_000;

/// IOPS/throughput ceilings the retier decision list checks against
const SC1_MAX_IOPS: u32 = 250;
const SC1_MAX_THROUGHPUT_MBS: u32 = 250;
const ST1_MAX_IOPS: u32 = 500;
const ST1_MAX_THROUGHPUT_MBS: u32 = 500;
const GP3_MAX_IOPS: u32 = 16_000;

/// Volumes at or below this size never retier to the cold tiers
const MIN_RETIER_SIZE_GIB: u64 = 125;

/// Parameters assumed when the provider reports none
pub const DEFAULT_IOPS: u32 = 3_000;
pub const DEFAULT_THROUGHPUT_MBS: u32 = 125;

/// A block-storage performance/cost tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageClass {
    /// gp2: legacy general purpose, capacity-only
    Gp2,
    /// gp3: general purpose with burst baseline
    Gp3,
    /// st1: throughput optimized
    St1,
    /// sc1: cold, the cheapest tier
    Sc1,
    /// io1: IOPS provisioned, flat per-IOPS rate
    Io1,
    /// io2: IOPS provisioned, banded per-IOPS rate
    Io2,
}

impl StorageClass {
    /// Parse a provider class label; unknown labels are a classification
    /// error the caller surfaces, never a panic
    pub fn parse(label: &str) -> Result<Self, PricingError> {
        match label {
            "gp2" => Ok(StorageClass::Gp2),
            "gp3" => Ok(StorageClass::Gp3),
            "st1" => Ok(StorageClass::St1),
            "sc1" => Ok(StorageClass::Sc1),
            "io1" => Ok(StorageClass::Io1),
            "io2" => Ok(StorageClass::Io2),
            other => Err(PricingError::UnknownStorageClass(other.to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StorageClass::Gp2 => "gp2",
            StorageClass::Gp3 => "gp3",
            StorageClass::St1 => "st1",
            StorageClass::Sc1 => "sc1",
            StorageClass::Io1 => "io1",
            StorageClass::Io2 => "io2",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Monthly cost of a volume on the given class
///
/// `iops` and `throughput_mbs` are the provisioned values; capacity-only
/// classes ignore them.
pub fn storage_cost(class: StorageClass, size_gib: u64, iops: u32, throughput_mbs: u32) -> f64 {
    let size = size_gib as f64;
    match class {
        StorageClass::Gp2 => size * GP2_GIB_MONTHLY,
        StorageClass::Gp3 => {
            let mut cost = size * GP3_GIB_MONTHLY;
            cost += iops.saturating_sub(GP3_FREE_IOPS) as f64 * GP3_IOPS_MONTHLY;
            cost += throughput_mbs.saturating_sub(GP3_FREE_THROUGHPUT_MBS) as f64
                * GP3_THROUGHPUT_MONTHLY;
            cost
        }
        StorageClass::St1 => size * ST1_GIB_MONTHLY,
        StorageClass::Sc1 => size * SC1_GIB_MONTHLY,
        StorageClass::Io1 => size * PROVISIONED_GIB_MONTHLY + iops as f64 * IO1_IOPS_MONTHLY,
        StorageClass::Io2 => size * PROVISIONED_GIB_MONTHLY + io2_iops_cost(iops),
    }
}

/// Banded io2 IOPS billing: each band's rate covers only the units inside it
fn io2_iops_cost(iops: u32) -> f64 {
    let band1 = iops.min(IO2_BAND1_CEILING);
    let band2 = iops.min(IO2_BAND2_CEILING).saturating_sub(IO2_BAND1_CEILING);
    let band3 = iops.saturating_sub(IO2_BAND2_CEILING);
    band1 as f64 * IO2_BAND1_IOPS_MONTHLY
        + band2 as f64 * IO2_BAND2_IOPS_MONTHLY
        + band3 as f64 * IO2_BAND3_IOPS_MONTHLY
}

/// Cheapest feasible class for a volume's provisioned parameters
///
/// Strictly ordered decision list; the first matching rule wins. The result
/// is clamped to the current class when no candidate is cheaper, so an idle
/// volume is never recommended a costlier tier.
pub fn recommend_storage_class(
    current: StorageClass,
    size_gib: u64,
    iops: u32,
    throughput_mbs: u32,
) -> (StorageClass, f64) {
    let candidate = if iops < SC1_MAX_IOPS
        && throughput_mbs < SC1_MAX_THROUGHPUT_MBS
        && size_gib > MIN_RETIER_SIZE_GIB
    {
        StorageClass::Sc1
    } else if iops < ST1_MAX_IOPS
        && throughput_mbs < ST1_MAX_THROUGHPUT_MBS
        && size_gib > MIN_RETIER_SIZE_GIB
    {
        StorageClass::St1
    } else if iops < GP3_MAX_IOPS {
        StorageClass::Gp3
    } else {
        StorageClass::Io2
    };

    let current_cost = storage_cost(current, size_gib, iops, throughput_mbs);
    let candidate_cost = storage_cost(candidate, size_gib, iops, throughput_mbs);
    if candidate_cost > current_cost {
        (current, current_cost)
    } else {
        (candidate, candidate_cost)
    }
}
