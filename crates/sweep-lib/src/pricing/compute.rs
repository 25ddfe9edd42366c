//! DB instance compute pricing
//!
//! A region/class keyed table of hourly rates, loaded once at process start.
//! Missing entries are an explicit no-pricing-data outcome: callers report
//! current cost only and mark the finding, they never crash the scan.

use super::HOURS_PER_MONTH;
use crate::error::PricingError;
use serde::Deserialize;
use std::collections::HashMap;

/// Hourly rate billed per serverless capacity unit
pub const SERVERLESS_CAPACITY_UNIT_HOURLY: f64 = 0.14;

/// Instance class label identifying serverless capacity billing
pub const SERVERLESS_CLASS: &str = "db.serverless";

static BUNDLED_TABLE: &str = include_str!("../../data/db_instance_pricing.json");

/// Region -> instance class -> hourly USD
#[derive(Debug, Clone, Deserialize)]
pub struct ComputePricing {
    #[serde(flatten)]
    regions: HashMap<String, HashMap<String, f64>>,
}

impl ComputePricing {
    /// Parse a pricing table from its JSON form
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The pricing table compiled into the binary
    pub fn bundled() -> Self {
        Self::from_json_str(BUNDLED_TABLE).expect("bundled pricing table is valid JSON")
    }

    /// Hourly rate for an instance class in a region
    pub fn hourly(&self, region: &str, class: &str) -> Result<f64, PricingError> {
        self.regions
            .get(region)
            .and_then(|classes| classes.get(class))
            .copied()
            .ok_or_else(|| PricingError::MissingEntry {
                region: region.to_string(),
                class: class.to_string(),
            })
    }

    /// Monthly rate for an instance class in a region
    pub fn monthly(&self, region: &str, class: &str) -> Result<f64, PricingError> {
        Ok(self.hourly(region, class)? * HOURS_PER_MONTH)
    }
}

/// Monthly serverless compute cost from the 30-day capacity-unit average
///
/// An empty capacity series means zero measured capacity, not an error.
pub fn serverless_monthly(mean_capacity_units: f64) -> f64 {
    mean_capacity_units * SERVERLESS_CAPACITY_UNIT_HOURLY * HOURS_PER_MONTH
}
