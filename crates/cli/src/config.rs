//! CLI configuration

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use sweep_lib::ScanConfig;

/// Scanner tuning knobs, layered from SWEEP_* environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Regions evaluated concurrently
    #[serde(default = "default_max_concurrent_regions")]
    pub max_concurrent_regions: usize,

    /// Deadline per classification or savings computation, in seconds
    #[serde(default = "default_evaluation_timeout_secs")]
    pub evaluation_timeout_secs: u64,
}

fn default_max_concurrent_regions() -> usize {
    4
}

fn default_evaluation_timeout_secs() -> u64 {
    30
}

impl SweepConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("SWEEP"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| SweepConfig {
            max_concurrent_regions: default_max_concurrent_regions(),
            evaluation_timeout_secs: default_evaluation_timeout_secs(),
        }))
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            max_concurrent_regions: self.max_concurrent_regions,
            evaluation_timeout: Duration::from_secs(self.evaluation_timeout_secs),
        }
    }
}
