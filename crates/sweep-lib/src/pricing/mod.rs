//! Pricing model
//!
//! Pure, deterministic cost functions. Tiered block-storage classes live in
//! [`storage`], the region/class compute table in [`compute`]; flat-rate
//! resources are priced here. All rates are monthly USD unless noted.

pub mod compute;
pub mod storage;

pub use compute::{ComputePricing, SERVERLESS_CAPACITY_UNIT_HOURLY};
pub use storage::{recommend_storage_class, storage_cost, StorageClass};

/// Billing month used by the flat hourly rates
pub const HOURS_PER_MONTH: f64 = 24.0 * 30.0;

/// Billing month used by table-store capacity pricing
pub const TABLE_STORE_BILLING_HOURS: f64 = 730.0;

const FLOATING_IP_HOURLY: f64 = 0.005;
const LOAD_BALANCER_HOURLY: f64 = 0.0252;
const NAT_GATEWAY_HOURLY: f64 = 0.048;

const FILESYSTEM_STANDARD_GIB_MONTHLY: f64 = 0.33;
const FILESYSTEM_INFREQUENT_GIB_MONTHLY: f64 = 0.025;

const TABLE_STORE_STORAGE_GB_MONTHLY: f64 = 0.25;
const TABLE_STORE_PROVISIONED_UNIT_HOURLY: f64 = 0.0065;
const TABLE_STORE_ON_DEMAND_READ_UNIT: f64 = 0.000_000_25;
const TABLE_STORE_ON_DEMAND_WRITE_UNIT: f64 = 0.000_001_25;

const DB_SNAPSHOT_GIB_MONTHLY: f64 = 0.095;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Monthly cost of holding one floating IP allocation
pub fn floating_ip_monthly() -> f64 {
    FLOATING_IP_HOURLY * HOURS_PER_MONTH
}

/// Monthly base cost of one load balancer (capacity units excluded)
pub fn load_balancer_monthly() -> f64 {
    LOAD_BALANCER_HOURLY * HOURS_PER_MONTH
}

/// Monthly base cost of one NAT gateway (data processing excluded)
pub fn nat_gateway_monthly() -> f64 {
    NAT_GATEWAY_HOURLY * HOURS_PER_MONTH
}

/// Monthly cost of a shared filesystem from its per-tier sizes
pub fn filesystem_monthly(standard_bytes: u64, infrequent_access_bytes: u64) -> f64 {
    standard_bytes as f64 / BYTES_PER_GIB * FILESYSTEM_STANDARD_GIB_MONTHLY
        + infrequent_access_bytes as f64 / BYTES_PER_GIB * FILESYSTEM_INFREQUENT_GIB_MONTHLY
}

/// Monthly storage cost of a table-store table
pub fn table_store_storage_monthly(size_bytes: u64) -> f64 {
    size_bytes as f64 / BYTES_PER_GIB * TABLE_STORE_STORAGE_GB_MONTHLY
}

/// Monthly cost of provisioned table-store capacity
pub fn table_store_provisioned_monthly(read_units: u64, write_units: u64) -> f64 {
    (read_units + write_units) as f64 * TABLE_STORE_PROVISIONED_UNIT_HOURLY
        * TABLE_STORE_BILLING_HOURS
}

/// Monthly on-demand table-store request cost from hourly consumption
/// averages
pub fn table_store_on_demand_monthly(read_units_per_hour: f64, write_units_per_hour: f64) -> f64 {
    read_units_per_hour * TABLE_STORE_ON_DEMAND_READ_UNIT * TABLE_STORE_BILLING_HOURS * 3600.0
        + write_units_per_hour
            * TABLE_STORE_ON_DEMAND_WRITE_UNIT
            * TABLE_STORE_BILLING_HOURS
            * 3600.0
}

/// Monthly storage cost of a DB snapshot
pub fn db_snapshot_monthly(allocated_gib: u64) -> f64 {
    allocated_gib as f64 * DB_SNAPSHOT_GIB_MONTHLY
}
