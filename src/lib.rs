//! fleetcost library
//!
//! Monthly cost reports for an EC2 fleet snapshot, grouped by two tags, and
//! Pareto analysis of instance types by price/performance.

pub mod aggregate;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod inventory;
pub mod pareto;
pub mod pricing;
pub mod report;
pub mod snapshot;
pub mod utils;

// Re-export commonly used types
pub use aggregate::{FleetReport, InventoryAggregator};
pub use error::{FleetcostError, Result};
pub use inventory::{GroupBy, Instance, InstanceState, Volume};
pub use pricing::PricingCatalog;
pub use snapshot::{FileSnapshotSource, Snapshot, SnapshotSource};
