//! Snapshot input
//!
//! A snapshot is the frozen, already-fetched view of prices and inventory
//! that every report is computed from. Retrieval from the cloud APIs happens
//! elsewhere; this module only loads and validates the result.

use crate::error::{FleetcostError, Result};
use crate::inventory::{Instance, Volume};
use crate::pricing::PricingCatalog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prices, zone map and inventory captured at one point in time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub pricing: PricingCatalog,
    #[serde(default)]
    pub zone_to_region: BTreeMap<String, String>,
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub volumes: BTreeMap<String, Volume>,
}

impl Snapshot {
    pub fn from_json(content: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(content)?;
        snapshot.check_volume_keys()?;
        Ok(snapshot)
    }

    /// Region of an availability zone
    ///
    /// Zones missing from the map fall back to the zone name minus its
    /// trailing letter (`us-east-1a` -> `us-east-1`).
    pub fn region_for_zone(&self, zone: &str) -> Result<String> {
        if let Some(region) = self.zone_to_region.get(zone) {
            return Ok(region.clone());
        }
        let trimmed = zone.trim_end_matches(|c: char| c.is_ascii_lowercase());
        if trimmed.len() < zone.len() && trimmed.ends_with(|c: char| c.is_ascii_digit()) {
            debug!(zone, region = trimmed, "Zone not in snapshot map, derived region from name");
            return Ok(trimmed.to_string());
        }
        Err(FleetcostError::not_found("availability zone", zone))
    }

    fn check_volume_keys(&self) -> Result<()> {
        for (key, volume) in &self.volumes {
            if key != &volume.volume_id {
                return Err(FleetcostError::Snapshot(format!(
                    "volume map key '{}' does not match volume id '{}'",
                    key, volume.volume_id
                )));
            }
        }
        Ok(())
    }
}

/// Anything that can hand the core a materialized snapshot
pub trait SnapshotSource {
    fn load(&self) -> Result<Snapshot>;
}

/// Snapshot stored as a JSON file on disk
#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn load(&self) -> Result<Snapshot> {
        let content = std::fs::read_to_string(&self.path)?;
        let snapshot = Snapshot::from_json(&content)?;
        info!(
            path = %self.path.display(),
            instances = snapshot.instances.len(),
            volumes = snapshot.volumes.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }
}

/// Snapshot already held in memory
impl SnapshotSource for Snapshot {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.clone())
    }
}
