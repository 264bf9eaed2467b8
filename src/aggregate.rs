//! Inventory aggregation
//!
//! Groups the instances of a snapshot by two tags, collapses structurally
//! identical instances into counted rows, and prices every row from the
//! catalog. Produces per-row, per-outer-group and fleet-wide monthly totals.
//!
//! Grouping is run-length over a sorted list, so the full instance list is
//! always sorted by the derived key first; equal keys that are not adjacent
//! would otherwise land in separate rows.

use crate::consolidate::consolidate_volumes;
use crate::error::{FleetcostError, Result};
use crate::inventory::{GroupBy, Instance, InstanceState, Volume, VolumeSpec};
use crate::pricing::SHARED_TENANCY;
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;
use tracing::{info, warn};

/// Default display width of a row's volume summary
pub const DEFAULT_MAX_VOLUME_WIDTH: usize = 20;

/// Non-fatal problem found while aggregating
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// An instance references a volume id the snapshot does not contain
    UnresolvedVolume { instance_id: String, volume_id: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnresolvedVolume {
                instance_id,
                volume_id,
            } => write!(
                f,
                "instance {} references unknown volume {}; excluded from its cost",
                instance_id, volume_id
            ),
        }
    }
}

/// Summed monthly cost and capacity of a set of instances
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostTotals {
    pub instances: usize,
    pub monthly_compute: f64,
    pub monthly_volume: f64,
    pub storage_gb: u64,
    /// ECU, with `vCPU * 2` standing in where no rating exists
    pub ecu: f64,
    pub memory_gib: f64,
    pub vcpus: u64,
}

impl CostTotals {
    pub fn monthly_total(&self) -> f64 {
        self.monthly_compute + self.monthly_volume
    }
}

impl AddAssign<&CostTotals> for CostTotals {
    fn add_assign(&mut self, other: &CostTotals) {
        self.instances += other.instances;
        self.monthly_compute += other.monthly_compute;
        self.monthly_volume += other.monthly_volume;
        self.storage_gb += other.storage_gb;
        self.ecu += other.ecu;
        self.memory_gib += other.memory_gib;
        self.vcpus += other.vcpus;
    }
}

/// `count` structurally identical running instances
#[derive(Debug, Clone, Serialize)]
pub struct FleetRow {
    pub outer: String,
    pub inner: String,
    pub state: InstanceState,
    pub instance_type: String,
    pub region: String,
    pub count: usize,
    /// Consolidated summary of one member's volumes
    pub volumes: String,
    /// Per instance
    pub volume_gb: u64,
    /// Per instance
    pub monthly_compute: f64,
    /// Per instance
    pub monthly_volume: f64,
    /// `count * (monthly_compute + monthly_volume)`
    pub monthly_total: f64,
    pub oldest_launch: DateTime<Utc>,
    pub instance_ids: Vec<String>,
    pub totals: CostTotals,
}

/// Rows sharing one outer tag value, with their subtotal
#[derive(Debug, Clone, Serialize)]
pub struct OuterGroup {
    pub name: String,
    pub rows: Vec<FleetRow>,
    pub subtotal: CostTotals,
}

/// Aggregated monthly cost of a fleet
#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
    pub group_by: GroupBy,
    pub captured_at: Option<DateTime<Utc>>,
    pub groups: Vec<OuterGroup>,
    pub total: CostTotals,
    /// Non-running instances left out of the totals, by state
    pub skipped: BTreeMap<InstanceState, usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FleetReport {
    pub fn rows(&self) -> impl Iterator<Item = &FleetRow> {
        self.groups.iter().flat_map(|g| g.rows.iter())
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Everything that decides whether two instances share a row
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    outer: String,
    inner: String,
    state: InstanceState,
    instance_type: String,
    region: String,
    volume_specs: Vec<VolumeSpec>,
}

struct ResolvedInstance<'s> {
    key: GroupKey,
    instance: &'s Instance,
    volumes: Vec<&'s Volume>,
}

/// Builds a [`FleetReport`] from a snapshot
pub struct InventoryAggregator<'s> {
    snapshot: &'s Snapshot,
    group_by: GroupBy,
    max_volume_width: usize,
}

impl<'s> InventoryAggregator<'s> {
    pub fn new(snapshot: &'s Snapshot, group_by: GroupBy) -> Self {
        Self {
            snapshot,
            group_by,
            max_volume_width: DEFAULT_MAX_VOLUME_WIDTH,
        }
    }

    /// Like `new`, but validates a raw tag-name list first
    pub fn from_tag_names(snapshot: &'s Snapshot, tag_names: Vec<String>) -> Result<Self> {
        let group_by = GroupBy::try_from(tag_names)?;
        Ok(Self::new(snapshot, group_by))
    }

    pub fn with_max_volume_width(mut self, width: usize) -> Self {
        self.max_volume_width = width;
        self
    }

    /// Aggregate every instance in the snapshot
    pub fn aggregate(&self) -> Result<FleetReport> {
        self.aggregate_instances(&self.snapshot.instances)
    }

    /// Aggregate a subset of instances against the snapshot's prices and volumes
    pub fn aggregate_instances(&self, instances: &'s [Instance]) -> Result<FleetReport> {
        let mut diagnostics = Vec::new();
        let mut skipped = BTreeMap::new();
        let mut resolved = Vec::with_capacity(instances.len());
        for instance in instances {
            // non-running instances never reach zone or price lookups
            if !instance.state.is_running() {
                *skipped.entry(instance.state).or_insert(0) += 1;
                continue;
            }
            resolved.push(self.resolve(instance, &mut diagnostics)?);
        }

        resolved.sort_by(|a, b| {
            a.key
                .cmp(&b.key)
                .then_with(|| a.instance.instance_id.cmp(&b.instance.instance_id))
        });

        let mut report = FleetReport {
            group_by: self.group_by.clone(),
            captured_at: self.snapshot.captured_at,
            groups: Vec::new(),
            total: CostTotals::default(),
            skipped,
            diagnostics,
        };

        for outer_run in resolved.chunk_by(|a, b| a.key.outer == b.key.outer) {
            let mut group = OuterGroup {
                name: outer_run[0].key.outer.clone(),
                rows: Vec::new(),
                subtotal: CostTotals::default(),
            };

            for members in outer_run.chunk_by(|a, b| a.key == b.key) {
                let row = self.price_row(members)?;
                group.subtotal += &row.totals;
                group.rows.push(row);
            }

            report.total += &group.subtotal;
            report.groups.push(group);
        }

        info!(
            groups = report.groups.len(),
            instances = report.total.instances,
            skipped = report.skipped_count(),
            monthly_total = report.total.monthly_total(),
            "Aggregated fleet"
        );
        Ok(report)
    }

    fn resolve(
        &self,
        instance: &'s Instance,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<ResolvedInstance<'s>> {
        let (outer, inner) = instance.grouping(&self.group_by);
        let region = self.snapshot.region_for_zone(&instance.availability_zone)?;

        let mut volumes = Vec::with_capacity(instance.volume_ids.len());
        for volume_id in &instance.volume_ids {
            match self.snapshot.volumes.get(volume_id) {
                Some(volume) => volumes.push(volume),
                None => {
                    warn!(
                        instance_id = %instance.instance_id,
                        volume_id = %volume_id,
                        "Unknown volume id, excluding from instance cost"
                    );
                    diagnostics.push(Diagnostic::UnresolvedVolume {
                        instance_id: instance.instance_id.clone(),
                        volume_id: volume_id.clone(),
                    });
                }
            }
        }
        volumes.sort_by_cached_key(|v| v.spec());

        Ok(ResolvedInstance {
            key: GroupKey {
                outer,
                inner,
                state: instance.state,
                instance_type: instance.instance_type.clone(),
                region,
                volume_specs: volumes.iter().map(|v| v.spec()).collect(),
            },
            instance,
            volumes,
        })
    }

    fn price_row(&self, members: &[ResolvedInstance<'s>]) -> Result<FleetRow> {
        let first = &members[0];
        let key = &first.key;
        let pricing = &self.snapshot.pricing;
        let n = members.len();

        // rows are priced at on-demand shared tenancy whatever the instance reports
        let price = pricing.instance_type(&key.region, &key.instance_type, SHARED_TENANCY)?;

        // members share volume specs, so the first member's volumes price them all
        let priced_volumes = first
            .volumes
            .iter()
            .map(|v| {
                let cost =
                    pricing.monthly_volume_cost(&key.region, &v.volume_type, v.size_gb, v.iops)?;
                Ok::<_, FleetcostError>((*v, cost))
            })
            .collect::<Result<Vec<(&Volume, f64)>>>()?;

        let monthly_volume: f64 = priced_volumes.iter().map(|(_, cost)| cost).sum();
        let volume_gb: u64 = first.volumes.iter().map(|v| v.size_gb).sum();
        let scale = n as f64;

        let totals = CostTotals {
            instances: n,
            monthly_compute: scale * price.monthly_cost,
            monthly_volume: scale * monthly_volume,
            storage_gb: n as u64 * volume_gb,
            ecu: scale * price.effective_ecu(),
            memory_gib: scale * price.memory_gib,
            vcpus: n as u64 * u64::from(price.vcpu),
        };

        Ok(FleetRow {
            outer: key.outer.clone(),
            inner: key.inner.clone(),
            state: key.state,
            instance_type: key.instance_type.clone(),
            region: key.region.clone(),
            count: n,
            volumes: consolidate_volumes(&priced_volumes, self.max_volume_width),
            volume_gb,
            monthly_compute: price.monthly_cost,
            monthly_volume,
            monthly_total: scale * (price.monthly_cost + monthly_volume),
            oldest_launch: members
                .iter()
                .map(|m| m.instance.launch_time)
                .min()
                .unwrap_or(first.instance.launch_time),
            instance_ids: members
                .iter()
                .map(|m| m.instance.instance_id.clone())
                .collect(),
            totals,
        })
    }
}
