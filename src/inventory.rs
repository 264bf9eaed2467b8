//! Inventory records
//!
//! Instances and volumes as they appear in a snapshot, plus the tag
//! projection used to group instances.

use crate::error::{ConfigError, FleetcostError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value used when an instance lacks one of the grouping tags
pub const MISSING_TAG: &str = "???";

/// EC2 instance lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    #[serde(alias = "shutting-down")]
    ShuttingDown,
    Terminated,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::ShuttingDown => "shutting_down",
            InstanceState::Terminated => "terminated",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, InstanceState::Running)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceState {
    type Err = FleetcostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InstanceState::Pending),
            "running" => Ok(InstanceState::Running),
            "stopping" => Ok(InstanceState::Stopping),
            "stopped" => Ok(InstanceState::Stopped),
            "shutting_down" | "shutting-down" => Ok(InstanceState::ShuttingDown),
            "terminated" => Ok(InstanceState::Terminated),
            other => Err(FleetcostError::Validation {
                field: "state".to_string(),
                reason: format!("unknown instance state '{}'", other),
            }),
        }
    }
}

/// EBS volume state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeState {
    Creating,
    Available,
    InUse,
    Deleting,
    Deleted,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

fn default_tenancy() -> String {
    "default".to_string()
}

/// One EC2 instance from the inventory snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub instance_id: String,
    pub state: InstanceState,
    pub instance_type: String,
    pub availability_zone: String,
    #[serde(default = "default_tenancy")]
    pub tenancy: String,
    #[serde(default)]
    pub volume_ids: Vec<String>,
    pub launch_time: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Instance {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// Project the instance onto the two grouping tag values
    pub fn grouping(&self, group_by: &GroupBy) -> (String, String) {
        let value = |key: &str| self.tag(key).unwrap_or(MISSING_TAG).to_string();
        (value(group_by.outer()), value(group_by.inner()))
    }
}

/// One EBS volume from the inventory snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub volume_id: String,
    pub state: VolumeState,
    pub volume_type: String,
    pub size_gb: u64,
    #[serde(default)]
    pub iops: Option<u64>,
}

impl Volume {
    /// The volume with its id erased
    pub fn spec(&self) -> VolumeSpec {
        VolumeSpec {
            volume_type: self.volume_type.clone(),
            size_gb: self.size_gb,
            iops: self.iops,
        }
    }
}

/// Structural shape of a volume, used to decide whether two instances are alike
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub volume_type: String,
    pub size_gb: u64,
    pub iops: Option<u64>,
}

/// The two tag names an inventory is grouped by: outer (team-level) first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct GroupBy([String; 2]);

impl GroupBy {
    pub fn new(outer: impl Into<String>, inner: impl Into<String>) -> Self {
        Self([outer.into(), inner.into()])
    }

    pub fn outer(&self) -> &str {
        &self.0[0]
    }

    pub fn inner(&self) -> &str {
        &self.0[1]
    }
}

impl TryFrom<Vec<String>> for GroupBy {
    type Error = ConfigError;

    fn try_from(tags: Vec<String>) -> Result<Self, Self::Error> {
        let got = tags.len();
        let [outer, inner]: [String; 2] = tags
            .try_into()
            .map_err(|_| ConfigError::GroupingTagCount { got })?;
        Ok(Self([outer, inner]))
    }
}

impl From<GroupBy> for Vec<String> {
    fn from(group_by: GroupBy) -> Self {
        group_by.0.into()
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.outer(), self.inner())
    }
}
