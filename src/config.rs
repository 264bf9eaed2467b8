use crate::aggregate::DEFAULT_MAX_VOLUME_WIDTH;
use crate::error::ConfigError;
use crate::inventory::GroupBy;
use crate::pareto::{default_metric_sets, InstanceMetric};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub pareto: ParetoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// JSON snapshot read when `--snapshot` is not given
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Outer (team-level) tag first, inner tag second
    pub group_by: Vec<String>,
    pub max_volume_width: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParetoConfig {
    pub region: String,
    pub tenancy: String,
    pub metric_sets: Vec<Vec<InstanceMetric>>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("snapshot.json"),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            group_by: vec!["team".to_string(), "purpose".to_string()],
            max_volume_width: DEFAULT_MAX_VOLUME_WIDTH,
        }
    }
}

impl Default for ParetoConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            tenancy: "default".to_string(),
            metric_sets: default_metric_sets(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .fleetcost.toml in current dir, then ~/.config/fleetcost/config.toml
            let local = PathBuf::from(".fleetcost.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("fleetcost").join("config.toml"))
                    .unwrap_or_else(|| PathBuf::from(".fleetcost.toml"))
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))
                .with_context(|| {
                    let mut err = format!("Failed to parse config: {}", config_path.display());
                    err.push_str("\n  Common issues:");
                    err.push_str("\n    - Invalid TOML syntax");
                    err.push_str("\n    - Unknown metric names in pareto.metric_sets");
                    err.push_str("\n  Tip: Run 'fleetcost init' to create a new config file");
                    err
                })?;
            config.validate()?;
            Ok(config)
        } else {
            if path.is_some() {
                tracing::warn!(
                    path = %config_path.display(),
                    "Config file not found, using defaults. Run 'fleetcost init' to create one."
                );
            }
            Ok(Config::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.group_by()?;
        if self.report.max_volume_width == 0 {
            return Err(ConfigError::InvalidValue {
                field: "report.max_volume_width".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.pareto.metric_sets.iter().any(Vec::is_empty) {
            return Err(ConfigError::InvalidValue {
                field: "pareto.metric_sets".to_string(),
                reason: "metric sets cannot be empty".to_string(),
            });
        }
        if self.pareto.region.is_empty() {
            return Err(ConfigError::MissingField("pareto.region".to_string()));
        }
        Ok(())
    }

    pub fn group_by(&self) -> std::result::Result<GroupBy, ConfigError> {
        GroupBy::try_from(self.report.group_by.clone())
    }
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}
