//! Pricing catalog
//!
//! Indexes EC2 instance, EBS volume and provisioned-IOPS prices by region,
//! tenancy and type, and answers monthly-cost lookups.
//!
//! All monthly figures use a fixed 30-day month: hourly prices are multiplied
//! by `24 * 30`, not by a calendar-average month length.

use crate::error::{FleetcostError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Hours in the fixed 30-day billing month
pub const HOURS_PER_MONTH: f64 = 24.0 * 30.0;

/// Days in the fixed billing month
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Canonical catalog key for shared-hardware tenancy
pub const SHARED_TENANCY: &str = "Shared";

/// Convert an hourly price to the fixed 30-day monthly price
pub fn hourly_to_monthly(hourly: f64) -> f64 {
    hourly * 24.0 * DAYS_PER_MONTH
}

/// Map an EC2 API tenancy value onto the pricing catalog's key
///
/// The EC2 API reports `default`/`dedicated`/`host` while the price list uses
/// `Shared`/`Dedicated`/`Host`. Anything else passes through untouched.
pub fn canonical_tenancy(tenancy: &str) -> &str {
    match tenancy {
        "default" => SHARED_TENANCY,
        "dedicated" => "Dedicated",
        "host" => "Host",
        other => other,
    }
}

/// Price and hardware description of one instance type in one region/tenancy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceTypePrice {
    pub instance_type: String,
    pub region: String,
    pub tenancy: String,
    /// USD per 30-day month
    pub monthly_cost: f64,
    pub memory_gib: f64,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub dedicated_ebs_throughput: Option<String>,
    #[serde(default)]
    pub ecu: Option<f64>,
    pub vcpu: u32,
    #[serde(default)]
    pub cpu_model: String,
    #[serde(default)]
    pub clock_speed: String,
    #[serde(default)]
    pub features: String,
}

impl InstanceTypePrice {
    pub fn daily_cost(&self) -> f64 {
        self.monthly_cost / DAYS_PER_MONTH
    }

    /// ECU rating, or `vCPU * 2` for families that publish no ECU figure
    pub fn effective_ecu(&self) -> f64 {
        self.ecu.unwrap_or(f64::from(self.vcpu) * 2.0)
    }

    pub fn memory_per_dollar_per_day(&self) -> f64 {
        self.memory_gib / self.daily_cost()
    }

    /// Only defined when the price list publishes an ECU rating
    pub fn ecu_per_dollar_per_day(&self) -> Option<f64> {
        self.ecu.map(|ecu| ecu / self.daily_cost())
    }

    /// Like `ecu_per_dollar_per_day`, but with the vCPU fallback applied
    pub fn compute_per_dollar_per_day(&self) -> f64 {
        self.effective_ecu() / self.daily_cost()
    }
}

/// Storage price of one EBS volume type in one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeTypePrice {
    pub volume_type: String,
    pub monthly_cost_per_gb: f64,
    #[serde(default)]
    pub max_size_gb: Option<u64>,
    /// MiB/s
    #[serde(default)]
    pub max_throughput: Option<f64>,
    #[serde(default)]
    pub max_iops: Option<u64>,
}

/// One product line from the price list, before it is indexed
///
/// Mirrors the shape of an AWS Price List product: a product family, a bag of
/// string attributes, and one on-demand price dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPriceRecord {
    pub region: String,
    pub product_family: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub price_per_unit: f64,
    pub unit: String,
}

impl RawPriceRecord {
    fn attr(&self, name: &str) -> Result<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| FleetcostError::validation(name, "attribute missing from price record"))
    }

    fn optional_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty() && !matches!(*v, "NA" | "N/A" | "Variable"))
    }

    fn expect_unit(&self, unit: &str) -> Result<()> {
        if self.unit != unit {
            return Err(FleetcostError::validation(
                "unit",
                format!(
                    "{} record priced per '{}', expected '{}'",
                    self.product_family, self.unit, unit
                ),
            ));
        }
        Ok(())
    }
}

/// region -> tenancy -> instance type
pub type InstanceTypeIndex = BTreeMap<String, BTreeMap<String, BTreeMap<String, InstanceTypePrice>>>;

/// region -> volume type
pub type VolumeTypeIndex = BTreeMap<String, BTreeMap<String, VolumeTypePrice>>;

/// region -> volume type -> USD per provisioned IOPS per month
pub type IopsPriceIndex = BTreeMap<String, BTreeMap<String, f64>>;

/// Price lookups for compute, storage and provisioned IOPS
///
/// Entries are unique per (region, tenancy, type). The catalog is built once
/// from a snapshot and only read afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingCatalog {
    #[serde(default)]
    pub instance_types: InstanceTypeIndex,
    #[serde(default)]
    pub volume_types: VolumeTypeIndex,
    #[serde(default)]
    pub iops_prices: IopsPriceIndex,
}

impl PricingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from flat price-list records
    ///
    /// Compute records are hourly and get converted to 30-day months; storage
    /// and IOPS records are already monthly. Families the catalog does not
    /// model are skipped.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = RawPriceRecord>,
    {
        let mut catalog = Self::new();
        for record in records {
            match record.product_family.as_str() {
                "Compute Instance" => {
                    let price = parse_instance_record(&record)?;
                    catalog.insert_instance_type(price)?;
                }
                "Storage" => {
                    let price = parse_volume_record(&record)?;
                    catalog.insert_volume_type(&record.region, price)?;
                }
                "System Operation" => {
                    record.expect_unit("IOPS-Mo")?;
                    let volume_type = record.attr("volumeApiName")?.to_string();
                    catalog.insert_iops_price(&record.region, &volume_type, record.price_per_unit)?;
                }
                other => {
                    debug!(family = other, region = %record.region, "Skipping unmodelled price record");
                }
            }
        }
        Ok(catalog)
    }

    pub fn insert_instance_type(&mut self, price: InstanceTypePrice) -> Result<()> {
        let tenancy = canonical_tenancy(&price.tenancy).to_string();
        let slot = self
            .instance_types
            .entry(price.region.clone())
            .or_default()
            .entry(tenancy.clone())
            .or_default();
        if slot.contains_key(&price.instance_type) {
            return Err(FleetcostError::validation(
                "instance_type",
                format!(
                    "duplicate price for {}/{}/{}",
                    price.region, tenancy, price.instance_type
                ),
            ));
        }
        slot.insert(price.instance_type.clone(), InstanceTypePrice { tenancy, ..price });
        Ok(())
    }

    pub fn insert_volume_type(&mut self, region: &str, price: VolumeTypePrice) -> Result<()> {
        let slot = self.volume_types.entry(region.to_string()).or_default();
        if slot.contains_key(&price.volume_type) {
            return Err(FleetcostError::validation(
                "volume_type",
                format!("duplicate price for {}/{}", region, price.volume_type),
            ));
        }
        slot.insert(price.volume_type.clone(), price);
        Ok(())
    }

    pub fn insert_iops_price(&mut self, region: &str, volume_type: &str, monthly_per_iops: f64) -> Result<()> {
        let slot = self.iops_prices.entry(region.to_string()).or_default();
        if slot.contains_key(volume_type) {
            return Err(FleetcostError::validation(
                "volume_type",
                format!("duplicate IOPS price for {}/{}", region, volume_type),
            ));
        }
        slot.insert(volume_type.to_string(), monthly_per_iops);
        Ok(())
    }

    /// Full price entry for an instance type
    ///
    /// A missing entry means the snapshot is stale or incomplete, so this
    /// fails with `NotFound` rather than guessing.
    pub fn instance_type(
        &self,
        region: &str,
        instance_type: &str,
        tenancy: &str,
    ) -> Result<&InstanceTypePrice> {
        let tenancy = canonical_tenancy(tenancy);
        self.instance_types
            .get(region)
            .and_then(|by_tenancy| by_tenancy.get(tenancy))
            .and_then(|by_type| by_type.get(instance_type))
            .ok_or_else(|| {
                FleetcostError::not_found(
                    "instance type price",
                    format!("{}/{}/{}", region, tenancy, instance_type),
                )
            })
    }

    pub fn monthly_compute_cost(&self, region: &str, instance_type: &str, tenancy: &str) -> Result<f64> {
        Ok(self.instance_type(region, instance_type, tenancy)?.monthly_cost)
    }

    pub fn volume_type(&self, region: &str, volume_type: &str) -> Result<&VolumeTypePrice> {
        self.volume_types
            .get(region)
            .and_then(|by_type| by_type.get(volume_type))
            .ok_or_else(|| {
                FleetcostError::not_found("volume type price", format!("{}/{}", region, volume_type))
            })
    }

    pub fn monthly_storage_cost(&self, region: &str, volume_type: &str, size_gb: u64) -> Result<f64> {
        Ok(self.volume_type(region, volume_type)?.monthly_cost_per_gb * size_gb as f64)
    }

    /// Provisioned IOPS charge; zero for types without an IOPS price (gp2, sc1, st1)
    pub fn monthly_iops_cost(&self, region: &str, volume_type: &str, iops: Option<u64>) -> f64 {
        let iops = match iops {
            Some(iops) if iops > 0 => iops,
            _ => return 0.0,
        };
        self.iops_prices
            .get(region)
            .and_then(|by_type| by_type.get(volume_type))
            .map(|per_iops| per_iops * iops as f64)
            .unwrap_or(0.0)
    }

    pub fn monthly_volume_cost(
        &self,
        region: &str,
        volume_type: &str,
        size_gb: u64,
        iops: Option<u64>,
    ) -> Result<f64> {
        let storage = self.monthly_storage_cost(region, volume_type, size_gb)?;
        Ok(storage + self.monthly_iops_cost(region, volume_type, iops))
    }

    /// All instance types priced for one region and tenancy
    pub fn instance_types_in<'a>(
        &'a self,
        region: &str,
        tenancy: &str,
    ) -> impl Iterator<Item = &'a InstanceTypePrice> + 'a {
        self.instance_types
            .get(region)
            .and_then(|by_tenancy| by_tenancy.get(canonical_tenancy(tenancy)))
            .into_iter()
            .flat_map(|by_type| by_type.values())
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.instance_types.keys().map(String::as_str)
    }
}

fn quantity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([0-9][0-9,]*(?:\.[0-9]+)?)\s*([A-Za-z/]*)\s*$").expect("static regex")
    })
}

/// Split a price-list quantity such as `"1,952 GiB"` into number and unit
pub fn parse_quantity(field: &str, raw: &str) -> Result<(f64, String)> {
    let caps = quantity_regex()
        .captures(raw)
        .ok_or_else(|| FleetcostError::validation(field, format!("not a quantity: '{}'", raw)))?;
    let number: f64 = caps[1]
        .replace(',', "")
        .parse()
        .map_err(|_| FleetcostError::validation(field, format!("not a number: '{}'", raw)))?;
    Ok((number, caps[2].to_string()))
}

fn parse_size_gb(field: &str, raw: &str) -> Result<u64> {
    let (number, unit) = parse_quantity(field, raw)?;
    let gb = match unit.as_str() {
        "TiB" | "TB" => number * 1024.0,
        "GiB" | "GB" | "" => number,
        other => {
            return Err(FleetcostError::validation(field, format!("unknown size unit '{}'", other)));
        }
    };
    Ok(gb.round() as u64)
}

fn parse_instance_record(record: &RawPriceRecord) -> Result<InstanceTypePrice> {
    record.expect_unit("Hrs")?;
    let (memory_gib, _) = parse_quantity("memory", record.attr("memory")?)?;
    let vcpu = record
        .attr("vcpu")?
        .trim()
        .parse::<u32>()
        .map_err(|_| FleetcostError::validation("vcpu", "not an integer"))?;
    let ecu = record
        .optional_attr("ecu")
        .map(|raw| parse_quantity("ecu", raw).map(|(n, _)| n))
        .transpose()?;

    Ok(InstanceTypePrice {
        instance_type: record.attr("instanceType")?.to_string(),
        region: record.region.clone(),
        tenancy: record.attr("tenancy")?.to_string(),
        monthly_cost: hourly_to_monthly(record.price_per_unit),
        memory_gib,
        network: record.optional_attr("networkPerformance").unwrap_or_default().to_string(),
        dedicated_ebs_throughput: record.optional_attr("dedicatedEbsThroughput").map(str::to_string),
        ecu,
        vcpu,
        cpu_model: record.optional_attr("physicalProcessor").unwrap_or_default().to_string(),
        clock_speed: record.optional_attr("clockSpeed").unwrap_or_default().to_string(),
        features: record.optional_attr("processorFeatures").unwrap_or_default().to_string(),
    })
}

fn parse_volume_record(record: &RawPriceRecord) -> Result<VolumeTypePrice> {
    record.expect_unit("GB-Mo")?;
    Ok(VolumeTypePrice {
        volume_type: record.attr("volumeApiName")?.to_string(),
        monthly_cost_per_gb: record.price_per_unit,
        max_size_gb: record
            .optional_attr("maxVolumeSize")
            .map(|raw| parse_size_gb("maxVolumeSize", raw))
            .transpose()?,
        max_throughput: record
            .optional_attr("maxThroughputvolume")
            .map(|raw| parse_quantity("maxThroughputvolume", raw).map(|(n, _)| n))
            .transpose()?,
        max_iops: record
            .optional_attr("maxIopsvolume")
            .map(|raw| parse_quantity("maxIopsvolume", raw).map(|(n, _)| n as u64))
            .transpose()?,
    })
}
