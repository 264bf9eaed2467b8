//! Pareto-front selection
//!
//! Picks the candidates that no other candidate beats on every metric at
//! once. The generic [`select`] works over any keyed items; the
//! [`instance_type_front`] helper applies it to one region/tenancy slice of
//! the pricing catalog.

use crate::error::{FleetcostError, Result};
use crate::pricing::{canonical_tenancy, InstanceTypePrice, PricingCatalog};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// `a` dominates `b` when it is at least as good everywhere and not identical
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a != b && a.iter().zip(b).all(|(x, y)| x >= y)
}

/// Non-dominated subset of `items` under `metric`
///
/// Quadratic scan over one working list. For each pivot `j`, every later
/// entry it dominates is removed in place; an entry that dominates the pivot
/// is swapped into the pivot slot and the scan restarts from the pivot.
/// Identical vectors do not dominate each other, so duplicates all survive.
///
/// Panics if the result still contains a dominated pair, which would be a bug
/// in the scan rather than a property of the input.
pub fn select<K, T, F>(items: impl IntoIterator<Item = (K, T)>, metric: F) -> Vec<(K, T)>
where
    F: Fn(&T) -> Vec<f64>,
{
    let mut work: Vec<(K, T, Vec<f64>)> = items
        .into_iter()
        .map(|(key, item)| {
            let values = metric(&item);
            (key, item, values)
        })
        .collect();

    let mut j = 0;
    while j < work.len() {
        let mut i = j;
        while i < work.len() {
            if dominates(&work[j].2, &work[i].2) {
                work.remove(i);
            } else if dominates(&work[i].2, &work[j].2) {
                work.swap(i, j);
                i = j;
            } else {
                i += 1;
            }
        }
        j += 1;
    }

    assert_non_dominated(&work);
    work.into_iter().map(|(key, item, _)| (key, item)).collect()
}

fn assert_non_dominated<K, T>(front: &[(K, T, Vec<f64>)]) {
    for (a, (_, _, va)) in front.iter().enumerate() {
        for (b, (_, _, vb)) in front.iter().enumerate() {
            assert!(
                a == b || !dominates(va, vb),
                "Pareto front contains dominated entry at {} (dominated by {})",
                b,
                a
            );
        }
    }
}

/// Per-instance-type figure a front can be computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceMetric {
    /// Effective ECU per dollar per day
    ComputePerDollar,
    /// GiB per dollar per day
    MemoryPerDollar,
    /// Effective ECU
    Ecu,
    /// GiB
    Memory,
    Vcpu,
}

impl InstanceMetric {
    pub const ALL: [InstanceMetric; 5] = [
        InstanceMetric::ComputePerDollar,
        InstanceMetric::MemoryPerDollar,
        InstanceMetric::Ecu,
        InstanceMetric::Memory,
        InstanceMetric::Vcpu,
    ];

    pub fn value(&self, price: &InstanceTypePrice) -> f64 {
        match self {
            InstanceMetric::ComputePerDollar => price.compute_per_dollar_per_day(),
            InstanceMetric::MemoryPerDollar => price.memory_per_dollar_per_day(),
            InstanceMetric::Ecu => price.effective_ecu(),
            InstanceMetric::Memory => price.memory_gib,
            InstanceMetric::Vcpu => f64::from(price.vcpu),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceMetric::ComputePerDollar => "compute-per-dollar",
            InstanceMetric::MemoryPerDollar => "memory-per-dollar",
            InstanceMetric::Ecu => "ecu",
            InstanceMetric::Memory => "memory",
            InstanceMetric::Vcpu => "vcpu",
        }
    }
}

impl fmt::Display for InstanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceMetric {
    type Err = FleetcostError;

    fn from_str(s: &str) -> Result<Self> {
        InstanceMetric::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| {
                FleetcostError::validation(
                    "metric",
                    format!(
                        "unknown metric '{}', expected one of: {}",
                        s,
                        InstanceMetric::ALL.map(|m| m.as_str()).join(", ")
                    ),
                )
            })
    }
}

/// Parse a comma-separated metric list such as `ecu,memory-per-dollar`
pub fn parse_metric_set(raw: &str) -> Result<Vec<InstanceMetric>> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Metric sets reported when none are configured
pub fn default_metric_sets() -> Vec<Vec<InstanceMetric>> {
    use InstanceMetric::*;
    vec![
        vec![ComputePerDollar, MemoryPerDollar],
        vec![Ecu, MemoryPerDollar],
        vec![ComputePerDollar, Memory],
        vec![Ecu, Memory],
    ]
}

/// One surviving instance type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoEntry {
    pub instance_type: String,
    pub monthly_cost: f64,
    pub vcpu: u32,
    pub memory_gib: f64,
    pub ecu: Option<f64>,
    /// Values in the same order as the front's metrics
    pub values: Vec<f64>,
}

/// Pareto-optimal instance types of one region/tenancy under one metric set
#[derive(Debug, Clone, Serialize)]
pub struct ParetoFront {
    pub region: String,
    pub tenancy: String,
    pub metrics: Vec<InstanceMetric>,
    pub entries: Vec<ParetoEntry>,
}

/// Compute the instance-type front for one region and tenancy
///
/// Entries come back cheapest first.
pub fn instance_type_front(
    catalog: &PricingCatalog,
    region: &str,
    tenancy: &str,
    metrics: &[InstanceMetric],
) -> Result<ParetoFront> {
    if metrics.is_empty() {
        return Err(FleetcostError::validation("metrics", "at least one metric is required"));
    }

    let candidates: Vec<(&str, &InstanceTypePrice)> = catalog
        .instance_types_in(region, tenancy)
        .map(|price| (price.instance_type.as_str(), price))
        .collect();
    if candidates.is_empty() {
        return Err(FleetcostError::not_found(
            "instance type prices",
            format!("{}/{}", region, canonical_tenancy(tenancy)),
        ));
    }
    let candidate_count = candidates.len();

    let front = select(candidates, |price| metrics.iter().map(|m| m.value(price)).collect());
    debug!(
        region,
        candidates = candidate_count,
        survivors = front.len(),
        "Computed instance type front"
    );

    let mut entries: Vec<ParetoEntry> = front
        .into_iter()
        .map(|(instance_type, price)| ParetoEntry {
            instance_type: instance_type.to_string(),
            monthly_cost: price.monthly_cost,
            vcpu: price.vcpu,
            memory_gib: price.memory_gib,
            ecu: price.ecu,
            values: metrics.iter().map(|m| m.value(price)).collect(),
        })
        .collect();
    entries.sort_by(|a, b| {
        a.monthly_cost
            .total_cmp(&b.monthly_cost)
            .then_with(|| a.instance_type.cmp(&b.instance_type))
    });

    Ok(ParetoFront {
        region: region.to_string(),
        tenancy: canonical_tenancy(tenancy).to_string(),
        metrics: metrics.to_vec(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<T>(front: &[(&'static str, T)]) -> Vec<&'static str> {
        let mut keys: Vec<_> = front.iter().map(|(k, _)| *k).collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_dominates() {
        assert!(dominates(&[10.0, 5.0], &[5.0, 5.0]));
        assert!(!dominates(&[5.0, 5.0], &[10.0, 5.0]));
        assert!(!dominates(&[10.0, 5.0], &[5.0, 10.0]));
        assert!(!dominates(&[3.0, 3.0], &[3.0, 3.0]));
        assert!(!dominates(&[3.0], &[1.0, 1.0]));
    }

    #[test]
    fn test_select_drops_point_dominated_by_both() {
        let items = vec![("A", vec![10.0, 5.0]), ("B", vec![5.0, 10.0]), ("C", vec![5.0, 5.0])];
        let front = select(items, |v| v.clone());
        assert_eq!(keys(&front), vec!["A", "B"]);
    }

    #[test]
    fn test_select_promotes_dominating_entry_to_pivot() {
        // the first pivot is dominated by a later entry and must be swapped out
        let items = vec![
            ("weak", vec![1.0, 1.0]),
            ("mid", vec![2.0, 0.5]),
            ("strong", vec![3.0, 3.0]),
            ("tall", vec![0.0, 4.0]),
        ];
        let front = select(items, |v| v.clone());
        assert_eq!(keys(&front), vec!["strong", "tall"]);
    }

    #[test]
    fn test_select_keeps_duplicates() {
        let items = vec![("x", vec![2.0, 2.0]), ("y", vec![2.0, 2.0]), ("z", vec![1.0, 1.0])];
        let front = select(items, |v| v.clone());
        assert_eq!(keys(&front), vec!["x", "y"]);
    }

    #[test]
    fn test_select_preserves_payload() {
        let items = vec![("a", ("payload-a", 1.0)), ("b", ("payload-b", 2.0))];
        let front = select(items, |(_, score)| vec![*score]);
        assert_eq!(front, vec![("b", ("payload-b", 2.0))]);
    }

    #[test]
    fn test_select_empty() {
        let items: Vec<(&str, Vec<f64>)> = vec![];
        assert!(select(items, |v| v.clone()).is_empty());
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!(
            parse_metric_set("ecu, memory-per-dollar").unwrap(),
            vec![InstanceMetric::Ecu, InstanceMetric::MemoryPerDollar]
        );
        assert!(parse_metric_set("ecu,speed").is_err());
        for metric in InstanceMetric::ALL {
            assert_eq!(metric.to_string().parse::<InstanceMetric>().unwrap(), metric);
        }
    }

    #[test]
    fn test_instance_type_front_requires_metrics() {
        let catalog = PricingCatalog::new();
        assert!(matches!(
            instance_type_front(&catalog, "us-east-1", "default", &[]),
            Err(FleetcostError::Validation { .. })
        ));
        assert!(matches!(
            instance_type_front(&catalog, "us-east-1", "default", &[InstanceMetric::Ecu]),
            Err(FleetcostError::NotFound { .. })
        ));
    }
}
