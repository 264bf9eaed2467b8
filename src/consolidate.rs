//! Volume list consolidation
//!
//! Compresses the volumes attached to one report row into a short summary
//! such as `2× 100G+500G@4000+3 more`, bounded to a display width.

use crate::inventory::Volume;
use std::collections::HashMap;

/// Volume type whose provisioned IOPS is part of its identity in summaries
const IOPS_KEYED_TYPE: &str = "io1";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConsolidationKey {
    volume_type: String,
    size_gb: u64,
    iops: Option<u64>,
}

impl ConsolidationKey {
    fn of(volume: &Volume) -> Self {
        let iops = if volume.volume_type == IOPS_KEYED_TYPE {
            volume.iops
        } else {
            None
        };
        Self {
            volume_type: volume.volume_type.clone(),
            size_gb: volume.size_gb,
            iops,
        }
    }
}

#[derive(Debug)]
struct VolumeGroup {
    key: ConsolidationKey,
    count: usize,
    monthly_cost: f64,
}

impl VolumeGroup {
    fn token(&self) -> String {
        let mut token = if self.count > 1 {
            format!("{}× {}G", self.count, self.key.size_gb)
        } else {
            format!("{}G", self.key.size_gb)
        };
        if let Some(iops) = self.key.iops {
            token.push_str(&format!("@{}", iops));
        }
        token
    }
}

/// Summarize `(volume, monthly cost)` pairs within `max_strlen` characters
///
/// Groups are ordered by descending total cost, ties keeping input order.
/// When the next token would not leave room for a `"N more"` marker, the
/// marker is emitted instead, unless that token is the last one and fits.
pub fn consolidate_volumes(volumes: &[(&Volume, f64)], max_strlen: usize) -> String {
    let mut groups: Vec<VolumeGroup> = Vec::new();
    let mut index: HashMap<ConsolidationKey, usize> = HashMap::new();

    for (volume, cost) in volumes {
        let key = ConsolidationKey::of(volume);
        match index.get(&key) {
            Some(&i) => {
                groups[i].count += 1;
                groups[i].monthly_cost += cost;
            }
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(VolumeGroup {
                    key,
                    count: 1,
                    monthly_cost: *cost,
                });
            }
        }
    }

    // sort_by is stable, so equal costs keep first-seen order
    groups.sort_by(|a, b| b.monthly_cost.total_cmp(&a.monthly_cost));

    let total = groups.len();
    let mut out = String::new();
    let mut width = 0usize;

    for (i, group) in groups.iter().enumerate() {
        let token = group.token();
        let separator = usize::from(width > 0);
        let needed = width + separator + token.chars().count();
        let remaining = total - i;
        let marker = format!("{} more", remaining);
        let reserve = marker.chars().count() + 1;

        if needed + reserve > max_strlen && !(remaining == 1 && needed <= max_strlen) {
            if width > 0 {
                out.push('+');
            }
            out.push_str(&marker);
            break;
        }

        if separator == 1 {
            out.push('+');
        }
        out.push_str(&token);
        width = needed;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::VolumeState;

    fn volume(id: &str, volume_type: &str, size_gb: u64, iops: Option<u64>) -> Volume {
        Volume {
            volume_id: id.to_string(),
            state: VolumeState::InUse,
            volume_type: volume_type.to_string(),
            size_gb,
            iops,
        }
    }

    #[test]
    fn test_single_volume() {
        let v = volume("vol-1", "gp3", 100, Some(3000));
        assert_eq!(consolidate_volumes(&[(&v, 8.0)], 40), "100G");
    }

    #[test]
    fn test_empty() {
        assert_eq!(consolidate_volumes(&[], 40), "");
    }

    #[test]
    fn test_counts_identical_volumes() {
        let a = volume("vol-1", "gp2", 50, Some(150));
        let b = volume("vol-2", "gp2", 50, Some(150));
        assert_eq!(consolidate_volumes(&[(&a, 5.0), (&b, 5.0)], 40), "2× 50G");
    }

    #[test]
    fn test_iops_only_keys_io1() {
        let a = volume("vol-1", "io1", 100, Some(4000));
        let b = volume("vol-2", "io1", 100, Some(2000));
        let c = volume("vol-3", "gp3", 100, Some(4000));
        let d = volume("vol-4", "gp3", 100, Some(6000));
        let summary = consolidate_volumes(&[(&a, 300.0), (&b, 200.0), (&c, 8.0), (&d, 8.0)], 80);
        assert_eq!(summary, "100G@4000+100G@2000+2× 100G");
    }

    #[test]
    fn test_orders_by_cost_then_input_order() {
        let small = volume("vol-1", "gp3", 10, None);
        let big = volume("vol-2", "gp3", 1000, None);
        let tie = volume("vol-3", "st1", 20, None);
        let summary = consolidate_volumes(&[(&small, 1.0), (&big, 80.0), (&tie, 1.0)], 80);
        assert_eq!(summary, "1000G+10G+20G");
    }

    #[test]
    fn test_truncates_with_marker() {
        let vols: Vec<Volume> = (0..5)
            .map(|i| volume(&format!("vol-{}", i), "gp3", 100 * (i + 1), None))
            .collect();
        let priced: Vec<(&Volume, f64)> = vols.iter().map(|v| (v, v.size_gb as f64)).collect();
        // tokens by cost: 500G 400G 300G 200G 100G
        let summary = consolidate_volumes(&priced, 16);
        assert_eq!(summary, "500G+400G+3 more");
        assert!(summary.chars().count() <= 16);
    }

    #[test]
    fn test_last_token_replaces_marker_when_it_fits() {
        let a = volume("vol-1", "gp3", 500, None);
        let b = volume("vol-2", "gp3", 40, None);
        // "500G+40G" plus room for "+1 more" exceeds 12, but the real token fits
        assert_eq!(consolidate_volumes(&[(&a, 40.0), (&b, 3.0)], 12), "500G+40G");
    }

    #[test]
    fn test_marker_only_when_nothing_fits() {
        let a = volume("vol-1", "gp3", 500, None);
        let b = volume("vol-2", "gp3", 400, None);
        assert_eq!(consolidate_volumes(&[(&a, 40.0), (&b, 32.0)], 3), "2 more");
    }
}
