//! Property-based tests for volume consolidation
//!
//! The summary must respect its width budget (allowing one trailing
//! "N more" marker) and must account for every volume it was given.

use fleetcost::consolidate::consolidate_volumes;
use fleetcost::inventory::{Volume, VolumeState};
use proptest::prelude::*;

fn volume_strategy() -> impl Strategy<Value = (Volume, f64)> {
    (
        prop::sample::select(vec!["gp2", "gp3", "io1", "st1", "sc1"]),
        prop::sample::select(vec![8u64, 20, 100, 500, 1000, 16384]),
        prop::option::of(prop::sample::select(vec![100u64, 3000, 4000, 64000])),
        0.0f64..500.0,
    )
        .prop_map(|(volume_type, size_gb, iops, cost)| {
            (
                Volume {
                    volume_id: "vol-x".to_string(),
                    state: VolumeState::InUse,
                    volume_type: volume_type.to_string(),
                    size_gb,
                    iops,
                },
                cost,
            )
        })
}

/// Sum of the counts a summary mentions, including the "N more" groups
fn groups_mentioned(summary: &str) -> usize {
    if summary.is_empty() {
        return 0;
    }
    summary
        .split('+')
        .map(|token| {
            if let Some(n) = token.strip_suffix(" more") {
                n.parse::<usize>().unwrap()
            } else {
                1
            }
        })
        .sum()
}

proptest! {
    #[test]
    fn test_summary_respects_budget(
        volumes in prop::collection::vec(volume_strategy(), 0..30),
        max_strlen in 0usize..60,
    ) {
        let priced: Vec<(&Volume, f64)> = volumes.iter().map(|(v, c)| (v, *c)).collect();
        let summary = consolidate_volumes(&priced, max_strlen);

        let marker_len = format!("{} more", volumes.len()).chars().count();
        prop_assert!(
            summary.chars().count() <= max_strlen + marker_len,
            "'{}' is longer than {} + {}",
            summary,
            max_strlen,
            marker_len
        );
    }

    #[test]
    fn test_summary_accounts_for_every_group(
        volumes in prop::collection::vec(volume_strategy(), 1..30),
        max_strlen in 0usize..60,
    ) {
        let priced: Vec<(&Volume, f64)> = volumes.iter().map(|(v, c)| (v, *c)).collect();
        let summary = consolidate_volumes(&priced, max_strlen);

        let mut keys: Vec<(String, u64, Option<u64>)> = volumes
            .iter()
            .map(|(v, _)| {
                let iops = if v.volume_type == "io1" { v.iops } else { None };
                (v.volume_type.clone(), v.size_gb, iops)
            })
            .collect();
        keys.sort();
        keys.dedup();

        prop_assert_eq!(groups_mentioned(&summary), keys.len());
    }

    #[test]
    fn test_wide_budget_never_truncates(volumes in prop::collection::vec(volume_strategy(), 0..10)) {
        let priced: Vec<(&Volume, f64)> = volumes.iter().map(|(v, c)| (v, *c)).collect();
        let summary = consolidate_volumes(&priced, 1_000);
        prop_assert!(!summary.contains("more"));
    }
}
