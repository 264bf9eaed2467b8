//! Tests for report rendering
//!
//! Renders the fixture snapshot in every output format and checks the
//! parts a reader relies on: totals, rows, and warnings.

use chrono::{TimeZone, Utc};
use fleetcost::aggregate::InventoryAggregator;
use fleetcost::inventory::GroupBy;
use fleetcost::pareto::{default_metric_sets, instance_type_front};
use fleetcost::report::{render_fleet_report, render_instance_price, render_pareto_fronts, OutputFormat};
use fleetcost::snapshot::Snapshot;

const FIXTURE: &str = include_str!("fixtures/snapshot.json");

fn fixture_report() -> (Snapshot, fleetcost::FleetReport) {
    let snapshot = Snapshot::from_json(FIXTURE).unwrap();
    let report = InventoryAggregator::new(&snapshot, GroupBy::new("team", "purpose"))
        .aggregate()
        .unwrap();
    (snapshot, report)
}

#[test]
fn test_json_report_is_valid_json() {
    let (_, report) = fixture_report();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let json = render_fleet_report(&report, OutputFormat::Json, now).unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["group_by"], serde_json::json!(["team", "purpose"]));
    assert_eq!(value["groups"].as_array().unwrap().len(), 4);
    assert_eq!(value["skipped"]["stopped"], 1);
    assert_eq!(value["diagnostics"][0]["kind"], "unresolved_volume");
    assert_eq!(value["diagnostics"][0]["volume_id"], "vol-gone");
}

#[test]
fn test_csv_report_has_one_line_per_row() {
    let (_, report) = fixture_report();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let csv = render_fleet_report(&report, OutputFormat::Csv, now).unwrap();

    let lines: Vec<_> = csv.lines().collect();
    assert!(lines[0].starts_with("outer,inner,instance_type"));
    assert_eq!(lines.len(), 1 + report.rows().count());
    assert!(lines.iter().any(|l| l.starts_with("infra,build,m5.large,us-east-1,1,100G,100,70.00,8.00,78.00")));
}

#[test]
fn test_text_report_mentions_totals_and_warnings() {
    let (_, report) = fixture_report();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let text = render_fleet_report(&report, OutputFormat::Text, now).unwrap();

    assert!(text.contains("team"));
    assert!(text.contains("subtotal"));
    assert!(text.contains("$780.47"));
    assert!(text.contains("1 stopped"));
    assert!(text.contains("vol-gone"));
    // i-build1 launched 2024-04-01, 30 days before `now`
    assert!(text.contains("30d 0h"));
}

#[test]
fn test_pareto_rendering() {
    let (snapshot, _) = fixture_report();
    let fronts = default_metric_sets()
        .iter()
        .map(|set| instance_type_front(&snapshot.pricing, "us-east-1", "default", set))
        .collect::<fleetcost::Result<Vec<_>>>()
        .unwrap();

    let text = render_pareto_fronts(&fronts, OutputFormat::Text).unwrap();
    assert!(text.contains("compute-per-dollar x memory-per-dollar"));
    assert!(text.contains("r5.large"));

    let json = render_pareto_fronts(&fronts, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value.as_array().unwrap().len(), fronts.len());
    assert_eq!(value[1]["metrics"], serde_json::json!(["ecu", "memory-per-dollar"]));

    let csv = render_pareto_fronts(&fronts, OutputFormat::Csv).unwrap();
    let rows: usize = fronts.iter().map(|f| f.entries.len()).sum();
    assert_eq!(csv.lines().count(), 1 + rows);
}

#[test]
fn test_instance_price_rendering() {
    let (snapshot, _) = fixture_report();
    let price = snapshot
        .pricing
        .instance_type("us-east-1", "m5.large", "default")
        .unwrap();

    let text = render_instance_price(price, OutputFormat::Text).unwrap();
    assert!(text.contains("$70.00"));
    assert!(text.contains("Intel Xeon Platinum 8175"));

    let json = render_instance_price(price, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["monthly_cost"], 70.0);
}
