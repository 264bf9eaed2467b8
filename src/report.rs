//! Report rendering
//!
//! Turns a [`FleetReport`] or a set of Pareto fronts into text tables, JSON
//! or CSV. Nothing here computes costs; it only formats what the aggregator
//! and selector produced.

use crate::aggregate::{CostTotals, FleetReport};
use crate::error::{FleetcostError, Result};
use crate::pareto::ParetoFront;
use crate::pricing::InstanceTypePrice;
use crate::utils::{format_age, format_quantity, format_usd};
use chrono::{DateTime, Utc};
use comfy_table::{Attribute, Cell, CellAlignment, Table};
use console::style;
use std::fmt::Write as _;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = FleetcostError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(FleetcostError::Validation {
                field: "output".to_string(),
                reason: format!("Unsupported output format: {}. Use 'text', 'json' or 'csv'", other),
            }),
        }
    }
}

fn money_cell(amount: f64) -> Cell {
    Cell::new(format_usd(amount)).set_alignment(CellAlignment::Right)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_fleet_report(report: &FleetReport, format: OutputFormat, now: DateTime<Utc>) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => Ok(fleet_csv(report)),
        OutputFormat::Text => Ok(fleet_text(report, now)),
    }
}

fn fleet_text(report: &FleetReport, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    let mut table = Table::new();
    table.set_header(vec![
        report.group_by.outer(),
        report.group_by.inner(),
        "Type",
        "Region",
        "N",
        "Volumes",
        "Compute/mo",
        "Storage/mo",
        "Total/mo",
        "Age",
    ]);

    for group in &report.groups {
        for row in &group.rows {
            table.add_row(vec![
                Cell::new(&row.outer),
                Cell::new(&row.inner),
                Cell::new(&row.instance_type),
                Cell::new(&row.region),
                Cell::new(row.count).set_alignment(CellAlignment::Right),
                Cell::new(&row.volumes),
                money_cell(row.monthly_compute),
                money_cell(row.monthly_volume),
                money_cell(row.monthly_total),
                Cell::new(format_age(row.oldest_launch, now)),
            ]);
        }
        table.add_row(subtotal_row(&group.name, &group.subtotal));
    }

    let _ = writeln!(out, "{table}");
    let _ = writeln!(out);
    write_totals(&mut out, &report.total);

    if !report.skipped.is_empty() {
        let skipped: Vec<String> = report
            .skipped
            .iter()
            .map(|(state, count)| format!("{} {}", count, state))
            .collect();
        let _ = writeln!(out, "Not running (excluded): {}", skipped.join(", "));
    }

    if !report.diagnostics.is_empty() {
        let _ = writeln!(out);
        for diagnostic in &report.diagnostics {
            let _ = writeln!(out, "{} {}", style("WARNING:").yellow().bold(), diagnostic);
        }
    }

    out
}

fn subtotal_row(name: &str, subtotal: &CostTotals) -> Vec<Cell> {
    vec![
        Cell::new(name).add_attribute(Attribute::Bold),
        Cell::new("subtotal").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(subtotal.instances)
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{} GB", subtotal.storage_gb)),
        money_cell(subtotal.monthly_compute).add_attribute(Attribute::Bold),
        money_cell(subtotal.monthly_volume).add_attribute(Attribute::Bold),
        money_cell(subtotal.monthly_total()).add_attribute(Attribute::Bold),
        Cell::new(""),
    ]
}

fn write_totals(out: &mut String, total: &CostTotals) {
    let _ = writeln!(out, "TOTAL ({} running instances):", total.instances);
    let _ = writeln!(out, "  compute:  {}/month", format_usd(total.monthly_compute));
    let _ = writeln!(out, "  storage:  {}/month", format_usd(total.monthly_volume));
    let _ = writeln!(
        out,
        "  total:    {}/month",
        style(format_usd(total.monthly_total())).bold()
    );
    let _ = writeln!(
        out,
        "  capacity: {} vCPU, {} ECU, {} GiB memory, {} GB storage",
        total.vcpus,
        format_quantity(total.ecu),
        format_quantity(total.memory_gib),
        total.storage_gb
    );
}

fn fleet_csv(report: &FleetReport) -> String {
    let mut csv = String::from(
        "outer,inner,instance_type,region,count,volumes,volume_gb,monthly_compute,monthly_volume,monthly_total\n",
    );
    for row in report.rows() {
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{},{:.2},{:.2},{:.2}",
            csv_field(&row.outer),
            csv_field(&row.inner),
            csv_field(&row.instance_type),
            csv_field(&row.region),
            row.count,
            csv_field(&row.volumes),
            row.volume_gb,
            row.monthly_compute,
            row.monthly_volume,
            row.monthly_total
        );
    }
    csv
}

pub fn render_pareto_fronts(fronts: &[ParetoFront], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(fronts)?),
        OutputFormat::Csv => Ok(pareto_csv(fronts)),
        OutputFormat::Text => Ok(pareto_text(fronts)),
    }
}

fn metric_label(front: &ParetoFront) -> String {
    front
        .metrics
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" x ")
}

fn pareto_text(fronts: &[ParetoFront]) -> String {
    let mut out = String::new();
    for front in fronts {
        let _ = writeln!(
            out,
            "{} {} ({}, {} tenancy)",
            style("PARETO FRONT:").cyan().bold(),
            metric_label(front),
            front.region,
            front.tenancy
        );

        let mut table = Table::new();
        let mut header = vec![
            "Type".to_string(),
            "Cost/mo".to_string(),
            "vCPU".to_string(),
            "ECU".to_string(),
            "Memory".to_string(),
        ];
        header.extend(front.metrics.iter().map(|m| m.to_string()));
        table.set_header(header);

        for entry in &front.entries {
            let mut row = vec![
                Cell::new(&entry.instance_type),
                money_cell(entry.monthly_cost),
                Cell::new(entry.vcpu).set_alignment(CellAlignment::Right),
                Cell::new(entry.ecu.map(format_quantity).unwrap_or_else(|| "-".to_string())),
                Cell::new(format!("{} GiB", format_quantity(entry.memory_gib))),
            ];
            row.extend(
                entry
                    .values
                    .iter()
                    .map(|v| Cell::new(format!("{:.2}", v)).set_alignment(CellAlignment::Right)),
            );
            table.add_row(row);
        }
        let _ = writeln!(out, "{table}");
        let _ = writeln!(out);
    }
    out
}

fn pareto_csv(fronts: &[ParetoFront]) -> String {
    let mut csv = String::from("metrics,region,tenancy,instance_type,monthly_cost,vcpu,ecu,memory_gib,values\n");
    for front in fronts {
        let label = front
            .metrics
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join("+");
        for entry in &front.entries {
            let values = entry
                .values
                .iter()
                .map(|v| format!("{:.4}", v))
                .collect::<Vec<_>>()
                .join(";");
            let _ = writeln!(
                csv,
                "{},{},{},{},{:.2},{},{},{},{}",
                label,
                csv_field(&front.region),
                csv_field(&front.tenancy),
                csv_field(&entry.instance_type),
                entry.monthly_cost,
                entry.vcpu,
                entry.ecu.map(|e| e.to_string()).unwrap_or_default(),
                entry.memory_gib,
                values
            );
        }
    }
    csv
}

pub fn render_instance_price(price: &InstanceTypePrice, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(price)?),
        OutputFormat::Csv => Ok(format!(
            "instance_type,region,tenancy,monthly_cost,vcpu,ecu,memory_gib\n{},{},{},{:.2},{},{},{}\n",
            csv_field(&price.instance_type),
            csv_field(&price.region),
            csv_field(&price.tenancy),
            price.monthly_cost,
            price.vcpu,
            price.ecu.map(|e| e.to_string()).unwrap_or_default(),
            price.memory_gib
        )),
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "{} ({}, {})",
                style(&price.instance_type).cyan().bold(),
                price.region,
                price.tenancy
            );
            let _ = writeln!(out, "  monthly:  {}", format_usd(price.monthly_cost));
            let _ = writeln!(out, "  daily:    {}", format_usd(price.daily_cost()));
            let _ = writeln!(
                out,
                "  vcpu:     {} ({} effective ECU)",
                price.vcpu,
                format_quantity(price.effective_ecu())
            );
            let _ = writeln!(out, "  memory:   {} GiB", format_quantity(price.memory_gib));
            if !price.cpu_model.is_empty() {
                let _ = writeln!(out, "  cpu:      {} {}", price.cpu_model, price.clock_speed);
            }
            if !price.network.is_empty() {
                let _ = writeln!(out, "  network:  {}", price.network);
            }
            if let Some(ebs) = &price.dedicated_ebs_throughput {
                let _ = writeln!(out, "  ebs:      {}", ebs);
            }
            if !price.features.is_empty() {
                let _ = writeln!(out, "  features: {}", price.features);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("html".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_csv_field_quotes_when_needed() {
        assert_eq!(csv_field("infra"), "infra");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
