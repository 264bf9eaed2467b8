use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use fleetcost::config::{init_config, Config};
use fleetcost::inventory::GroupBy;
use fleetcost::pareto::{instance_type_front, parse_metric_set, InstanceMetric};
use fleetcost::report::{render_fleet_report, render_instance_price, render_pareto_fronts, OutputFormat};
use fleetcost::snapshot::{FileSnapshotSource, Snapshot, SnapshotSource};
use fleetcost::InventoryAggregator;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fleetcost")]
#[command(
    about = "Monthly cost reports and instance-type analysis for EC2 fleets",
    long_about = "fleetcost reads a snapshot of EC2 prices and inventory and reports what the fleet costs per 30-day month.\n\nSupports:\n  - Cost rows grouped by two tags (e.g. team, purpose)\n  - Per-group subtotals and fleet totals\n  - Pareto fronts of instance types by price/performance\n  - Text, JSON and CSV output"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json, csv)
    #[arg(long, global = true, default_value = "text")]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly cost report grouped by two tags
    Report {
        /// Snapshot JSON file (defaults to snapshot.path from config)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
        /// Tags to group by, outer first (e.g. team,purpose)
        #[arg(long, value_delimiter = ',')]
        group_by: Option<Vec<String>>,
        /// Maximum width of each row's volume summary
        #[arg(long)]
        max_volume_width: Option<usize>,
    },
    /// Pareto-optimal instance types for a region
    Pareto {
        /// Snapshot JSON file (defaults to snapshot.path from config)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        tenancy: Option<String>,
        /// Comma-separated metric set; repeat for several fronts
        /// (compute-per-dollar, memory-per-dollar, ecu, memory, vcpu)
        #[arg(long = "metrics")]
        metrics: Vec<String>,
    },
    /// Monthly price of a single instance type
    Price {
        /// Snapshot JSON file (defaults to snapshot.path from config)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        region: String,
        #[arg(long)]
        instance_type: String,
        #[arg(long, default_value = "default")]
        tenancy: String,
    },
    /// Write a default configuration file
    Init {
        /// Path for the new config file
        #[arg(short, long, default_value = ".fleetcost.toml")]
        path: PathBuf,
    },
}

fn load_snapshot(explicit: Option<PathBuf>, config: &Config) -> Result<Snapshot> {
    let path = explicit.unwrap_or_else(|| config.snapshot.path.clone());
    let source = FileSnapshotSource::new(&path);
    source
        .load()
        .with_context(|| format!("Failed to load snapshot: {}", path.display()))
}

fn run_report(
    snapshot: Option<PathBuf>,
    group_by: Option<Vec<String>>,
    max_volume_width: Option<usize>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    // Tag count is checked before the snapshot is even read
    let group_by = match group_by {
        Some(tags) => GroupBy::try_from(tags)?,
        None => config.group_by()?,
    };
    let snapshot = load_snapshot(snapshot, config)?;

    let report = InventoryAggregator::new(&snapshot, group_by)
        .with_max_volume_width(max_volume_width.unwrap_or(config.report.max_volume_width))
        .aggregate()?;

    print!("{}", render_fleet_report(&report, format, Utc::now())?);
    Ok(())
}

fn run_pareto(
    snapshot: Option<PathBuf>,
    region: Option<String>,
    tenancy: Option<String>,
    metrics: Vec<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let metric_sets: Vec<Vec<InstanceMetric>> = if metrics.is_empty() {
        config.pareto.metric_sets.clone()
    } else {
        metrics
            .iter()
            .map(|raw| parse_metric_set(raw))
            .collect::<fleetcost::Result<_>>()?
    };
    let region = region.unwrap_or_else(|| config.pareto.region.clone());
    let tenancy = tenancy.unwrap_or_else(|| config.pareto.tenancy.clone());
    let snapshot = load_snapshot(snapshot, config)?;

    let fronts = metric_sets
        .iter()
        .map(|set| instance_type_front(&snapshot.pricing, &region, &tenancy, set))
        .collect::<fleetcost::Result<Vec<_>>>()?;

    print!("{}", render_pareto_fronts(&fronts, format)?);
    Ok(())
}

fn run_price(
    snapshot: Option<PathBuf>,
    region: &str,
    instance_type: &str,
    tenancy: &str,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let snapshot = load_snapshot(snapshot, config)?;
    let price = snapshot.pricing.instance_type(region, instance_type, tenancy)?;
    print!("{}", render_instance_price(price, format)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging - only warnings and errors unless --verbose
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let format: OutputFormat = cli.output.parse()?;

    match cli.command {
        Commands::Report {
            snapshot,
            group_by,
            max_volume_width,
        } => run_report(snapshot, group_by, max_volume_width, &config, format)?,
        Commands::Pareto {
            snapshot,
            region,
            tenancy,
            metrics,
        } => run_pareto(snapshot, region, tenancy, metrics, &config, format)?,
        Commands::Price {
            snapshot,
            region,
            instance_type,
            tenancy,
        } => run_price(snapshot, &region, &instance_type, &tenancy, &config, format)?,
        Commands::Init { path } => init_path(&path)?,
    }

    Ok(())
}

fn init_path(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!(
            "Config file already exists: {} (remove it first to regenerate)",
            path.display()
        );
    }
    init_config(path)
}
