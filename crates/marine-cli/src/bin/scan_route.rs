//! Scan one voyage for wave and depth hazards and print the result as JSON.

use clap::Parser;
use marine_cli::{init_logging, load_hazards, load_json};
use marine_core::{PathData, RouteScanner, ScanSettings};
use serde_json::json;
use std::path::PathBuf;

/// Scan a route against a hazard snapshot
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file with route, ship and departure time
    #[arg(long)]
    path: PathBuf,

    /// JSON hazard snapshot (forecasts, depth soundings, optional depth grid)
    #[arg(long)]
    hazards: Option<PathBuf>,

    /// Coarse sampling step in meters
    #[arg(long, default_value_t = 10_000.0)]
    sample_step_m: f64,

    /// Minimum distance between reported hazards of one kind; 0 keeps all
    #[arg(long, default_value_t = 10_000.0)]
    separation_m: f64,

    /// Print the rendered diagnostic instead of JSON
    #[arg(long)]
    text: bool,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let path: PathData = load_json(&args.path)?;
    let hazards = load_hazards(args.hazards.as_deref())?;
    let settings = ScanSettings {
        sample_step_m: args.sample_step_m,
        hazard_separation_m: (args.separation_m > 0.0).then_some(args.separation_m),
        ..ScanSettings::default()
    };

    let report = RouteScanner::new(hazards, settings).scan(&path)?;
    if args.text {
        println!("{}", report.diagnostic);
    } else {
        let output = json!({
            "diagnostic": report.diagnostic,
            "message": report.diagnostic.to_string(),
            "samples": report.samples,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}
