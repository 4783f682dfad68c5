//! Search the least-time route inside a bounding polygon and print it as JSON.

use clap::Parser;
use marine_cli::{init_logging, load_hazards, load_json};
use marine_core::{BestRouteInput, BestRouteMaker, GridLimits, RouterSettings};
use std::path::PathBuf;

/// Find the best route between two points
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file with a single-segment route, bounds, ship and departure time
    #[arg(long)]
    input: PathBuf,

    /// JSON hazard snapshot (forecasts, depth soundings, optional depth grid)
    #[arg(long)]
    hazards: Option<PathBuf>,

    /// Lattice step in degrees
    #[arg(long, default_value_t = 0.1)]
    grid_step_deg: f64,

    /// Maximum number of lattice points
    #[arg(long, default_value_t = 10_000)]
    max_vertices: u64,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let input: BestRouteInput = load_json(&args.input)?;
    let hazards = load_hazards(args.hazards.as_deref())?;
    let settings = RouterSettings {
        grid_step_deg: args.grid_step_deg,
        limits: GridLimits {
            max_vertices: args.max_vertices,
            ..GridLimits::default()
        },
        ..RouterSettings::default()
    };

    let result = BestRouteMaker::new(hazards, settings).make_best_route(&input)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
