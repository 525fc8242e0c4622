//! balloon-sim CLI
//!
//! Simulates a fleet of balloons drifting through a wind field and reports
//! coverage statistics.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use sl_sim::{
    fleet_to_geojson, write_geojson, CoverageAnalyzer, Fleet, Interpolation, SyntheticWind,
    TrackStyle, WindField,
};
use tracing::Level;

#[derive(Parser)]
#[command(name = "balloon-sim")]
#[command(about = "Stratospheric balloon trajectory and coverage simulation")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: Level,
}

#[derive(Subcommand)]
enum Command {
    /// Run a fleet simulation
    Simulate(SimulateArgs),
}

#[derive(ClapArgs)]
struct SimulateArgs {
    /// Directory holding uwnd*.json and vwnd*.json files
    #[arg(long, conflicts_with = "synthetic_seed")]
    wind_dir: Option<PathBuf>,

    /// Seed for a synthetic wind field, used when no wind directory is given
    #[arg(long, default_value_t = 42)]
    synthetic_seed: u64,

    /// Pressure level in hPa
    #[arg(long, default_value_t = sl_sim::constants::DEFAULT_PRESSURE_LEVEL)]
    pressure_level: u32,

    #[arg(long, value_enum, default_value = "step")]
    interpolation: InterpolationArg,

    /// Number of randomly placed balloons
    #[arg(long, default_value_t = 10)]
    balloons: usize,

    #[arg(long, default_value_t = -60.0, allow_hyphen_values = true)]
    lat_min: f64,

    #[arg(long, default_value_t = 60.0, allow_hyphen_values = true)]
    lat_max: f64,

    #[arg(long, default_value_t = -180.0, allow_hyphen_values = true)]
    lon_min: f64,

    #[arg(long, default_value_t = 180.0, allow_hyphen_values = true)]
    lon_max: f64,

    /// Seed for balloon placement
    #[arg(long)]
    seed: Option<u64>,

    /// Place balloons on a grid with this spacing in degrees instead
    #[arg(long)]
    grid_spacing: Option<f64>,

    /// Simulation length in hours
    #[arg(long, default_value_t = 48)]
    steps: u32,

    #[arg(long, default_value_t = sl_sim::constants::DEFAULT_COVERAGE_RADIUS_KM)]
    coverage_radius_km: f64,

    /// GeoJSON output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write plain line strings instead of animated trips
    #[arg(long)]
    static_lines: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum InterpolationArg {
    Step,
    Linear,
}

impl From<InterpolationArg> for Interpolation {
    fn from(arg: InterpolationArg) -> Self {
        match arg {
            InterpolationArg::Step => Interpolation::Step,
            InterpolationArg::Linear => Interpolation::Linear,
        }
    }
}

fn simulate(args: SimulateArgs) -> sl_sim::Result<()> {
    let interpolation = Interpolation::from(args.interpolation);
    let wind = match &args.wind_dir {
        Some(dir) => {
            tracing::debug!("Loading wind data from {:?}", dir);
            WindField::load_dir(dir, args.pressure_level, interpolation)?
        }
        None => {
            tracing::debug!("Generating synthetic wind with seed {}", args.synthetic_seed);
            WindField::synthetic(&SyntheticWind {
                seed: args.synthetic_seed,
                ..Default::default()
            })
            .with_interpolation(interpolation)
        }
    };

    let lat_range = (args.lat_min, args.lat_max);
    let lon_range = (args.lon_min, args.lon_max);
    let mut fleet = match args.grid_spacing {
        Some(spacing) => Fleet::create_grid(lat_range, lon_range, spacing, spacing)?,
        None => Fleet::create_random(args.balloons, lat_range, lon_range, args.seed),
    };

    tracing::info!(
        "Simulating {} balloons for {} hours",
        fleet.len(),
        args.steps
    );
    fleet.simulate(&wind, args.steps, None)?;

    let analyzer = CoverageAnalyzer::new(args.coverage_radius_km, 180, 360);
    let final_grid = fleet.compute_coverage(&analyzer, Some(args.steps as usize))?;
    let cumulative = fleet.compute_coverage(&analyzer, None)?;
    let stats = analyzer.statistics(&final_grid);
    tracing::info!(
        "Final coverage: {:.2}% ({} of {} cells)",
        stats.coverage_percentage,
        stats.covered_cells,
        stats.total_cells
    );
    tracing::info!(
        "Cumulative coverage: {:.2}%",
        analyzer.coverage_fraction(&cumulative) * 100.0
    );

    if let Some(output) = &args.output {
        let style = if args.static_lines {
            TrackStyle::Lines
        } else {
            TrackStyle::Trips
        };
        write_geojson(output, &fleet_to_geojson(&fleet, style)?)?;
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    match args.command {
        Command::Simulate(simulate_args) => simulate(simulate_args)?,
    }

    Ok(())
}
