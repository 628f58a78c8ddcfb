#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for siting-risk screening.
//!
//! Loads a target geometry, permit records, reference layers and a DEM
//! from disk (or a URL for the DEM), runs the analysis, and prints the
//! result as JSON.

mod analyze;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Screen a proposed site against permits, sensitive areas, zoning layers
/// and terrain.
#[derive(Parser)]
#[command(name = "siting_cli")]
#[command(about = "Siting-risk screening of a single target geometry")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Analyse one target geometry and print the result as JSON.
    Analyze(AnalyzeArgs),

    /// Print the built-in layer configuration as TOML.
    DefaultConfig,
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// `GeoJSON` file holding the target (geometry, feature, or collection).
    target: PathBuf,

    /// Feature index when the target file is a feature collection.
    #[arg(long)]
    feature: Option<usize>,

    /// JSON file holding an array of permit records.
    #[arg(long)]
    records: Option<PathBuf>,

    /// Directory of `<layer name>.geojson` reference layers.
    #[arg(long)]
    layers: Option<PathBuf>,

    /// Elevation model: a `GeoTIFF` path or an HTTP(S) URL.
    #[arg(long)]
    dem: String,

    /// TOML configuration file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Buffer radius for permit records, meters.
    #[arg(long)]
    record_radius: Option<f64>,

    /// Buffer radius for sensitive areas, meters.
    #[arg(long)]
    area_radius: Option<f64>,

    /// Keep only records with this determination status.
    #[arg(long)]
    status: Option<String>,

    /// Keep only records determined on or after this date (YYYY-MM-DD).
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Keep only records determined on or before this date (YYYY-MM-DD).
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Seed for polygon grid downsampling.
    #[arg(long)]
    seed: Option<u64>,

    /// Write the result here instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => analyze::run(args).await?,
        Commands::DefaultConfig => {
            let layers = siting_analysis::config::default_layers();
            println!("{}", analyze::layers_toml(&layers)?);
        }
    }

    Ok(())
}
