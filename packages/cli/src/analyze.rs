//! The `analyze` subcommand: loads inputs from disk and prints the
//! analysis result.

use std::path::{Path, PathBuf};

use siting_analysis::{AnalysisInputs, config, run_analysis};
use siting_analysis_models::{AnalysisConfig, LayerConfig, Record};
use siting_geometry::{GeometryError, TargetGeometry};
use siting_raster::{DemProvider, loader::for_location};
use siting_spatial::{LayerCatalog, LayerError};
use thiserror::Error;

use crate::AnalyzeArgs;

/// Errors that can occur while preparing or writing an analysis.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// An input file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The target file does not hold a usable geometry.
    #[error("Invalid target geometry: {0}")]
    Target(#[from] GeometryError),

    /// The records file is not a JSON array of objects.
    #[error("Invalid records file {path}: {source}")]
    Records {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A reference layer could not be loaded.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    /// The result could not be serialized.
    #[error("Failed to serialize result: {0}")]
    Json(#[from] serde_json::Error),

    /// The layer configuration could not be rendered as TOML.
    #[error("Failed to render config: {0}")]
    Toml(#[from] toml::ser::Error),

    /// The result could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn read_text(path: &Path) -> Result<String, AnalyzeError> {
    std::fs::read_to_string(path).map_err(|source| AnalyzeError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_records(path: &Path) -> Result<Vec<Record>, AnalyzeError> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|source| AnalyzeError::Records {
        path: path.to_path_buf(),
        source,
    })
}

/// Builds the run configuration: the config file (or built-in defaults)
/// with any flags layered on top.
fn build_config(args: &AnalyzeArgs) -> Result<AnalysisConfig, AnalyzeError> {
    let mut cfg = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::default_config(),
    };

    if let Some(radius) = args.record_radius {
        cfg.record_radius_m = radius;
    }
    if let Some(radius) = args.area_radius {
        cfg.area_radius_m = radius;
    }
    if let Some(status) = &args.status {
        cfg.filters.status = Some(status.clone());
    }
    if args.start_date.is_some() {
        cfg.filters.start_date = args.start_date;
    }
    if args.end_date.is_some() {
        cfg.filters.end_date = args.end_date;
    }
    if let Some(seed) = args.seed {
        cfg.sampling_seed = seed;
    }

    Ok(config::normalize(cfg))
}

/// Renders a layer configuration as TOML.
///
/// # Errors
///
/// Returns [`AnalyzeError::Toml`] if serialization fails.
pub fn layers_toml(layers: &LayerConfig) -> Result<String, AnalyzeError> {
    Ok(toml::to_string(layers)?)
}

/// Runs the `analyze` subcommand.
///
/// # Errors
///
/// Returns [`AnalyzeError`] if an input cannot be loaded or the result
/// cannot be written. Elevation failures are reported inside the result.
pub async fn run(args: AnalyzeArgs) -> Result<(), AnalyzeError> {
    let cfg = build_config(&args)?;

    let target = TargetGeometry::from_geojson_str(&read_text(&args.target)?, args.feature)?;
    log::info!("Target: {} from {}", target.kind(), args.target.display());

    let records = match &args.records {
        Some(path) => load_records(path)?,
        None => Vec::new(),
    };
    let layers = match &args.layers {
        Some(dir) => LayerCatalog::load_dir(dir)?,
        None => {
            log::warn!("No layer directory given; every configured layer will be unavailable");
            LayerCatalog::new()
        }
    };
    log::info!("Loaded {} records and {} layers", records.len(), layers.len());

    let dem = DemProvider::from_boxed(for_location(&args.dem));

    let result = run_analysis(
        &target,
        AnalysisInputs {
            records: &records,
            layers: &layers,
        },
        &cfg,
        &dem,
    )
    .await;

    let json = serde_json::to_string_pretty(&result)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).map_err(|source| AnalyzeError::Write {
                path: path.clone(),
                source,
            })?;
            log::info!("Wrote result to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
