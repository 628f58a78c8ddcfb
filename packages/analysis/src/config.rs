//! Analysis configuration.
//!
//! The default layer roles are baked into the binary at compile time via
//! [`include_str!`]; a full [`AnalysisConfig`] can also be read from a
//! TOML file, in which case any section it omits keeps its default.

use std::path::Path;

use siting_analysis_models::{AnalysisConfig, LayerConfig};
use siting_geometry::ops::normalize_radius;
use thiserror::Error;

/// Default layer roles, embedded at compile time.
const DEFAULT_LAYERS_TOML: &str = include_str!("../config/layers.toml");

/// Number of sensitive-area layers in the default configuration.
#[cfg(test)]
const EXPECTED_SENSITIVE_AREA_COUNT: usize = 5;

/// Number of attribute groups in the default configuration.
#[cfg(test)]
const EXPECTED_ATTRIBUTE_GROUP_COUNT: usize = 7;

/// Default buffer radius for both record and sensitive-area proximity.
pub const DEFAULT_RADIUS_M: f64 = 1000.0;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for [`AnalysisConfig`].
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Returns the built-in layer roles.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (a compile-time guarantee
/// since the file is embedded).
#[must_use]
pub fn default_layers() -> LayerConfig {
    toml::de::from_str(DEFAULT_LAYERS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse layers.toml: {e}"))
}

/// Returns the built-in configuration: default layer roles, 1 km radii,
/// no filters and seed 0.
#[must_use]
pub fn default_config() -> AnalysisConfig {
    AnalysisConfig {
        record_radius_m: DEFAULT_RADIUS_M,
        area_radius_m: DEFAULT_RADIUS_M,
        filters: siting_analysis_models::RecordFilters::default(),
        record_fields: siting_analysis_models::RecordFieldConfig::default(),
        layers: default_layers(),
        sampling_seed: 0,
    }
}

/// Parses a configuration from TOML.
///
/// Layer roles fall back to the built-in set when the document names
/// neither sensitive areas nor attribute groups. Radii are normalised.
///
/// # Errors
///
/// Returns [`ConfigError::Toml`] if the document is malformed.
pub fn parse_config(toml_str: &str) -> Result<AnalysisConfig, ConfigError> {
    let mut config: AnalysisConfig = toml::de::from_str(toml_str)?;
    if config.layers == LayerConfig::default() {
        config.layers = default_layers();
    }
    Ok(normalize(config))
}

/// Reads and parses a configuration file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<AnalysisConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config = parse_config(&text)?;
    log::debug!(
        "Loaded config from {}: {} sensitive layers, {} attribute groups",
        path.display(),
        config.layers.sensitive_areas.len(),
        config.layers.attribute_groups.len()
    );
    Ok(config)
}

/// Clamps both radii to non-negative finite values.
#[must_use]
pub fn normalize(mut config: AnalysisConfig) -> AnalysisConfig {
    config.record_radius_m = normalize_radius(config.record_radius_m);
    config.area_radius_m = normalize_radius(config.area_radius_m);
    config
}
