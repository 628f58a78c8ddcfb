#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result and configuration types for siting-risk screening.
//!
//! An [`AnalysisResult`] is the single record handed to presentation and
//! export collaborators after one analysis run. Everything in it is plain
//! data: rows of pre-formatted key/value strings plus optional chart
//! series, so consumers never need to re-derive numbers.
//!
//! [`AnalysisConfig`] is the per-run configuration (buffer radii, record
//! filters, layer groupings), deserializable from TOML.

pub mod format;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A permit record exactly as supplied by the caller.
///
/// The engine never reshapes records; matched records are returned with
/// every original field intact.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The three geometry families the engine distinguishes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum GeometryKind {
    /// A single position.
    Point,
    /// A line string (multi-part lines are flattened).
    Line,
    /// A polygon or multi-polygon.
    Polygon,
}

/// A labelled, pre-formatted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Row label (e.g. "Total Length").
    pub key: String,
    /// Display value (e.g. "1.20 km (1,204 m)"), or "—" when unavailable.
    pub value: String,
}

impl MetricRow {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Measurements of the target geometry itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryMetrics {
    /// Which geometry family the rows describe.
    pub kind: GeometryKind,
    /// Type-specific rows (coordinates, length, area, perimeter).
    pub rows: Vec<MetricRow>,
}

/// How far a sensitive area is from the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AreaDistance {
    /// The area touches or overlaps the raw target geometry.
    WithinBoundaries,
    /// Nearest-edge distance in meters.
    Meters(f64),
    /// The area is inside the buffer but no distance could be derived.
    Unavailable,
    /// The configured layer was not supplied for this run.
    LayerUnavailable,
}

impl AreaDistance {
    /// Returns the distance in meters, when one was computed.
    #[must_use]
    pub const fn meters(self) -> Option<f64> {
        match self {
            Self::Meters(m) => Some(m),
            Self::WithinBoundaries | Self::Unavailable | Self::LayerUnavailable => None,
        }
    }
}

impl std::fmt::Display for AreaDistance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WithinBoundaries => write!(f, "within boundaries"),
            Self::Meters(m) => write!(f, "{} m", m.round()),
            Self::Unavailable => write!(f, "distance unavailable"),
            Self::LayerUnavailable => write!(f, "layer unavailable"),
        }
    }
}

/// A sensitive area that touches or lies near the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityRow {
    /// Area label (layer name, optionally suffixed with the feature name).
    pub label: String,
    /// Display distance: "within boundaries", "N m", or an unavailable marker.
    pub distance: String,
    /// Numeric distance in meters, when one was computed.
    pub distance_m: Option<f64>,
}

impl ProximityRow {
    #[must_use]
    pub fn new(label: impl Into<String>, distance: AreaDistance) -> Self {
        Self {
            label: label.into(),
            distance: distance.to_string(),
            distance_m: distance.meters().map(f64::round),
        }
    }
}

/// Distinct attribute values of one configured layer group that
/// intersect the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionRow {
    /// Group name (e.g. "Watershed").
    pub group: String,
    /// Comma-joined distinct values, "None" when nothing intersects, or
    /// "Layer unavailable" when no layer of the group was supplied.
    pub values: String,
    /// Layers of this group that were not supplied for this run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_layers: Vec<String>,
}

/// One point of a line elevation profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePoint {
    /// Distance along the line from its start, in meters.
    pub distance_m: f64,
    /// Sampled elevation in meters.
    pub elevation: f64,
}

/// A binned distribution ready for a bar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    /// Chart title.
    pub title: String,
    /// X-axis caption.
    pub x_title: String,
    /// Y-axis caption.
    pub y_title: String,
    /// One label per bin.
    pub labels: Vec<String>,
    /// One count per bin; sums to the number of values binned.
    pub counts: Vec<u64>,
    /// Smallest binned value.
    pub min: f64,
    /// Largest binned value.
    pub max: f64,
}

/// Chart-ready series attached to an elevation assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChartSeries {
    /// Elevation along a line.
    Profile {
        /// Valid samples in distance order.
        points: Vec<ProfilePoint>,
    },
    /// Distribution of sampled values over a polygon.
    Histogram(Histogram),
    /// A single reading for a point target.
    SingleValue {
        /// Value caption.
        label: String,
        /// The reading.
        value: f64,
    },
}

/// How many samples were taken versus how many produced an elevation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleCoverage {
    /// Samples requested from the raster.
    pub total: usize,
    /// Samples that returned an elevation.
    pub valid: usize,
}

/// Terrain summary for the target.
///
/// `kind` is `None` when the assessment could not run (for example the
/// elevation model failed to load); `rows` then holds a single diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevationAssessment {
    pub kind: Option<GeometryKind>,
    pub rows: Vec<MetricRow>,
    /// Profile (lines), elevation histogram (polygons), or single value
    /// (points).
    pub chart: Option<ChartSeries>,
    /// Slope histogram, polygons only.
    pub slope_chart: Option<ChartSeries>,
    pub coverage: Option<SampleCoverage>,
}

impl ElevationAssessment {
    /// Builds the single-row result reported when the assessment fails.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            rows: vec![MetricRow::new("Elevation", message)],
            chart: None,
            slope_chart: None,
            coverage: None,
        }
    }
}

/// Parameters echoed back with every result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMeta {
    /// Buffer radius used for permit-record proximity, meters.
    pub record_radius_m: f64,
    /// Buffer radius used for sensitive-area proximity, meters.
    pub area_radius_m: f64,
    /// Seed used for polygon grid downsampling.
    pub sampling_seed: u64,
}

/// The complete output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub meta: AnalysisMeta,
    /// Matched permit records in dataset order, after optional filters.
    pub records: Vec<Record>,
    /// Sensitive areas touching or near the target.
    pub sensitive_areas: Vec<ProximityRow>,
    /// One row per configured attribute group, in configuration order.
    pub attributes: Vec<IntersectionRow>,
    pub metrics: GeometryMetrics,
    pub elevation: ElevationAssessment,
}

/// Optional post-proximity filters for permit records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilters {
    /// Keep only records whose status equals this (case-insensitive).
    pub status: Option<String>,
    /// Keep only records dated on or after this day.
    pub start_date: Option<NaiveDate>,
    /// Keep only records dated on or before this day.
    pub end_date: Option<NaiveDate>,
}

impl RecordFilters {
    /// Returns `true` if no filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.as_deref().is_none_or(|s| s.trim().is_empty())
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

/// Names of the record fields the engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFieldConfig {
    /// Projected easting field.
    pub easting: String,
    /// Projected northing field.
    pub northing: String,
    /// Determination status field used by the status filter.
    pub status: String,
    /// Determination date field used by the date-range filter.
    pub date: String,
}

impl Default for RecordFieldConfig {
    fn default() -> Self {
        Self {
            easting: "Easting".to_string(),
            northing: "Northing".to_string(),
            status: "Application Determination".to_string(),
            date: "Determination Date".to_string(),
        }
    }
}

/// A reference layer treated as a sensitive area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveAreaLayer {
    /// Layer name as supplied in the layer catalog.
    pub layer: String,
    /// Optional feature property appended to the label as
    /// `"<layer> - <value>"`.
    pub label_field: Option<String>,
}

/// A named group of layers whose intersecting attribute values are
/// reported together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeGroup {
    /// Group name shown in results.
    pub name: String,
    /// Member layer names.
    pub layers: Vec<String>,
    /// Per-layer label field overrides.
    #[serde(default)]
    pub label_fields: BTreeMap<String, String>,
    /// Label field for layers not named in `label_fields`.
    #[serde(default = "default_label_field")]
    pub default_label_field: String,
}

fn default_label_field() -> String {
    "NAME".to_string()
}

impl AttributeGroup {
    /// Returns the label field to read for `layer`.
    #[must_use]
    pub fn label_field_for(&self, layer: &str) -> &str {
        self.label_fields
            .get(layer)
            .map_or(self.default_label_field.as_str(), String::as_str)
    }
}

/// Which reference layers play which role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub sensitive_areas: Vec<SensitiveAreaLayer>,
    /// Reported in this order.
    #[serde(default)]
    pub attribute_groups: Vec<AttributeGroup>,
}

/// Configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Buffer radius for permit-record proximity, meters.
    #[serde(default)]
    pub record_radius_m: f64,
    /// Buffer radius for sensitive-area proximity, meters.
    #[serde(default)]
    pub area_radius_m: f64,
    #[serde(default)]
    pub filters: RecordFilters,
    #[serde(default)]
    pub record_fields: RecordFieldConfig,
    #[serde(default)]
    pub layers: LayerConfig,
    /// Seed for polygon grid downsampling.
    #[serde(default)]
    pub sampling_seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_distance_display() {
        assert_eq!(
            AreaDistance::WithinBoundaries.to_string(),
            "within boundaries"
        );
        assert_eq!(AreaDistance::Meters(412.6).to_string(), "413 m");
        assert_eq!(
            AreaDistance::Unavailable.to_string(),
            "distance unavailable"
        );
        assert_eq!(
            AreaDistance::LayerUnavailable.to_string(),
            "layer unavailable"
        );
    }

    #[test]
    fn proximity_row_keeps_rounded_meters() {
        let row = ProximityRow::new("Caroni Swamp", AreaDistance::Meters(99.4));
        assert_eq!(row.distance, "99 m");
        assert_eq!(row.distance_m, Some(99.0));

        let row = ProximityRow::new("Caroni Swamp", AreaDistance::WithinBoundaries);
        assert_eq!(row.distance_m, None);
    }

    #[test]
    fn label_field_falls_back_to_default() {
        let group = AttributeGroup {
            name: "Watershed".to_string(),
            layers: vec![
                "Trinidad Watersheds".to_string(),
                "Tobago Watersheds".to_string(),
            ],
            label_fields: BTreeMap::from([(
                "Tobago Watersheds".to_string(),
                "WATERSHED".to_string(),
            )]),
            default_label_field: "NAME".to_string(),
        };
        assert_eq!(group.label_field_for("Tobago Watersheds"), "WATERSHED");
        assert_eq!(group.label_field_for("Trinidad Watersheds"), "NAME");
    }

    #[test]
    fn record_filters_blank_status_is_empty() {
        let filters = RecordFilters {
            status: Some("  ".to_string()),
            ..RecordFilters::default()
        };
        assert!(filters.is_empty());
    }

    #[test]
    fn chart_series_tagged_by_kind() {
        let chart = ChartSeries::SingleValue {
            label: "Elevation (m)".to_string(),
            value: 12.5,
        };
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["kind"], "singleValue");
        assert_eq!(json["value"], 12.5);
    }
}
