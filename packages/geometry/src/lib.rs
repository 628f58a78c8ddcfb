#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geometry primitives for siting-risk screening.
//!
//! Target geometries arrive as geographic GeoJSON (WGS 84, `x` = lon).
//! Every metric operation (buffering, nearest-edge distance, grid
//! construction) runs in the fixed projected system from [`projection`]
//! and converts results back, so distances are in true meters.

pub mod measure;
pub mod ops;
pub mod projection;

use geo::{
    Coord, Geometry, LineString, MultiLineString, MultiPolygon, Point, Polygon,
};
use geojson::GeoJson;
use siting_analysis_models::GeometryKind;
use thiserror::Error;

/// Errors produced while accepting a target geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The `GeoJSON` text or structure could not be decoded.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The geometry type is not a point, line, or polygon family.
    #[error("Unsupported geometry type: {0}")]
    Unsupported(String),

    /// The geometry has no usable coordinates.
    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    /// A feature collection was given without choosing a feature.
    #[error("Expected a single feature but the collection has {count}; pick one by index")]
    AmbiguousFeature { count: usize },

    /// The requested feature index does not exist.
    #[error("Feature index {index} out of range (collection has {count})")]
    FeatureIndex { index: usize, count: usize },
}

/// The geometry an analysis run is performed against.
///
/// Multi-part lines are flattened into one line; polygons are always
/// held as a multi-polygon so single and multi-part inputs share code.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetGeometry {
    Point(Point<f64>),
    Line(LineString<f64>),
    Polygon(MultiPolygon<f64>),
}

impl TargetGeometry {
    /// Returns the geometry family.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::Line(_) => GeometryKind::Line,
            Self::Polygon(_) => GeometryKind::Polygon,
        }
    }

    /// Returns the target as a plain `geo` geometry.
    #[must_use]
    pub fn to_geometry(&self) -> Geometry<f64> {
        match self {
            Self::Point(p) => Geometry::Point(*p),
            Self::Line(l) => Geometry::LineString(l.clone()),
            Self::Polygon(mp) => Geometry::MultiPolygon(mp.clone()),
        }
    }

    /// Parses a target from `GeoJSON` text.
    ///
    /// # Errors
    ///
    /// See [`Self::from_geojson`].
    pub fn from_geojson_str(
        text: &str,
        feature_index: Option<usize>,
    ) -> Result<Self, GeometryError> {
        let geojson: GeoJson = text.parse()?;
        Self::from_geojson(geojson, feature_index)
    }

    /// Accepts a bare geometry, a feature, or one feature of a collection.
    ///
    /// A collection with exactly one feature needs no index.
    ///
    /// # Errors
    ///
    /// Returns an error if the input has no geometry, the feature choice is
    /// ambiguous or out of range, or the geometry is unsupported or empty.
    pub fn from_geojson(
        geojson: GeoJson,
        feature_index: Option<usize>,
    ) -> Result<Self, GeometryError> {
        let geometry = match geojson {
            GeoJson::Geometry(g) => g,
            GeoJson::Feature(f) => f
                .geometry
                .ok_or_else(|| GeometryError::Degenerate("feature has no geometry".to_string()))?,
            GeoJson::FeatureCollection(fc) => {
                let count = fc.features.len();
                let index = match feature_index {
                    Some(index) => index,
                    None if count == 1 => 0,
                    None => return Err(GeometryError::AmbiguousFeature { count }),
                };
                fc.features
                    .into_iter()
                    .nth(index)
                    .ok_or(GeometryError::FeatureIndex { index, count })?
                    .geometry
                    .ok_or_else(|| {
                        GeometryError::Degenerate(format!("feature {index} has no geometry"))
                    })?
            }
        };

        let geometry: Geometry<f64> = geometry.try_into()?;
        Self::try_from(geometry)
    }
}

impl TryFrom<Geometry<f64>> for TargetGeometry {
    type Error = GeometryError;

    fn try_from(geometry: Geometry<f64>) -> Result<Self, Self::Error> {
        let target = match geometry {
            Geometry::Point(p) => Self::Point(p),
            Geometry::MultiPoint(mp) if mp.0.len() == 1 => Self::Point(mp.0[0]),
            Geometry::Line(l) => Self::Line(LineString::from(vec![l.start, l.end])),
            Geometry::LineString(ls) => Self::Line(ls),
            Geometry::MultiLineString(mls) => Self::Line(flatten_lines(&mls)),
            Geometry::Polygon(p) => Self::Polygon(MultiPolygon::new(vec![p])),
            Geometry::MultiPolygon(mp) => Self::Polygon(mp),
            Geometry::Rect(r) => Self::Polygon(MultiPolygon::new(vec![r.to_polygon()])),
            Geometry::Triangle(t) => Self::Polygon(MultiPolygon::new(vec![t.to_polygon()])),
            Geometry::MultiPoint(mp) => {
                return Err(GeometryError::Unsupported(format!(
                    "MultiPoint with {} points",
                    mp.0.len()
                )));
            }
            Geometry::GeometryCollection(_) => {
                return Err(GeometryError::Unsupported(
                    "GeometryCollection".to_string(),
                ));
            }
        };

        target.validate()?;
        Ok(target)
    }
}

impl TargetGeometry {
    fn validate(&self) -> Result<(), GeometryError> {
        let finite = |c: &Coord<f64>| c.x.is_finite() && c.y.is_finite();

        match self {
            Self::Point(p) => {
                if !finite(&p.0) {
                    return Err(GeometryError::Degenerate(
                        "point has non-finite coordinates".to_string(),
                    ));
                }
            }
            Self::Line(ls) => {
                if ls.0.len() < 2 {
                    return Err(GeometryError::Degenerate(format!(
                        "line has {} vertices",
                        ls.0.len()
                    )));
                }
                if !ls.coords().all(finite) {
                    return Err(GeometryError::Degenerate(
                        "line has non-finite coordinates".to_string(),
                    ));
                }
            }
            Self::Polygon(mp) => {
                if mp.0.is_empty() || mp.0.iter().any(|p| p.exterior().0.len() < 4) {
                    return Err(GeometryError::Degenerate(
                        "polygon has an empty or open exterior ring".to_string(),
                    ));
                }
                if !mp.0.iter().flat_map(Polygon::exterior).all(finite) {
                    return Err(GeometryError::Degenerate(
                        "polygon has non-finite coordinates".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Joins the parts of a multi-line into a single line in part order.
///
/// Consecutive duplicate vertices at part joins are dropped.
#[must_use]
pub fn flatten_lines(lines: &MultiLineString<f64>) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = Vec::new();
    for coord in lines.0.iter().flat_map(|l| l.0.iter().copied()) {
        if coords.last() != Some(&coord) {
            coords.push(coord);
        }
    }
    LineString::new(coords)
}
