#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory reference layers for proximity and intersection analysis.
//!
//! Each [`ReferenceLayer`] keeps its features in load order and indexes
//! their bounding boxes in an R-tree, so a query only runs exact geometry
//! tests against features whose envelope overlaps the search area.
//! Candidates are always returned in load order, which keeps result rows
//! stable across runs.

pub mod proximity;

use std::collections::BTreeMap;
use std::path::Path;

use geo::{BoundingRect as _, Geometry, Rect};
use geojson::GeoJson;
use rstar::{AABB, RTree, RTreeObject};
use siting_analysis_models::Record;

/// Errors that can occur while loading reference layers.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    /// I/O error reading a layer file or directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A layer file is not valid `GeoJSON`.
    #[error("Layer {layer}: {source}")]
    GeoJson {
        /// Layer name.
        layer: String,
        source: geojson::Error,
    },
}

/// One feature of a reference layer.
#[derive(Debug, Clone)]
pub struct LayerFeature {
    pub geometry: Geometry<f64>,
    pub properties: Record,
}

impl LayerFeature {
    /// Returns the display text of `field`, or `None` if it is absent,
    /// null, empty, or the literal string `"null"`.
    #[must_use]
    pub fn attribute(&self, field: &str) -> Option<String> {
        attribute_text(self.properties.get(field)?)
    }
}

/// Display text of a property value.
fn attribute_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && s != "null").then(|| s.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(true) => Some("true".to_string()),
        serde_json::Value::Bool(false)
        | serde_json::Value::Null
        | serde_json::Value::Array(_)
        | serde_json::Value::Object(_) => None,
    }
}

/// A feature's envelope stored in the R-tree, pointing back at the feature.
struct FeatureEnvelope {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// A named, read-only collection of vector features.
pub struct ReferenceLayer {
    name: String,
    features: Vec<LayerFeature>,
    index: RTree<FeatureEnvelope>,
}

impl std::fmt::Debug for ReferenceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceLayer")
            .field("name", &self.name)
            .field("features", &self.features.len())
            .finish()
    }
}

impl ReferenceLayer {
    /// Builds a layer and its R-tree from features in load order.
    ///
    /// Features without a bounding box (empty geometries) are dropped.
    #[must_use]
    pub fn new(name: impl Into<String>, features: Vec<LayerFeature>) -> Self {
        let name = name.into();
        let features: Vec<LayerFeature> = features
            .into_iter()
            .filter(|f| f.geometry.bounding_rect().is_some())
            .collect();

        let envelopes = features
            .iter()
            .enumerate()
            .filter_map(|(index, f)| {
                f.geometry.bounding_rect().map(|rect| FeatureEnvelope {
                    index,
                    envelope: rect_envelope(rect),
                })
            })
            .collect();

        Self {
            name,
            features,
            index: RTree::bulk_load(envelopes),
        }
    }

    /// Builds a layer from a feature collection, a single feature, or a
    /// bare geometry.
    ///
    /// Features with a missing or unconvertible geometry are skipped.
    #[must_use]
    pub fn from_geojson(name: impl Into<String>, geojson: GeoJson) -> Self {
        let name = name.into();
        let raw: Vec<(Option<geojson::Geometry>, Record)> = match geojson {
            GeoJson::FeatureCollection(fc) => fc
                .features
                .into_iter()
                .map(|f| (f.geometry, f.properties.unwrap_or_default()))
                .collect(),
            GeoJson::Feature(f) => vec![(f.geometry, f.properties.unwrap_or_default())],
            GeoJson::Geometry(g) => vec![(Some(g), Record::new())],
        };

        let total = raw.len();
        let features: Vec<LayerFeature> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(i, (geometry, properties))| {
                let Some(geometry) = geometry else {
                    log::debug!("Layer {name}: feature {i} has no geometry");
                    return None;
                };
                match Geometry::<f64>::try_from(geometry) {
                    Ok(geometry) => Some(LayerFeature {
                        geometry,
                        properties,
                    }),
                    Err(e) => {
                        log::warn!("Layer {name}: skipping feature {i}: {e}");
                        None
                    }
                }
            })
            .collect();

        if features.len() < total {
            log::warn!(
                "Layer {name}: kept {} of {total} features",
                features.len()
            );
        }

        Self::new(name, features)
    }

    /// Parses `GeoJSON` text into a layer.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::GeoJson`] if the text is not valid `GeoJSON`.
    pub fn from_geojson_str(name: impl Into<String>, text: &str) -> Result<Self, LayerError> {
        let name = name.into();
        let geojson: GeoJson = text.parse().map_err(|source| LayerError::GeoJson {
            layer: name.clone(),
            source,
        })?;
        Ok(Self::from_geojson(name, geojson))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// All features in load order.
    pub fn features(&self) -> impl Iterator<Item = &LayerFeature> {
        self.features.iter()
    }

    /// Features whose envelope overlaps `area`, in load order.
    #[must_use]
    pub fn candidates(&self, area: Rect<f64>) -> Vec<&LayerFeature> {
        let mut hits: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&rect_envelope(area))
            .map(|e| e.index)
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|i| &self.features[i]).collect()
    }
}

/// The reference layers supplied for one run, keyed by name.
#[derive(Debug, Default)]
pub struct LayerCatalog {
    layers: BTreeMap<String, ReferenceLayer>,
}

impl LayerCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer, replacing any previous layer of the same name.
    pub fn insert(&mut self, layer: ReferenceLayer) {
        self.layers.insert(layer.name().to_string(), layer);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ReferenceLayer> {
        self.layers.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layer names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Loads every `<layer name>.geojson` (or `.json`) file in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a layer file cannot be read or
    /// parsed.
    pub fn load_dir(dir: &Path) -> Result<Self, LayerError> {
        let mut catalog = Self::new();

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("geojson") || e.eq_ignore_ascii_case("json"))
            })
            .collect();
        paths.sort();

        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path)?;
            let layer = ReferenceLayer::from_geojson_str(name, &text)?;
            log::info!("Loaded layer {name} ({} features)", layer.len());
            catalog.insert(layer);
        }

        Ok(catalog)
    }
}

/// Converts a bounding rectangle into an R-tree envelope.
fn rect_envelope(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

#[cfg(test)]
mod tests {
    use geo::{Point, coord};

    use super::*;

    const LAYER: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"NAME":"West"},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
        {"type":"Feature","properties":{"NAME":null},"geometry":null},
        {"type":"Feature","properties":{"NAME":"East"},"geometry":{"type":"Polygon","coordinates":[[[5,0],[6,0],[6,1],[5,1],[5,0]]]}},
        {"type":"Feature","properties":{"NAME":"null"},"geometry":{"type":"Point","coordinates":[0.5,0.5]}}
    ]}"#;

    #[test]
    fn skips_features_without_geometry() {
        let layer = ReferenceLayer::from_geojson_str("Test", LAYER).unwrap();
        assert_eq!(layer.len(), 3);
        assert_eq!(layer.name(), "Test");
    }

    #[test]
    fn candidates_keep_load_order() {
        let layer = ReferenceLayer::from_geojson_str("Test", LAYER).unwrap();
        let area = Rect::new(coord! { x: -1.0, y: -1.0 }, coord! { x: 7.0, y: 2.0 });
        let names: Vec<_> = layer
            .candidates(area)
            .into_iter()
            .map(|f| f.attribute("NAME"))
            .collect();
        assert_eq!(
            names,
            vec![Some("West".to_string()), Some("East".to_string()), None]
        );
    }

    #[test]
    fn candidates_filter_by_envelope() {
        let layer = ReferenceLayer::from_geojson_str("Test", LAYER).unwrap();
        let area = Rect::new(coord! { x: 5.5, y: 0.5 }, coord! { x: 5.6, y: 0.6 });
        let hits = layer.candidates(area);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].attribute("NAME").as_deref(), Some("East"));
    }

    #[test]
    fn attribute_text_rules() {
        let feature = LayerFeature {
            geometry: Geometry::Point(Point::new(0.0, 0.0)),
            properties: serde_json::json!({
                "blank": "  ",
                "nullish": "null",
                "num": 3,
                "flag": false,
                "name": " Caroni ",
            })
            .as_object()
            .cloned()
            .unwrap(),
        };
        assert_eq!(feature.attribute("blank"), None);
        assert_eq!(feature.attribute("nullish"), None);
        assert_eq!(feature.attribute("num").as_deref(), Some("3"));
        assert_eq!(feature.attribute("flag"), None);
        assert_eq!(feature.attribute("name").as_deref(), Some("Caroni"));
        assert_eq!(feature.attribute("missing"), None);
    }

    #[test]
    fn invalid_geojson_names_the_layer() {
        let err = ReferenceLayer::from_geojson_str("Broken", "{not json").unwrap_err();
        assert!(err.to_string().starts_with("Layer Broken"));
    }

    #[test]
    fn catalog_replaces_same_name() {
        let mut catalog = LayerCatalog::new();
        catalog.insert(ReferenceLayer::new("A", vec![]));
        catalog.insert(ReferenceLayer::from_geojson_str("A", LAYER).unwrap());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("A").map(ReferenceLayer::len), Some(3));
        assert!(catalog.get("B").is_none());
    }
}
