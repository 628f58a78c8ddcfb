#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Siting-risk screening for a single target geometry.
//!
//! [`run_analysis`] is the one entry point collaborators call. It finds
//! nearby permit records, sensitive areas within reach, the attribute
//! values of every zoning or administrative layer the target touches,
//! the target's own measurements, and an elevation/slope assessment, and
//! returns them together as one [`AnalysisResult`].
//!
//! Every component degrades on its own: a missing layer becomes an
//! explicit marker row and an unreadable DEM becomes a diagnostic
//! elevation block, while the rest of the result is still produced.

pub mod config;
pub mod filters;
pub mod metrics;

use siting_analysis_models::{AnalysisConfig, AnalysisMeta, AnalysisResult, Record};
use siting_geometry::{TargetGeometry, ops::normalize_radius};
use siting_raster::DemProvider;
use siting_spatial::{
    LayerCatalog,
    proximity::{find_nearby_areas, find_nearby_records, intersecting_attributes},
};

/// Read-only datasets for one analysis run.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInputs<'a> {
    /// Permit records with projected coordinates.
    pub records: &'a [Record],
    /// Reference layers by name.
    pub layers: &'a LayerCatalog,
}

/// Runs every analysis for `target` and assembles the result.
///
/// Radii in `config` are normalised before use and echoed back in
/// [`AnalysisResult::meta`]. Buffers and samples are local to the call.
pub async fn run_analysis(
    target: &TargetGeometry,
    inputs: AnalysisInputs<'_>,
    config: &AnalysisConfig,
    dem: &DemProvider,
) -> AnalysisResult {
    let record_radius_m = normalize_radius(config.record_radius_m);
    let area_radius_m = normalize_radius(config.area_radius_m);
    log::debug!(
        "Analysing {} target: record radius {record_radius_m} m, area radius {area_radius_m} m",
        target.kind()
    );

    let nearby = find_nearby_records(
        target,
        inputs.records,
        record_radius_m,
        &config.record_fields,
    );
    let records: Vec<Record> =
        filters::apply_filters(nearby, &config.filters, &config.record_fields)
            .into_iter()
            .cloned()
            .collect();

    let sensitive_areas = find_nearby_areas(
        target,
        inputs.layers,
        &config.layers.sensitive_areas,
        area_radius_m,
    );
    let attributes =
        intersecting_attributes(target, inputs.layers, &config.layers.attribute_groups);
    let metrics = metrics::geometry_metrics(target);
    let elevation = siting_elevation::assess(target, dem, config.sampling_seed).await;

    log::info!(
        "Analysis complete: {} records, {} sensitive areas, {} attribute groups",
        records.len(),
        sensitive_areas.len(),
        attributes.len()
    );

    AnalysisResult {
        meta: AnalysisMeta {
            record_radius_m,
            area_radius_m,
            sampling_seed: config.sampling_seed,
        },
        records,
        sensitive_areas,
        attributes,
        metrics,
        elevation,
    }
}

#[cfg(test)]
mod tests {
    use geo::{Coord, Geometry, LineString, Point, Polygon};
    use serde_json::json;
    use siting_analysis_models::{ElevationAssessment, GeometryKind, RecordFilters};
    use siting_geometry::projection::{to_geographic, to_projected};
    use siting_raster::{GeoTiffFileLoader, RasterBounds, RasterCrs, RasterHandle};
    use siting_spatial::{LayerFeature, ReferenceLayer};

    use super::*;

    const LAT: f64 = 10.5;
    const LON: f64 = -61.3;

    fn offset(dx: f64, dy: f64) -> Coord<f64> {
        let origin = to_projected(LAT, LON);
        let (lat, lon) = to_geographic(origin.easting + dx, origin.northing + dy);
        Coord { x: lon, y: lat }
    }

    fn square(cx: f64, cy: f64, half: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::new(vec![
                offset(cx - half, cy - half),
                offset(cx + half, cy - half),
                offset(cx + half, cy + half),
                offset(cx - half, cy + half),
                offset(cx - half, cy - half),
            ]),
            vec![],
        )
    }

    fn record(id: &str, dx: f64, dy: f64, status: &str) -> Record {
        let origin = to_projected(LAT, LON);
        json!({
            "id": id,
            "Easting": origin.easting + dx,
            "Northing": origin.northing + dy,
            "Application Determination": status,
            "Determination Date": "2023-06-01",
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn layer(name: &str, polygon: Polygon<f64>, props: serde_json::Value) -> ReferenceLayer {
        ReferenceLayer::new(
            name,
            vec![LayerFeature {
                geometry: Geometry::Polygon(polygon),
                properties: props.as_object().cloned().unwrap_or_default(),
            }],
        )
    }

    fn catalog() -> LayerCatalog {
        let mut catalog = LayerCatalog::new();
        catalog.insert(layer(
            "Caroni Swamp",
            square(700.0, 0.0, 100.0),
            json!({}),
        ));
        catalog.insert(layer(
            "Forest Reserve",
            square(0.0, 0.0, 50.0),
            json!({ "NAME": "Central Range" }),
        ));
        catalog.insert(layer(
            "Municipality",
            square(0.0, 0.0, 5000.0),
            json!({ "NAME_1": "Couva" }),
        ));
        catalog
    }

    fn flat_dem() -> DemProvider {
        let raster = RasterHandle::from_grid(
            RasterBounds {
                min_x: LON - 0.05,
                min_y: LAT - 0.05,
                max_x: LON + 0.05,
                max_y: LAT + 0.05,
            },
            RasterCrs::Geographic,
            None,
            &vec![vec![20.0; 50]; 50],
        )
        .unwrap();
        DemProvider::preloaded(raster)
    }

    fn test_config() -> AnalysisConfig {
        AnalysisConfig {
            record_radius_m: 500.0,
            area_radius_m: 1000.0,
            ..config::default_config()
        }
    }

    #[tokio::test]
    async fn point_target_end_to_end() {
        let records = vec![
            record("near", 200.0, 0.0, "Granted"),
            record("far", 3000.0, 0.0, "Granted"),
        ];
        let layers = catalog();
        let target = TargetGeometry::Point(Point::from(offset(0.0, 0.0)));

        let result = run_analysis(
            &target,
            AnalysisInputs {
                records: &records,
                layers: &layers,
            },
            &test_config(),
            &flat_dem(),
        )
        .await;

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0]["id"], "near");
        assert!((result.meta.record_radius_m - 500.0).abs() < f64::EPSILON);

        let labels: Vec<&str> = result
            .sensitive_areas
            .iter()
            .map(|r| r.label.as_str())
            .collect();
        assert!(labels.contains(&"Forest Reserve - Central Range"));
        assert!(labels.contains(&"Caroni Swamp"));
        assert!(
            result
                .sensitive_areas
                .iter()
                .any(|r| r.label == "Aripo Savannas" && r.distance == "layer unavailable")
        );

        assert_eq!(result.attributes.len(), 7);
        assert_eq!(result.attributes[0].group, "Municipality");
        assert_eq!(result.attributes[0].values, "Couva");
        assert_eq!(result.attributes[1].values, "Layer unavailable");

        assert_eq!(result.metrics.kind, GeometryKind::Point);
        assert_eq!(result.elevation.kind, Some(GeometryKind::Point));
        assert_eq!(result.elevation.rows[0].value, "20.0 m");
    }

    #[tokio::test]
    async fn filters_apply_after_proximity() {
        let records = vec![
            record("granted", 100.0, 0.0, "Granted"),
            record("refused", -100.0, 0.0, "Refused"),
        ];
        let layers = LayerCatalog::new();
        let target = TargetGeometry::Polygon(square(0.0, 0.0, 300.0).into());
        let config = AnalysisConfig {
            filters: RecordFilters {
                status: Some("granted".to_string()),
                ..RecordFilters::default()
            },
            ..test_config()
        };

        let result = run_analysis(
            &target,
            AnalysisInputs {
                records: &records,
                layers: &layers,
            },
            &config,
            &flat_dem(),
        )
        .await;

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0]["id"], "granted");
    }

    #[tokio::test]
    async fn dem_failure_keeps_other_results() {
        let records = vec![record("near", 200.0, 0.0, "Granted")];
        let layers = catalog();
        let target = TargetGeometry::Point(Point::from(offset(0.0, 0.0)));
        let dem = DemProvider::new(GeoTiffFileLoader::new("/nonexistent/dem.tif"));

        let result = run_analysis(
            &target,
            AnalysisInputs {
                records: &records,
                layers: &layers,
            },
            &test_config(),
            &dem,
        )
        .await;

        assert_eq!(result.records.len(), 1);
        assert!(!result.sensitive_areas.is_empty());
        assert_eq!(
            result.elevation,
            ElevationAssessment::failed("Failed to read DEM")
        );
    }

    #[tokio::test]
    async fn negative_radii_are_normalised() {
        let records = vec![record("near", 200.0, 0.0, "Granted")];
        let layers = LayerCatalog::new();
        let target = TargetGeometry::Point(Point::from(offset(0.0, 0.0)));
        let config = AnalysisConfig {
            record_radius_m: -10.0,
            area_radius_m: f64::NAN,
            ..test_config()
        };

        let result = run_analysis(
            &target,
            AnalysisInputs {
                records: &records,
                layers: &layers,
            },
            &config,
            &flat_dem(),
        )
        .await;

        assert!(result.meta.record_radius_m.abs() < f64::EPSILON);
        assert!(result.meta.area_radius_m.abs() < f64::EPSILON);
        assert!(result.records.is_empty());
    }
}
