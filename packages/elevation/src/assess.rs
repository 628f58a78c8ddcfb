//! Per-geometry elevation and slope assessment.
//!
//! Each branch samples the DEM, summarises the valid readings and renders
//! them as display rows. Missing readings never poison a statistic: they
//! are dropped before summarising and only show up in the coverage row.

use geo::{Centroid as _, LineString, MultiPolygon, Point};
use siting_analysis_models::{
    ChartSeries, ElevationAssessment, GeometryKind, MetricRow, ProfilePoint, SampleCoverage,
    format::{self, DASH},
};
use siting_geometry::{
    TargetGeometry,
    measure::{area_m2, interpolate_along, line_length_m},
};
use siting_raster::{DemProvider, PixelMeters, RasterHandle};

use crate::{
    Sample,
    planner::{plan_line, plan_polygon},
    sample_points,
    stats::{HistogramAxes, histogram, slope_class_shares, summarize},
};

/// Diagnostic row text when the DEM cannot be read.
pub const DEM_FAILURE: &str = "Failed to read DEM";

/// Assesses `target` against the session DEM.
///
/// Never fails: a DEM that cannot be loaded yields a single diagnostic
/// row so the rest of the analysis still completes.
pub async fn assess(target: &TargetGeometry, dem: &DemProvider, seed: u64) -> ElevationAssessment {
    match dem.get_raster().await {
        Ok(raster) => assess_with(target, &raster, seed),
        Err(e) => {
            log::warn!("Elevation assessment skipped: {e}");
            ElevationAssessment::failed(DEM_FAILURE)
        }
    }
}

/// Assesses `target` against an already loaded raster.
#[must_use]
pub fn assess_with(target: &TargetGeometry, raster: &RasterHandle, seed: u64) -> ElevationAssessment {
    match target {
        TargetGeometry::Point(point) => assess_point(*point, raster),
        TargetGeometry::Line(line) => assess_line(line, raster),
        TargetGeometry::Polygon(polygon) => assess_polygon(polygon, raster, seed),
    }
}

fn elevation_text(z: Option<f64>) -> String {
    format::with_unit(z, 1, " m")
}

fn grade_text(grade: Option<f64>) -> String {
    format::with_unit(grade, 2, " %")
}

fn resolution_text(pixel: PixelMeters) -> String {
    format!(
        "{} m × {} m per pixel",
        format::number(Some(pixel.dx), 2),
        format::number(Some(pixel.dy), 2)
    )
}

fn coverage_row(coverage: SampleCoverage) -> MetricRow {
    MetricRow::new(
        "Sample Coverage",
        format!("{} of {} samples", coverage.valid, coverage.total),
    )
}

fn coverage_of(samples: &[Sample]) -> SampleCoverage {
    SampleCoverage {
        total: samples.len(),
        valid: samples.iter().filter(|s| s.elevation.is_some()).count(),
    }
}

fn assess_point(point: Point<f64>, raster: &RasterHandle) -> ElevationAssessment {
    let cell = raster.sample(point.x(), point.y());
    if cell.elevation.is_none() {
        log::warn!("No elevation at ({}, {})", point.x(), point.y());
    }

    let rows = vec![
        MetricRow::new("Elevation", elevation_text(cell.elevation)),
        MetricRow::new(
            "Slope (degrees)",
            format::with_unit(cell.slope.map(|s| s.degrees), 1, "°"),
        ),
        MetricRow::new(
            "Slope (%)",
            format::with_unit(cell.slope.map(|s| s.percent), 1, " %"),
        ),
    ];

    ElevationAssessment {
        kind: Some(GeometryKind::Point),
        rows,
        chart: cell.elevation.map(|value| ChartSeries::SingleValue {
            label: "Elevation (m)".to_string(),
            value,
        }),
        slope_chart: None,
        coverage: Some(SampleCoverage {
            total: 1,
            valid: usize::from(cell.elevation.is_some()),
        }),
    }
}

/// Segment statistics along a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ProfileStats {
    ascent_m: f64,
    descent_m: f64,
    steepest_up: Option<f64>,
    steepest_down: Option<f64>,
    mean_abs_grade: Option<f64>,
    end_to_end: Option<f64>,
}

#[allow(clippy::cast_precision_loss)]
fn profile_stats(profile: &[ProfilePoint]) -> ProfileStats {
    let mut stats = ProfileStats::default();
    let mut abs_sum = 0.0;
    let mut segments = 0_usize;

    for pair in profile.windows(2) {
        let run = pair[1].distance_m - pair[0].distance_m;
        let run = if run > 0.0 { run } else { 1.0 };
        let rise = pair[1].elevation - pair[0].elevation;
        let grade = rise / run * 100.0;

        if rise > 0.0 {
            stats.ascent_m += rise;
        } else {
            stats.descent_m -= rise;
        }
        stats.steepest_up = Some(stats.steepest_up.map_or(grade, |g| g.max(grade)));
        stats.steepest_down = Some(stats.steepest_down.map_or(grade, |g| g.min(grade)));
        abs_sum += grade.abs();
        segments += 1;
    }

    if segments > 0 {
        stats.mean_abs_grade = Some(abs_sum / segments as f64);
    }

    if let (Some(first), Some(last)) = (profile.first(), profile.last()) {
        let run = last.distance_m - first.distance_m;
        if run > 0.0 {
            stats.end_to_end = Some((last.elevation - first.elevation) / run * 100.0);
        }
    }

    stats
}

fn assess_line(line: &LineString<f64>, raster: &RasterHandle) -> ElevationAssessment {
    let length_m = line_length_m(line);
    let mid_lat = interpolate_along(line, length_m / 2.0).map_or(0.0, |p| p.y());
    let pixel = raster.meters_per_pixel(mid_lat);
    let plan = plan_line(length_m, pixel);
    log::debug!(
        "Line profile: {length_m:.1} m, {} m step, {} samples",
        plan.step_m,
        plan.samples
    );

    let distances: Vec<f64> = (0..plan.samples)
        .map(|i| plan.distance_of(i, length_m))
        .collect();
    let points: Vec<Point<f64>> = distances
        .iter()
        .filter_map(|&d| interpolate_along(line, d))
        .collect();
    let samples = sample_points(raster, &points);
    let coverage = coverage_of(&samples);

    let profile: Vec<ProfilePoint> = distances
        .iter()
        .zip(&samples)
        .filter_map(|(&distance_m, s)| {
            s.elevation.map(|elevation| ProfilePoint {
                distance_m,
                elevation,
            })
        })
        .collect();
    let elevations: Vec<f64> = profile.iter().map(|p| p.elevation).collect();
    let summary = summarize(&elevations);
    let stats = profile_stats(&profile);
    let has_segments = profile.len() > 1;

    let rows = vec![
        MetricRow::new("DEM Resolution (approx.)", resolution_text(pixel)),
        MetricRow::new(
            "Sample Spacing",
            format!(
                "~{} m ({} samples)",
                format::number(Some(plan.step_m), 0),
                plan.samples
            ),
        ),
        coverage_row(coverage),
        MetricRow::new("Min Elevation", elevation_text(summary.map(|s| s.min))),
        MetricRow::new("Max Elevation", elevation_text(summary.map(|s| s.max))),
        MetricRow::new("Average Elevation", elevation_text(summary.map(|s| s.mean))),
        MetricRow::new("End-to-End Grade (start→end)", grade_text(stats.end_to_end)),
        MetricRow::new(
            "End-to-End Slope Ratio (1:N)",
            format::slope_ratio(stats.end_to_end),
        ),
        MetricRow::new("Mean Segment Grade (abs.)", grade_text(stats.mean_abs_grade)),
        MetricRow::new(
            "Mean Segment Slope Ratio (1:N)",
            format::slope_ratio(stats.mean_abs_grade),
        ),
        MetricRow::new("Steepest Uphill Segment", grade_text(stats.steepest_up)),
        MetricRow::new(
            "Steepest Uphill Ratio (1:N)",
            format::slope_ratio(stats.steepest_up),
        ),
        MetricRow::new("Steepest Downhill Segment", grade_text(stats.steepest_down)),
        MetricRow::new(
            "Steepest Downhill Ratio (1:N)",
            format::slope_ratio(stats.steepest_down),
        ),
        MetricRow::new(
            "Total Ascent",
            elevation_text(has_segments.then_some(stats.ascent_m)),
        ),
        MetricRow::new(
            "Total Descent",
            elevation_text(has_segments.then_some(stats.descent_m)),
        ),
    ];

    if coverage.valid < coverage.total {
        log::warn!(
            "Line profile: {} of {} samples had no elevation",
            coverage.total - coverage.valid,
            coverage.total
        );
    }

    ElevationAssessment {
        kind: Some(GeometryKind::Line),
        rows,
        chart: (!profile.is_empty()).then_some(ChartSeries::Profile { points: profile }),
        slope_chart: None,
        coverage: Some(coverage),
    }
}

fn elevation_bin(a: f64, b: f64) -> String {
    format!("{a:.0}–{b:.0} m")
}

fn slope_bin(a: f64, b: f64) -> String {
    format!("{a:.0}–{b:.0}°")
}

fn assess_polygon(polygon: &MultiPolygon<f64>, raster: &RasterHandle, seed: u64) -> ElevationAssessment {
    let area = area_m2(polygon);
    let centre_lat = polygon.centroid().map_or(0.0, |c| c.y());
    let pixel = raster.meters_per_pixel(centre_lat);
    let plan = plan_polygon(polygon, area, pixel, seed);

    let samples = sample_points(raster, &plan.points);
    let coverage = coverage_of(&samples);

    let elevations: Vec<f64> = samples.iter().filter_map(|s| s.elevation).collect();
    let slopes_deg: Vec<f64> = samples
        .iter()
        .filter_map(|s| s.slope.map(|slope| slope.degrees))
        .collect();
    let slopes_pct: Vec<f64> = samples
        .iter()
        .filter_map(|s| s.slope.map(|slope| slope.percent))
        .collect();

    let z = summarize(&elevations);
    let deg = summarize(&slopes_deg);
    let pct = summarize(&slopes_pct);

    let mut rows = vec![
        MetricRow::new("DEM Resolution (approx.)", resolution_text(pixel)),
        MetricRow::new(
            "Grid Spacing",
            format!(
                "~{} m ({} samples)",
                format::number(Some(plan.step_m), 0),
                elevations.len()
            ),
        ),
        coverage_row(coverage),
        MetricRow::new("Min Elevation", elevation_text(z.map(|s| s.min))),
        MetricRow::new("Max Elevation", elevation_text(z.map(|s| s.max))),
        MetricRow::new("Mean Elevation", elevation_text(z.map(|s| s.mean))),
        MetricRow::new(
            "Mean Slope (degrees)",
            format::with_unit(deg.map(|s| s.mean), 1, "°"),
        ),
        MetricRow::new(
            "Mean Slope (grade %)",
            format::with_unit(pct.map(|s| s.mean), 1, " %"),
        ),
        MetricRow::new(
            "Slope Range (degrees)",
            deg.map_or_else(
                || DASH.to_string(),
                |s| format!("{:.1}° to {:.1}°", s.min, s.max),
            ),
        ),
        MetricRow::new(
            "Slope Range (grade %)",
            pct.map_or_else(
                || DASH.to_string(),
                |s| format!("{:.1}% to {:.1}%", s.min, s.max),
            ),
        ),
        MetricRow::new(
            "Mean Slope Ratio (1:N)",
            format::slope_ratio(pct.map(|s| s.mean)),
        ),
        MetricRow::new(
            "Slope Ratio Range (1:N)",
            pct.map_or_else(
                || DASH.to_string(),
                |s| {
                    format!(
                        "{} to {}",
                        format::slope_ratio(Some(s.max)),
                        format::slope_ratio(Some(s.min))
                    )
                },
            ),
        ),
    ];

    let shares = slope_class_shares(&slopes_deg);
    if !shares.is_empty() {
        rows.push(MetricRow::new("Slope Class Breakdown", DASH));
        rows.extend(shares.into_iter().map(|(name, share)| {
            MetricRow::new(
                format!("Slope Class % — {name}"),
                format!("{} %", format::number(Some(share), 1)),
            )
        }));
    }

    if coverage.valid == 0 {
        log::warn!(
            "Polygon grid: none of {} samples had an elevation",
            coverage.total
        );
    }

    let chart = histogram(
        &elevations,
        HistogramAxes {
            title: "Elevation distribution",
            x_title: "Elevation bins (m)",
            y_title: "Sample count",
        },
        elevation_bin,
        |min| format!("{min:.1} m"),
    )
    .map(ChartSeries::Histogram);

    let slope_chart = histogram(
        &slopes_deg,
        HistogramAxes {
            title: "Slope distribution",
            x_title: "Slope bins (degrees)",
            y_title: "Sample count",
        },
        slope_bin,
        |min| format!("{min:.1}°"),
    )
    .map(ChartSeries::Histogram);

    ElevationAssessment {
        kind: Some(GeometryKind::Polygon),
        rows,
        chart,
        slope_chart,
        coverage: Some(coverage),
    }
}
