//! Geometry metrics block: the target's projected coordinates, length or
//! area, rendered as display rows.

use siting_analysis_models::{GeometryMetrics, MetricRow, format};
use siting_geometry::{
    TargetGeometry,
    measure::{Measurements, measure},
    projection::{PROJECTED_CRS_LABEL, ProjectedCoord},
};

fn coordinate(value: f64) -> String {
    format::number(Some(value), 2)
}

fn coordinate_pair(c: ProjectedCoord) -> String {
    format!("{}, {}", coordinate(c.easting), coordinate(c.northing))
}

/// Names the two ends of a line by the axis it mostly runs along.
fn end_labels(start: ProjectedCoord, end: ProjectedCoord) -> (&'static str, &'static str) {
    let de = end.easting - start.easting;
    let dn = end.northing - start.northing;

    if de.abs() >= dn.abs() {
        if start.easting <= end.easting {
            ("Western End", "Eastern End")
        } else {
            ("Eastern End", "Western End")
        }
    } else if start.northing <= end.northing {
        ("Southern End", "Northern End")
    } else {
        ("Northern End", "Southern End")
    }
}

/// Builds the metrics block for `target`.
#[must_use]
pub fn geometry_metrics(target: &TargetGeometry) -> GeometryMetrics {
    let crs = MetricRow::new("CRS", PROJECTED_CRS_LABEL);

    let rows = match measure(target) {
        Measurements::Point { position } => vec![
            crs,
            MetricRow::new("Easting", coordinate(position.easting)),
            MetricRow::new("Northing", coordinate(position.northing)),
        ],
        Measurements::Line {
            start,
            end,
            length_m,
        } => {
            let (first, last) = end_labels(start, end);
            vec![
                crs,
                MetricRow::new(format!("{first} (E,N)"), coordinate_pair(start)),
                MetricRow::new(format!("{last} (E,N)"), coordinate_pair(end)),
                MetricRow::new("Total Length", format::meters(Some(length_m))),
            ]
        }
        Measurements::Polygon {
            area_m2,
            perimeter_m,
            projected_bounds,
        } => {
            let bounds = projected_bounds.map_or_else(
                || format::DASH.to_string(),
                |b| {
                    format!(
                        "E: {} to {}; N: {} to {}",
                        coordinate(b.min().x),
                        coordinate(b.max().x),
                        coordinate(b.min().y),
                        coordinate(b.max().y)
                    )
                },
            );
            vec![
                crs,
                MetricRow::new("Bounding Box (UTM)", bounds),
                MetricRow::new("Perimeter", format::meters(Some(perimeter_m))),
                MetricRow::new("Area", format::area(Some(area_m2))),
            ]
        }
    };

    GeometryMetrics {
        kind: target.kind(),
        rows,
    }
}
