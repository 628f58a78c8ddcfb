//! Record proximity, sensitive-area proximity, and attribute intersection.

use geo::{BoundingRect as _, Geometry, MultiPolygon, Point, Rect};
use siting_analysis_models::{
    AreaDistance, AttributeGroup, IntersectionRow, ProximityRow, Record, RecordFieldConfig,
    SensitiveAreaLayer,
};
use siting_geometry::{
    TargetGeometry,
    ops::{boundary_intersects, buffer_by, nearest_edge_distance, point_in_polygon},
    projection::to_geographic,
};

use crate::LayerCatalog;

/// Reads a numeric field that may be stored as a number or numeric text.
#[must_use]
pub fn numeric_field(record: &Record, field: &str) -> Option<f64> {
    let value = match record.get(field)? {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Geographic position of a record from its projected coordinate pair.
fn record_position(record: &Record, fields: &RecordFieldConfig) -> Option<Point<f64>> {
    let easting = numeric_field(record, &fields.easting)?;
    let northing = numeric_field(record, &fields.northing)?;
    let (lat, lon) = to_geographic(easting, northing);
    (lat.is_finite() && lon.is_finite()).then(|| Point::new(lon, lat))
}

/// Returns the records located near `target`, in dataset order.
///
/// A polygon target matches records inside it or inside its buffer. Point
/// and line targets match only through the buffer, so with a zero radius
/// they match nothing. Records without a usable coordinate pair are
/// skipped.
#[must_use]
pub fn find_nearby_records<'a>(
    target: &TargetGeometry,
    records: &'a [Record],
    radius_m: f64,
    fields: &RecordFieldConfig,
) -> Vec<&'a Record> {
    let buffer = buffer_by(&target.to_geometry(), radius_m);
    let raw_polygon = match target {
        TargetGeometry::Polygon(polygon) => Some(polygon),
        TargetGeometry::Point(_) | TargetGeometry::Line(_) => None,
    };

    if buffer.is_none() && raw_polygon.is_none() {
        log::debug!("{} target without buffer matches no records", target.kind());
        return vec![];
    }

    let extent = union_rect(
        buffer.as_ref().and_then(MultiPolygon::bounding_rect),
        raw_polygon.and_then(MultiPolygon::bounding_rect),
    );

    let mut skipped = 0_usize;
    let matches: Vec<&Record> = records
        .iter()
        .filter(|record| {
            let Some(point) = record_position(record, fields) else {
                skipped += 1;
                return false;
            };
            if extent.is_some_and(|r| !rect_contains(r, point)) {
                return false;
            }
            raw_polygon.is_some_and(|p| point_in_polygon(point, p))
                || buffer.as_ref().is_some_and(|b| point_in_polygon(point, b))
        })
        .collect();

    if skipped > 0 {
        log::warn!(
            "Skipped {skipped} of {} records without a usable {}/{} pair",
            records.len(),
            fields.easting,
            fields.northing
        );
    }
    log::debug!(
        "{} of {} records within {radius_m} m",
        matches.len(),
        records.len()
    );

    matches
}

/// Lists the sensitive-area features that touch `target` or lie within
/// `radius_m` of it.
///
/// Touching features read "within boundaries"; features only inside the
/// buffer carry their nearest-edge distance, or "distance unavailable"
/// when the pairing has none (a line target against any feature, for
/// instance). Rows are unique by label and
/// distance, in first-seen order. A configured layer that is absent from
/// the catalog yields one "layer unavailable" row.
#[must_use]
pub fn find_nearby_areas(
    target: &TargetGeometry,
    catalog: &LayerCatalog,
    layers: &[SensitiveAreaLayer],
    radius_m: f64,
) -> Vec<ProximityRow> {
    let shape = target.to_geometry();
    let buffer = buffer_by(&shape, radius_m).map(Geometry::MultiPolygon);
    let search = union_rect(
        shape.bounding_rect(),
        buffer.as_ref().and_then(Geometry::bounding_rect),
    );

    let mut rows: Vec<ProximityRow> = Vec::new();
    let mut push = |row: ProximityRow| {
        if !rows
            .iter()
            .any(|r| r.label == row.label && r.distance == row.distance)
        {
            rows.push(row);
        }
    };

    for config in layers {
        let Some(layer) = catalog.get(&config.layer) else {
            log::warn!("Sensitive area layer {} is not available", config.layer);
            push(ProximityRow::new(&config.layer, AreaDistance::LayerUnavailable));
            continue;
        };
        let Some(search) = search else {
            continue;
        };

        for feature in layer.candidates(search) {
            let distance = if boundary_intersects(&shape, &feature.geometry) {
                AreaDistance::WithinBoundaries
            } else if buffer
                .as_ref()
                .is_some_and(|b| boundary_intersects(b, &feature.geometry))
            {
                nearest_edge_distance(&shape, &feature.geometry)
                    .map_or(AreaDistance::Unavailable, AreaDistance::Meters)
            } else {
                continue;
            };

            let label = config
                .label_field
                .as_deref()
                .and_then(|field| feature.attribute(field))
                .map_or_else(
                    || config.layer.clone(),
                    |sub| format!("{} - {sub}", config.layer),
                );

            push(ProximityRow::new(label, distance));
        }
    }

    rows
}

/// Collects, per attribute group, the distinct label values of features
/// that intersect `target`.
///
/// Groups are reported in the given order. A group with no intersecting
/// values reads "None"; a group none of whose layers were supplied reads
/// "Layer unavailable".
#[must_use]
pub fn intersecting_attributes(
    target: &TargetGeometry,
    catalog: &LayerCatalog,
    groups: &[AttributeGroup],
) -> Vec<IntersectionRow> {
    let shape = target.to_geometry();
    let search = shape.bounding_rect();

    groups
        .iter()
        .map(|group| {
            let mut values: Vec<String> = Vec::new();
            let mut unavailable_layers = Vec::new();

            for layer_name in &group.layers {
                let Some(layer) = catalog.get(layer_name) else {
                    unavailable_layers.push(layer_name.clone());
                    continue;
                };
                let Some(search) = search else {
                    continue;
                };

                let field = group.label_field_for(layer_name);
                for feature in layer.candidates(search) {
                    if !boundary_intersects(&shape, &feature.geometry) {
                        continue;
                    }
                    if let Some(value) = feature.attribute(field)
                        && !values.contains(&value)
                    {
                        values.push(value);
                    }
                }
            }

            let values = if !group.layers.is_empty() && unavailable_layers.len() == group.layers.len()
            {
                log::warn!("No layer of group {} is available", group.name);
                "Layer unavailable".to_string()
            } else if values.is_empty() {
                "None".to_string()
            } else {
                values.join(", ")
            };

            if !unavailable_layers.is_empty() {
                log::warn!(
                    "Group {}: layers not available: {}",
                    group.name,
                    unavailable_layers.join(", ")
                );
            }

            IntersectionRow {
                group: group.name.clone(),
                values,
                unavailable_layers,
            }
        })
        .collect()
}

fn union_rect(a: Option<Rect<f64>>, b: Option<Rect<f64>>) -> Option<Rect<f64>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Rect::new(
            geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
            geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
        )),
        (a, b) => a.or(b),
    }
}

fn rect_contains(rect: Rect<f64>, point: Point<f64>) -> bool {
    point.x() >= rect.min().x
        && point.x() <= rect.max().x
        && point.y() >= rect.min().y
        && point.y() <= rect.max().y
}
