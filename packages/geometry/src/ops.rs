//! Metric geometry operations: buffering, containment, intersection, and
//! nearest-edge distances.
//!
//! Inputs and outputs are geographic. Buffers and nearest points are
//! computed in the projected system so radii and distances are meters.

use geo::{
    Buffer as _, Closest, ClosestPoint as _, Coord, Distance as _, Euclidean, Geometry,
    Intersects as _, LineString, MultiLineString, MultiPolygon, Point, Polygon,
};

use crate::{
    measure::haversine_m,
    projection::{project_geometry, unproject_coord, unproject_geometry},
};

/// Clamps a buffer radius to a usable value. Negative and non-finite
/// radii become zero.
#[must_use]
pub fn normalize_radius(radius_m: f64) -> f64 {
    if radius_m.is_finite() && radius_m > 0.0 {
        radius_m
    } else {
        0.0
    }
}

/// Buffers `geometry` outward by `radius_m` meters.
///
/// Returns `None` for a zero radius: no buffering is performed and
/// callers fall back to the raw geometry.
#[must_use]
pub fn buffer_by(geometry: &Geometry<f64>, radius_m: f64) -> Option<MultiPolygon<f64>> {
    let radius = normalize_radius(radius_m);
    if radius <= 0.0 {
        return None;
    }

    let projected = project_geometry(geometry);
    let buffered = projected.buffer(radius);
    if buffered.0.is_empty() {
        log::debug!("buffer of {radius} m produced an empty polygon");
        return None;
    }

    match unproject_geometry(&Geometry::MultiPolygon(buffered)) {
        Geometry::MultiPolygon(mp) => Some(mp),
        _ => None,
    }
}

/// Returns `true` if `point` lies inside or on the boundary of `polygon`.
#[must_use]
pub fn point_in_polygon(point: Point<f64>, polygon: &MultiPolygon<f64>) -> bool {
    polygon.intersects(&point)
}

/// Returns `true` if the two geometries share any point.
#[must_use]
pub fn boundary_intersects(a: &Geometry<f64>, b: &Geometry<f64>) -> bool {
    a.intersects(b)
}

/// Returns the linear boundary of a geometry: polygon rings or the lines
/// themselves. Point-like geometries have no outline.
#[must_use]
pub fn outline(geometry: &Geometry<f64>) -> Option<MultiLineString<f64>> {
    fn rings(polygon: &Polygon<f64>) -> impl Iterator<Item = LineString<f64>> + '_ {
        std::iter::once(polygon.exterior().clone()).chain(polygon.interiors().iter().cloned())
    }

    let lines: Vec<LineString<f64>> = match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => return None,
        Geometry::Line(l) => vec![LineString::from(vec![l.start, l.end])],
        Geometry::LineString(ls) => vec![ls.clone()],
        Geometry::MultiLineString(mls) => mls.0.clone(),
        Geometry::Polygon(p) => rings(p).collect(),
        Geometry::MultiPolygon(mp) => mp.0.iter().flat_map(rings).collect(),
        Geometry::Rect(r) => rings(&r.to_polygon()).collect(),
        Geometry::Triangle(t) => rings(&t.to_polygon()).collect(),
        Geometry::GeometryCollection(gc) => gc
            .0
            .iter()
            .filter_map(outline)
            .flat_map(|mls| mls.0)
            .collect(),
    };

    let lines: Vec<_> = lines.into_iter().filter(|l| l.0.len() >= 2).collect();
    if lines.is_empty() {
        None
    } else {
        Some(MultiLineString::new(lines))
    }
}

fn vertices(geometry: &Geometry<f64>) -> Vec<Coord<f64>> {
    use geo::CoordsIter as _;
    geometry.coords_iter().collect()
}

fn closest_on(outline: &MultiLineString<f64>, from: Point<f64>) -> Option<Point<f64>> {
    match outline.closest_point(&from) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => Some(p),
        Closest::Indeterminate => None,
    }
}

/// Returns the point on the boundary of `geometry` closest to `reference`.
///
/// For point-like geometries the nearest vertex is returned.
#[must_use]
pub fn nearest_point_on_boundary(
    geometry: &Geometry<f64>,
    reference: Point<f64>,
) -> Option<Point<f64>> {
    let projected = project_geometry(geometry);
    let Geometry::Point(from) = project_geometry(&Geometry::Point(reference)) else {
        return None;
    };

    let nearest = match outline(&projected) {
        Some(lines) => closest_on(&lines, from)?,
        None => vertices(&projected)
            .into_iter()
            .map(Point::from)
            .min_by(|a, b| {
                Euclidean
                    .distance(*a, from)
                    .total_cmp(&Euclidean.distance(*b, from))
            })?,
    };

    Some(unproject_coord(nearest.0))
}

/// Closest pair between the vertices of one side and the outline of the
/// other, in projected coordinates.
fn closest_pair(
    from: &[Coord<f64>],
    onto: &MultiLineString<f64>,
) -> Option<(Point<f64>, Point<f64>, f64)> {
    from.iter()
        .filter_map(|c| {
            let p = Point::from(*c);
            closest_on(onto, p).map(|q| (p, q, Euclidean.distance(p, q)))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
}

/// How a geometry takes part in an edge distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Point,
    Line,
    Area,
}

fn dimension(geometry: &Geometry<f64>) -> Dimension {
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => Dimension::Point,
        Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_) => Dimension::Area,
        Geometry::Line(_)
        | Geometry::LineString(_)
        | Geometry::MultiLineString(_)
        | Geometry::GeometryCollection(_) => Dimension::Line,
    }
}

/// Shortest distance between the edges of two geometries, meters.
///
/// Two areal geometries are measured ring to ring, so a polygon fully
/// containing the other still yields the gap to its rings. A point is
/// projected onto the outline of the other side. Any other pairing, line
/// to line for instance, has no defined edge distance and returns `None`.
#[must_use]
pub fn nearest_edge_distance(a: &Geometry<f64>, b: &Geometry<f64>) -> Option<f64> {
    let pa = project_geometry(a);
    let pb = project_geometry(b);

    let best = match (dimension(a), dimension(b)) {
        (Dimension::Area, Dimension::Area) => {
            let (oa, ob) = (outline(&pa)?, outline(&pb)?);
            let forward = closest_pair(&vertices(&pa), &ob);
            let backward = closest_pair(&vertices(&pb), &oa);
            match (forward, backward) {
                (Some(f), Some(r)) => Some(if f.2 <= r.2 { f } else { r }),
                (f, r) => f.or(r),
            }
        }
        (Dimension::Point, Dimension::Line | Dimension::Area) => {
            closest_pair(&vertices(&pa), &outline(&pb)?)
        }
        (Dimension::Line | Dimension::Area, Dimension::Point) => {
            closest_pair(&vertices(&pb), &outline(&pa)?)
        }
        _ => None,
    }?;

    Some(haversine_m(unproject_coord(best.0.0), unproject_coord(best.1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{to_geographic, to_projected};

    /// Point `dx`/`dy` meters east/north of (lat, lon).
    fn offset(lat: f64, lon: f64, dx: f64, dy: f64) -> Point<f64> {
        let p = to_projected(lat, lon);
        let (lat, lon) = to_geographic(p.easting + dx, p.northing + dy);
        Point::new(lon, lat)
    }

    fn square_around(lat: f64, lon: f64, half_m: f64) -> MultiPolygon<f64> {
        let corners = [
            offset(lat, lon, -half_m, -half_m),
            offset(lat, lon, half_m, -half_m),
            offset(lat, lon, half_m, half_m),
            offset(lat, lon, -half_m, half_m),
            offset(lat, lon, -half_m, -half_m),
        ];
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(corners.iter().map(|p| p.0).collect::<Vec<_>>()),
            vec![],
        )])
    }

    const LAT: f64 = 10.6;
    const LON: f64 = -61.4;

    #[test]
    fn zero_or_invalid_radius_means_no_buffer() {
        let point = Geometry::Point(Point::new(LON, LAT));
        assert!(buffer_by(&point, 0.0).is_none());
        assert!(buffer_by(&point, -5.0).is_none());
        assert!(buffer_by(&point, f64::NAN).is_none());
        assert!((normalize_radius(-1.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn point_buffer_covers_radius() {
        let buffered = buffer_by(&Geometry::Point(Point::new(LON, LAT)), 100.0).unwrap();
        assert!(point_in_polygon(offset(LAT, LON, 50.0, 0.0), &buffered));
        assert!(point_in_polygon(offset(LAT, LON, 0.0, -95.0), &buffered));
        assert!(!point_in_polygon(offset(LAT, LON, 150.0, 0.0), &buffered));
    }

    #[test]
    fn boundary_counts_as_inside() {
        let square = square_around(LAT, LON, 100.0);
        let corner = Point::from(square.0[0].exterior().0[0]);
        assert!(point_in_polygon(corner, &square));
    }

    #[test]
    fn edge_distance_between_separated_squares() {
        let a = Geometry::MultiPolygon(square_around(LAT, LON, 100.0));
        // centers 500 m apart, each 200 m wide -> 300 m gap
        let center_b = offset(LAT, LON, 500.0, 0.0);
        let b = Geometry::MultiPolygon(square_around(center_b.y(), center_b.x(), 100.0));

        let d = nearest_edge_distance(&a, &b).unwrap();
        assert!((d - 300.0).abs() < 1.0, "got {d}");
        assert!(!boundary_intersects(&a, &b));
    }

    #[test]
    fn edge_distance_from_point_to_polygon() {
        let square = Geometry::MultiPolygon(square_around(LAT, LON, 100.0));
        let point = Geometry::Point(offset(LAT, LON, 0.0, 250.0));
        let d = nearest_edge_distance(&point, &square).unwrap();
        assert!((d - 150.0).abs() < 1.0, "got {d}");
    }

    #[test]
    fn edge_distance_between_points_is_unavailable() {
        let a = Geometry::Point(Point::new(LON, LAT));
        let b = Geometry::Point(offset(LAT, LON, 10.0, 0.0));
        assert!(nearest_edge_distance(&a, &b).is_none());
    }

    #[test]
    fn edge_distance_from_point_to_line() {
        let line = Geometry::LineString(LineString::from(vec![
            offset(LAT, LON, -100.0, 0.0).0,
            offset(LAT, LON, 100.0, 0.0).0,
        ]));
        let point = Geometry::Point(offset(LAT, LON, 0.0, 80.0));
        let d = nearest_edge_distance(&line, &point).unwrap();
        assert!((d - 80.0).abs() < 1.0, "got {d}");
    }

    #[test]
    fn edge_distance_involving_a_line_without_a_point_is_unavailable() {
        let line = Geometry::LineString(LineString::from(vec![
            offset(LAT, LON, -100.0, 0.0).0,
            offset(LAT, LON, 100.0, 0.0).0,
        ]));
        let parallel = Geometry::LineString(LineString::from(vec![
            offset(LAT, LON, -100.0, 200.0).0,
            offset(LAT, LON, 100.0, 200.0).0,
        ]));
        let center = offset(LAT, LON, 0.0, 400.0);
        let square = Geometry::MultiPolygon(square_around(center.y(), center.x(), 50.0));

        assert!(nearest_edge_distance(&line, &parallel).is_none());
        assert!(nearest_edge_distance(&line, &square).is_none());
        assert!(nearest_edge_distance(&square, &line).is_none());
    }

    #[test]
    fn nearest_boundary_point_lies_on_edge() {
        let square = Geometry::MultiPolygon(square_around(LAT, LON, 100.0));
        let nearest = nearest_point_on_boundary(&square, offset(LAT, LON, 0.0, 400.0)).unwrap();
        let expected = offset(LAT, LON, 0.0, 100.0);
        assert!(haversine_m(nearest, expected) < 1.0);
    }
}
