//! Great-circle lengths, geodesic areas, and per-kind measurements of a
//! target geometry.

use geo::{
    BoundingRect as _, ChamberlainDuquetteArea as _, Coord, Distance as _, Haversine,
    Length as _, LineString, MultiPolygon, Point, Rect,
};

use crate::{
    TargetGeometry,
    projection::{ProjectedCoord, to_projected},
};

/// Great-circle distance between two geographic points (`x` = lon), meters.
#[must_use]
pub fn haversine_m(a: Point<f64>, b: Point<f64>) -> f64 {
    Haversine.distance(a, b)
}

/// Sum of great-circle segment lengths, meters.
#[must_use]
pub fn line_length_m(line: &LineString<f64>) -> f64 {
    Haversine.length(line)
}

/// Geodesic area of a (multi-)polygon with holes removed, square meters.
#[must_use]
pub fn area_m2(polygon: &MultiPolygon<f64>) -> f64 {
    polygon.chamberlain_duquette_unsigned_area()
}

/// Total length of every ring, exterior and interior, meters.
#[must_use]
pub fn perimeter_m(polygon: &MultiPolygon<f64>) -> f64 {
    polygon
        .0
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .map(line_length_m)
        .sum()
}

/// Returns the point `distance_m` along `line`, measured by great-circle
/// segment lengths.
///
/// Distances past either end clamp to that end. Positions inside a
/// segment are interpolated linearly in lon/lat.
#[must_use]
pub fn interpolate_along(line: &LineString<f64>, distance_m: f64) -> Option<Point<f64>> {
    let first = line.0.first()?;
    if distance_m <= 0.0 || !distance_m.is_finite() {
        return Some((*first).into());
    }

    let mut travelled = 0.0;
    for segment in line.lines() {
        let length = Haversine.distance(Point::from(segment.start), Point::from(segment.end));
        if travelled + length >= distance_m {
            let t = if length > 0.0 {
                (distance_m - travelled) / length
            } else {
                0.0
            };
            return Some(
                Coord {
                    x: segment.start.x + t * (segment.end.x - segment.start.x),
                    y: segment.start.y + t * (segment.end.y - segment.start.y),
                }
                .into(),
            );
        }
        travelled += length;
    }

    line.0.last().map(|c| (*c).into())
}

/// Kind-specific measurements of a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurements {
    Point {
        position: ProjectedCoord,
    },
    Line {
        start: ProjectedCoord,
        end: ProjectedCoord,
        length_m: f64,
    },
    Polygon {
        area_m2: f64,
        perimeter_m: f64,
        /// Extent in projected coordinates (`x` = easting).
        projected_bounds: Option<Rect<f64>>,
    },
}

/// Measures a target geometry.
#[must_use]
pub fn measure(target: &TargetGeometry) -> Measurements {
    let project = |c: Coord<f64>| to_projected(c.y, c.x);

    match target {
        TargetGeometry::Point(p) => Measurements::Point {
            position: project(p.0),
        },
        TargetGeometry::Line(line) => {
            // Validated lines always have at least two vertices.
            let start = line.0.first().copied().unwrap_or_default();
            let end = line.0.last().copied().unwrap_or_default();
            Measurements::Line {
                start: project(start),
                end: project(end),
                length_m: line_length_m(line),
            }
        }
        TargetGeometry::Polygon(polygon) => {
            let projected: LineString<f64> = polygon
                .0
                .iter()
                .flat_map(|p| p.exterior().coords())
                .map(|c| {
                    let p = project(*c);
                    Coord {
                        x: p.easting,
                        y: p.northing,
                    }
                })
                .collect();
            Measurements::Polygon {
                area_m2: area_m2(polygon),
                perimeter_m: perimeter_m(polygon),
                projected_bounds: projected.bounding_rect(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{MapCoords as _, Polygon};

    use super::*;
    use crate::projection::to_geographic;

    fn square(min_lon: f64, min_lat: f64, size_deg: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (min_lon, min_lat),
                (min_lon + size_deg, min_lat),
                (min_lon + size_deg, min_lat + size_deg),
                (min_lon, min_lat + size_deg),
                (min_lon, min_lat),
            ]),
            vec![],
        )])
    }

    #[test]
    fn haversine_one_degree_of_latitude() {
        let d = haversine_m(Point::new(-61.5, 10.0), Point::new(-61.5, 11.0));
        assert!((d - 111_195.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn haversine_is_zero_for_identical_points() {
        let p = Point::new(-61.5, 10.65);
        assert!(haversine_m(p, p).abs() < f64::EPSILON);
    }

    #[test]
    fn interpolates_and_clamps() {
        let line = LineString::from(vec![(0.0, 0.0), (0.01, 0.0)]);
        let total = line_length_m(&line);

        let mid = interpolate_along(&line, total / 2.0).unwrap();
        assert!((mid.x() - 0.005).abs() < 1e-9);

        let past = interpolate_along(&line, total * 3.0).unwrap();
        assert!((past.x() - 0.01).abs() < 1e-12);

        let before = interpolate_along(&line, -10.0).unwrap();
        assert!(before.x().abs() < 1e-12);
    }

    #[test]
    fn polygon_measurements_are_plausible() {
        // ~1.1 km square near the equator
        let polygon = square(-63.0, 0.0, 0.01);
        let Measurements::Polygon {
            area_m2,
            perimeter_m,
            projected_bounds,
        } = measure(&TargetGeometry::Polygon(polygon))
        else {
            panic!("expected polygon measurements");
        };
        assert!((area_m2 - 1_236_000.0).abs() < 10_000.0, "area {area_m2}");
        assert!((perimeter_m - 4_447.8).abs() < 5.0, "perimeter {perimeter_m}");
        let bounds = projected_bounds.unwrap();
        assert!((bounds.min().x - 500_000.0).abs() < 0.01);
    }

    #[test]
    fn measurements_survive_projection_round_trip() {
        let polygon = square(-61.45, 10.6, 0.02);
        let round_tripped = polygon.map_coords(|c| {
            let p = to_projected(c.y, c.x);
            let (lat, lon) = to_geographic(p.easting, p.northing);
            Coord { x: lon, y: lat }
        });

        assert!((perimeter_m(&polygon) - perimeter_m(&round_tripped)).abs() < 0.01);
        assert!((area_m2(&polygon) - area_m2(&round_tripped)).abs() < 0.01 * perimeter_m(&polygon));

        let line = LineString::from(vec![(-61.5, 10.6), (-61.45, 10.62), (-61.4, 10.61)]);
        let line_rt = line.map_coords(|c| {
            let p = to_projected(c.y, c.x);
            let (lat, lon) = to_geographic(p.easting, p.northing);
            Coord { x: lon, y: lat }
        });
        assert!((line_length_m(&line) - line_length_m(&line_rt)).abs() < 0.01);
    }
}
