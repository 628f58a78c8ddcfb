//! Conversion between geographic WGS 84 coordinates and the fixed
//! projected system, UTM zone 20N (EPSG:32620).
//!
//! Both directions go through `proj4rs` with fixed PROJ definitions that
//! are parsed once per process.

use std::sync::LazyLock;

use geo::{Coord, Geometry, MapCoords as _, Point};
use proj4rs::{proj::Proj, transform::transform};

/// EPSG code of the projected system.
pub const PROJECTED_EPSG: u16 = 32620;

/// Display name of the projected system.
pub const PROJECTED_CRS_LABEL: &str = "UTM WGS 1984 Zone 20N";

/// A position in the projected system, meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedCoord {
    pub easting: f64,
    pub northing: f64,
}

/// PROJ definition of geographic WGS 84.
pub const GEOGRAPHIC_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// PROJ definition of the projected system.
pub const PROJECTED_PROJ: &str = "+proj=utm +zone=20 +datum=WGS84 +units=m +no_defs";

struct Utm20N {
    geographic: Proj,
    projected: Proj,
}

static UTM_20N: LazyLock<Utm20N> = LazyLock::new(|| Utm20N {
    geographic: parse_proj(GEOGRAPHIC_PROJ),
    projected: parse_proj(PROJECTED_PROJ),
});

fn parse_proj(definition: &str) -> Proj {
    Proj::from_proj_string(definition)
        .unwrap_or_else(|e| panic!("Failed to parse projection '{definition}': {e:?}"))
}

/// Runs one coordinate through the transform. Geographic values are
/// radians. Non-finite input and rejected positions yield `None`.
fn convert(from: &Proj, to: &Proj, x: f64, y: f64) -> Option<(f64, f64)> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    let mut point = (x, y, 0.0);
    match transform(from, to, &mut point) {
        Ok(()) => Some((point.0, point.1)),
        Err(e) => {
            log::debug!("Projection of ({x}, {y}) failed: {e:?}");
            None
        }
    }
}

fn forward(lat: f64, lon: f64) -> Option<ProjectedCoord> {
    let utm = &*UTM_20N;
    convert(
        &utm.geographic,
        &utm.projected,
        lon.to_radians(),
        lat.to_radians(),
    )
    .map(|(easting, northing)| ProjectedCoord { easting, northing })
}

fn inverse(easting: f64, northing: f64) -> Option<(f64, f64)> {
    let utm = &*UTM_20N;
    convert(&utm.projected, &utm.geographic, easting, northing)
        .map(|(lon, lat)| (lat.to_degrees(), lon.to_degrees()))
}

/// Projects a geographic position into the fixed projected system.
///
/// Positions the transform cannot handle come back as NaN.
#[must_use]
pub fn to_projected(lat: f64, lon: f64) -> ProjectedCoord {
    forward(lat, lon).unwrap_or(ProjectedCoord {
        easting: f64::NAN,
        northing: f64::NAN,
    })
}

/// Converts a projected position back to geographic `(lat, lon)`.
///
/// Positions the transform cannot handle come back as NaN.
#[must_use]
pub fn to_geographic(easting: f64, northing: f64) -> (f64, f64) {
    inverse(easting, northing).unwrap_or((f64::NAN, f64::NAN))
}

/// Converts a projected position to a geographic point (`x` = lon).
#[must_use]
pub fn unproject_coord(coord: Coord<f64>) -> Point<f64> {
    let (lat, lon) = to_geographic(coord.x, coord.y);
    Point::new(lon, lat)
}

/// Projects every coordinate of a geographic geometry.
#[must_use]
pub fn project_geometry(geometry: &Geometry<f64>) -> Geometry<f64> {
    geometry.map_coords(|c| {
        let p = to_projected(c.y, c.x);
        Coord {
            x: p.easting,
            y: p.northing,
        }
    })
}

/// Converts every coordinate of a projected geometry back to geographic.
#[must_use]
pub fn unproject_geometry(geometry: &Geometry<f64>) -> Geometry<f64> {
    geometry.map_coords(|c| unproject_coord(c).0)
}
