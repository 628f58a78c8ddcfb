//! Sampling density selection.
//!
//! Steps grow with the size of the target and never drop below two
//! raster cells; sample counts are capped so every query stays cheap.

use geo::{Coord, Geometry, InteriorPoint as _, Intersects as _, MultiPolygon, Point};
use rand::SeedableRng as _;
use rand_chacha::ChaCha8Rng;
use siting_geometry::projection::{project_geometry, unproject_coord};
use siting_raster::PixelMeters;

/// Finest step ever used, meters.
pub const MIN_STEP_M: f64 = 25.0;
/// Coarsest base step for lines, meters.
pub const MAX_LINE_STEP_M: f64 = 200.0;
/// Samples a line aims for before clamping.
pub const LINE_TARGET_SAMPLES: f64 = 200.0;
/// Hard cap on line samples.
pub const MAX_LINE_SAMPLES: usize = 350;
/// Hard cap on polygon grid points.
pub const MAX_GRID_POINTS: usize = 600;
/// Base polygon step when the area is unknown, meters.
pub const UNKNOWN_AREA_STEP_M: f64 = 75.0;

/// Smallest step that still spans about two raster cells.
#[must_use]
pub fn min_step_for_pixel(pixel: PixelMeters) -> f64 {
    let px = pixel.dx.max(pixel.dy);
    if !px.is_finite() || px <= 0.0 {
        return MIN_STEP_M;
    }
    MIN_STEP_M.max(2.0 * px)
}

/// Base step for a line of `length_m` meters.
#[must_use]
pub fn line_step(length_m: f64) -> f64 {
    (length_m / LINE_TARGET_SAMPLES).clamp(MIN_STEP_M, MAX_LINE_STEP_M)
}

/// Base step for a polygon of `area_m2` square meters.
#[must_use]
pub fn polygon_step(area_m2: f64) -> f64 {
    if !area_m2.is_finite() || area_m2 <= 0.0 {
        UNKNOWN_AREA_STEP_M
    } else if area_m2 < 50_000.0 {
        25.0
    } else if area_m2 < 300_000.0 {
        50.0
    } else if area_m2 < 2_000_000.0 {
        100.0
    } else {
        200.0
    }
}

/// Equally spaced samples along a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePlan {
    pub step_m: f64,
    pub samples: usize,
}

impl LinePlan {
    /// Distance of sample `i` from the start of a line of `length_m`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn distance_of(&self, i: usize, length_m: f64) -> f64 {
        if self.samples < 2 {
            return 0.0;
        }
        i as f64 / (self.samples - 1) as f64 * length_m
    }
}

/// Chooses the spacing and sample count for a line.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn plan_line(length_m: f64, pixel: PixelMeters) -> LinePlan {
    let length = if length_m.is_finite() { length_m.max(0.0) } else { 0.0 };
    let step_m = line_step(length).max(min_step_for_pixel(pixel));

    let wanted = (length / step_m).ceil() + 1.0;
    let samples = (wanted.min(MAX_LINE_SAMPLES as f64) as usize).clamp(2, MAX_LINE_SAMPLES);

    LinePlan { step_m, samples }
}

/// Grid points inside a polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPlan {
    pub step_m: f64,
    /// Geographic sample positions, at most [`MAX_GRID_POINTS`].
    pub points: Vec<Point<f64>>,
    /// Grid points inside the polygon before downsampling.
    pub candidates: usize,
    /// `true` when no grid point fell inside and the interior point was
    /// used instead.
    pub fallback: bool,
}

/// Lays a square grid over a polygon, keeps the points inside it, and
/// downsamples to [`MAX_GRID_POINTS`] with a seeded uniform subset.
#[must_use]
pub fn plan_polygon(
    polygon: &MultiPolygon<f64>,
    area_m2: f64,
    pixel: PixelMeters,
    seed: u64,
) -> GridPlan {
    let step_m = polygon_step(area_m2).max(min_step_for_pixel(pixel));
    let inside = grid_inside(polygon, step_m);
    let candidates = inside.len();

    if inside.is_empty() {
        log::debug!("No {step_m} m grid point inside polygon, using its interior point");
        return GridPlan {
            step_m,
            points: polygon.interior_point().into_iter().collect(),
            candidates,
            fallback: true,
        };
    }

    let points = downsample(inside, MAX_GRID_POINTS, seed);
    log::debug!(
        "Polygon grid: {step_m} m step, {candidates} points inside, {} sampled",
        points.len()
    );

    GridPlan {
        step_m,
        points,
        candidates,
        fallback: false,
    }
}

/// Grid points, column by column from the south-west, centred in the
/// polygon's projected bounding box.
///
/// Each lattice point is converted back to lon/lat before masking, so
/// every returned point lies in or on the geographic polygon.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn grid_inside(polygon: &MultiPolygon<f64>, step_m: f64) -> Vec<Point<f64>> {
    use geo::BoundingRect as _;

    let Geometry::MultiPolygon(projected) =
        project_geometry(&Geometry::MultiPolygon(polygon.clone()))
    else {
        return vec![];
    };
    let Some(bounds) = projected.bounding_rect() else {
        return vec![];
    };
    if !(step_m.is_finite() && step_m > 0.0) {
        return vec![];
    }

    let cols = (bounds.width() / step_m).floor() as usize;
    let rows = (bounds.height() / step_m).floor() as usize;
    let x0 = bounds.min().x + (bounds.width() - cols as f64 * step_m) / 2.0;
    let y0 = bounds.min().y + (bounds.height() - rows as f64 * step_m) / 2.0;

    let mut points = Vec::new();
    for c in 0..=cols {
        let x = x0 + c as f64 * step_m;
        for r in 0..=rows {
            let point = unproject_coord(Coord {
                x,
                y: y0 + r as f64 * step_m,
            });
            if polygon.intersects(&point) {
                points.push(point);
            }
        }
    }
    points
}

/// Keeps a uniformly random subset of at most `max` items, in their
/// original order. The same seed always picks the same subset.
#[must_use]
pub fn downsample<T>(items: Vec<T>, max: usize, seed: u64) -> Vec<T> {
    if items.len() <= max {
        return items;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut keep = rand::seq::index::sample(&mut rng, items.len(), max).into_vec();
    keep.sort_unstable();

    let mut keep = keep.into_iter().peekable();
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            if keep.peek() == Some(&i) {
                keep.next();
                Some(item)
            } else {
                None
            }
        })
        .collect()
}
