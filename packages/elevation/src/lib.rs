#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Elevation and slope assessment of a target geometry.
//!
//! [`planner`] picks how densely to sample, [`assess`] samples the DEM
//! and turns the readings into display rows and chart series, and
//! [`stats`] holds the summary and binning helpers they share.

pub mod assess;
pub mod planner;
pub mod stats;

pub use assess::{assess, assess_with};

use geo::Point;
use siting_raster::{RasterHandle, SlopeSample};

/// One DEM reading taken during an assessment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Geographic position (`x` = longitude).
    pub point: Point<f64>,
    pub elevation: Option<f64>,
    pub slope: Option<SlopeSample>,
}

/// Samples `points` in order.
///
/// Entries without an elevation are kept so callers can report coverage.
#[must_use]
pub fn sample_points(raster: &RasterHandle, points: &[Point<f64>]) -> Vec<Sample> {
    points
        .iter()
        .map(|&point| {
            let cell = raster.sample(point.x(), point.y());
            Sample {
                point,
                elevation: cell.elevation,
                slope: cell.slope,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use siting_raster::{RasterBounds, RasterCrs};

    use super::*;

    #[test]
    fn keeps_missing_samples_in_order() {
        let raster = RasterHandle::from_grid(
            RasterBounds {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 2.0,
                max_y: 1.0,
            },
            RasterCrs::Geographic,
            Some(-9999.0),
            &[vec![-9999.0, 12.0]],
        )
        .unwrap();

        let samples = sample_points(&raster, &[Point::new(0.5, 0.5), Point::new(1.5, 0.5)]);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].elevation, None);
        assert_eq!(samples[1].elevation, Some(12.0));
    }
}
