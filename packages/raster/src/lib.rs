#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Elevation raster access.
//!
//! A [`RasterHandle`] holds one fully decoded elevation model in memory
//! together with its georeferencing. The [`DemProvider`] loads it lazily on
//! first use and shares the pending load between concurrent callers, so a
//! session never decodes the same raster twice.
//!
//! Cell addressing maps the bounding box linearly onto the grid and clamps
//! to the edge, so positions outside the raster read the nearest edge cell.

pub mod geotiff;
pub mod loader;
pub mod provider;

pub use loader::{GeoTiffFileLoader, GeoTiffUrlLoader, InMemoryLoader, RasterLoader};
pub use provider::DemProvider;

use siting_geometry::projection::to_projected;
use thiserror::Error;

/// Errors that can occur while loading a raster.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// HTTP request failed while fetching a remote raster.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The file decodes but lacks usable georeferencing.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Pixel size is zero or non-finite.
    #[error("Invalid pixel size {x} x {y}")]
    InvalidPixelSize { x: f64, y: f64 },

    /// Grid dimensions disagree with the data length.
    #[error("Raster is {width} x {height} but holds {len} values")]
    DimensionMismatch {
        width: usize,
        height: usize,
        len: usize,
    },

    /// A background decoding task failed to complete.
    #[error("Raster load task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Coordinate system of the raster grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterCrs {
    /// Longitude/latitude degrees.
    Geographic,
    /// The fixed projected system (UTM zone 20N), meters.
    Projected,
}

/// Grid extent in the raster's own coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// Local slope derived from neighbouring cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeSample {
    pub degrees: f64,
    pub percent: f64,
}

/// Elevation and slope read at one position.
///
/// `slope` is `None` whenever `elevation` is, and also when a neighbour
/// cell is unavailable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSample {
    pub elevation: Option<f64>,
    pub slope: Option<SlopeSample>,
}

/// Real-world size of one cell, meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelMeters {
    pub dx: f64,
    pub dy: f64,
}

/// A decoded, georeferenced elevation grid.
#[derive(Debug, Clone)]
pub struct RasterHandle {
    bounds: RasterBounds,
    width: usize,
    height: usize,
    pixel_size_x: f64,
    pixel_size_y: f64,
    no_data: Option<f32>,
    crs: RasterCrs,
    /// Row-major, north to south, west to east.
    data: Vec<f32>,
}

impl RasterHandle {
    /// Builds a handle from row-major grid values.
    ///
    /// # Errors
    ///
    /// Returns an error if the data length does not match the dimensions
    /// or the derived pixel size is zero or non-finite.
    pub fn new(
        bounds: RasterBounds,
        width: usize,
        height: usize,
        crs: RasterCrs,
        no_data: Option<f32>,
        data: Vec<f32>,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(RasterError::DimensionMismatch {
                width,
                height,
                len: data.len(),
            });
        }

        #[allow(clippy::cast_precision_loss)]
        let (pixel_size_x, pixel_size_y) = (
            (bounds.max_x - bounds.min_x) / width as f64,
            (bounds.max_y - bounds.min_y) / height as f64,
        );

        let usable = |v: f64| v.is_finite() && v.abs() > 0.0;
        if !usable(pixel_size_x) || !usable(pixel_size_y) {
            return Err(RasterError::InvalidPixelSize {
                x: pixel_size_x,
                y: pixel_size_y,
            });
        }

        Ok(Self {
            bounds,
            width,
            height,
            pixel_size_x,
            pixel_size_y,
            no_data,
            crs,
            data,
        })
    }

    /// Builds a handle from a list of rows, north row first.
    ///
    /// # Errors
    ///
    /// Returns an error if rows are ragged or the pixel size is invalid.
    pub fn from_grid(
        bounds: RasterBounds,
        crs: RasterCrs,
        no_data: Option<f32>,
        rows: &[Vec<f32>],
    ) -> Result<Self, RasterError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let data: Vec<f32> = rows.iter().flatten().copied().collect();
        Self::new(bounds, width, height, crs, no_data, data)
    }

    #[must_use]
    pub const fn bounds(&self) -> RasterBounds {
        self.bounds
    }

    #[must_use]
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[must_use]
    pub const fn crs(&self) -> RasterCrs {
        self.crs
    }

    #[must_use]
    pub const fn no_data(&self) -> Option<f32> {
        self.no_data
    }

    /// Pixel size in raster units (degrees or meters).
    #[must_use]
    pub const fn pixel_size(&self) -> (f64, f64) {
        (self.pixel_size_x, self.pixel_size_y)
    }

    /// Converts a geographic position to the raster's own coordinates.
    #[must_use]
    pub fn native_coord(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self.crs {
            RasterCrs::Projected => {
                let p = to_projected(lat, lon);
                (p.easting, p.northing)
            }
            RasterCrs::Geographic => (lon, lat),
        }
    }

    /// Maps native coordinates to a `(col, row)` cell, clamped to the grid.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn cell_index(&self, x: f64, y: f64) -> (usize, usize) {
        let b = &self.bounds;
        let col = ((x - b.min_x) / (b.max_x - b.min_x) * self.width as f64).floor();
        let row = ((b.max_y - y) / (b.max_y - b.min_y) * self.height as f64).floor();

        let clamp = |v: f64, len: usize| -> usize {
            if v.is_nan() || v <= 0.0 {
                0
            } else {
                (v as usize).min(len - 1)
            }
        };

        (clamp(col, self.width), clamp(row, self.height))
    }

    /// Reads one cell, clamping indices to the grid.
    ///
    /// Returns `None` for no-data and non-finite values.
    #[must_use]
    pub fn value_at(&self, col: usize, row: usize) -> Option<f64> {
        let col = col.min(self.width - 1);
        let row = row.min(self.height - 1);
        let value = *self.data.get(row * self.width + col)?;

        if !value.is_finite() {
            return None;
        }
        if let Some(no_data) = self.no_data
            && (value - no_data).abs() < 0.001
        {
            return None;
        }

        Some(f64::from(value))
    }

    /// Real-world cell size near `lat`.
    ///
    /// Projected rasters use the pixel size directly; geographic rasters
    /// use a local meters-per-degree approximation.
    #[must_use]
    pub fn meters_per_pixel(&self, lat: f64) -> PixelMeters {
        match self.crs {
            RasterCrs::Projected => PixelMeters {
                dx: self.pixel_size_x.abs(),
                dy: self.pixel_size_y.abs(),
            },
            RasterCrs::Geographic => PixelMeters {
                dx: self.pixel_size_x.abs() * 111_320.0 * lat.to_radians().cos(),
                dy: self.pixel_size_y.abs() * 110_574.0,
            },
        }
    }

    /// Elevation at a geographic position.
    #[must_use]
    pub fn sample_elevation(&self, lon: f64, lat: f64) -> Option<f64> {
        let (x, y) = self.native_coord(lon, lat);
        let (col, row) = self.cell_index(x, y);
        self.value_at(col, row)
    }

    /// Slope at a geographic position.
    #[must_use]
    pub fn sample_slope(&self, lon: f64, lat: f64) -> Option<SlopeSample> {
        self.sample(lon, lat).slope
    }

    /// Elevation plus slope from forward differences to the east and
    /// south neighbours.
    #[must_use]
    pub fn sample(&self, lon: f64, lat: f64) -> CellSample {
        let (x, y) = self.native_coord(lon, lat);
        let (col, row) = self.cell_index(x, y);

        let Some(z) = self.value_at(col, row) else {
            return CellSample {
                elevation: None,
                slope: None,
            };
        };

        let neighbours = self
            .value_at(col + 1, row)
            .zip(self.value_at(col, row + 1));
        let slope = neighbours.map(|(z_east, z_south)| {
            let PixelMeters { dx, dy } = self.meters_per_pixel(lat);
            let run = |d: f64| if d > 0.0 && d.is_finite() { d } else { 1.0 };

            let dz_dx = (z_east - z) / run(dx);
            let dz_dy = (z_south - z) / run(dy);
            let magnitude = dz_dx.hypot(dz_dy);

            SlopeSample {
                degrees: magnitude.atan().to_degrees(),
                percent: magnitude * 100.0,
            }
        });

        CellSample {
            elevation: Some(z),
            slope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geographic(rows: &[Vec<f32>], no_data: Option<f32>) -> RasterHandle {
        RasterHandle::from_grid(
            RasterBounds {
                min_x: -61.0,
                min_y: 10.0,
                max_x: -60.0,
                max_y: 11.0,
            },
            RasterCrs::Geographic,
            no_data,
            rows,
        )
        .unwrap()
    }

    #[test]
    fn maps_positions_to_cells() {
        let raster = geographic(&[vec![1.0, 2.0], vec![3.0, 4.0]], None);
        assert_eq!(raster.sample_elevation(-60.75, 10.75), Some(1.0));
        assert_eq!(raster.sample_elevation(-60.25, 10.75), Some(2.0));
        assert_eq!(raster.sample_elevation(-60.75, 10.25), Some(3.0));
        assert_eq!(raster.sample_elevation(-60.25, 10.25), Some(4.0));
    }

    #[test]
    fn outside_bounds_reads_clamped_edge() {
        let raster = geographic(&[vec![1.0, 2.0], vec![3.0, 4.0]], None);
        assert_eq!(raster.sample_elevation(-70.0, 10.75), Some(1.0));
        assert_eq!(raster.sample_elevation(-50.0, 5.0), Some(4.0));
        assert_eq!(raster.sample_elevation(-60.25, 20.0), Some(2.0));
    }

    #[test]
    fn outside_bounds_on_no_data_edge_is_none() {
        let raster = geographic(&[vec![-9999.0, 2.0], vec![3.0, 4.0]], Some(-9999.0));
        assert_eq!(raster.sample_elevation(-70.0, 12.0), None);
        assert_eq!(raster.sample_elevation(-50.0, 12.0), Some(2.0));
    }

    #[test]
    fn non_finite_cells_are_none() {
        let raster = geographic(&[vec![f32::NAN, 2.0], vec![3.0, 4.0]], None);
        let sample = raster.sample(-60.75, 10.75);
        assert_eq!(sample.elevation, None);
        assert_eq!(sample.slope, None);
    }

    #[test]
    fn slope_needs_both_neighbours() {
        let raster = geographic(&[vec![1.0, -9999.0], vec![3.0, 4.0]], Some(-9999.0));
        let sample = raster.sample(-60.75, 10.75);
        assert_eq!(sample.elevation, Some(1.0));
        assert_eq!(sample.slope, None);
    }

    #[test]
    fn slope_from_projected_cells() {
        let raster = RasterHandle::from_grid(
            RasterBounds {
                min_x: 600_000.0,
                min_y: 1_170_000.0,
                max_x: 600_020.0,
                max_y: 1_170_020.0,
            },
            RasterCrs::Projected,
            None,
            &[vec![0.0, 10.0], vec![0.0, 10.0]],
        )
        .unwrap();

        let (lat, lon) = siting_geometry::projection::to_geographic(600_005.0, 1_170_015.0);
        let sample = raster.sample(lon, lat);
        assert_eq!(sample.elevation, Some(0.0));
        let slope = sample.slope.unwrap();
        // 10 m rise over one 10 m cell
        assert!((slope.percent - 100.0).abs() < 1e-9);
        assert!((slope.degrees - 45.0).abs() < 1e-9);
    }

    #[test]
    fn geographic_pixel_meters_shrink_with_latitude() {
        let raster = geographic(&[vec![0.0, 0.0], vec![0.0, 0.0]], None);
        let equator = raster.meters_per_pixel(0.0);
        let north = raster.meters_per_pixel(60.0);
        assert!((equator.dx - 55_660.0).abs() < 1e-6);
        assert!((north.dx - equator.dx / 2.0).abs() < 1.0);
        assert!((equator.dy - 55_287.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_invalid_grids() {
        let bounds = RasterBounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 0.0,
            max_y: 1.0,
        };
        assert!(matches!(
            RasterHandle::from_grid(bounds, RasterCrs::Geographic, None, &[vec![1.0]]),
            Err(RasterError::InvalidPixelSize { .. })
        ));
        assert!(matches!(
            RasterHandle::new(bounds, 2, 2, RasterCrs::Geographic, None, vec![1.0]),
            Err(RasterError::DimensionMismatch { .. })
        ));
    }
}
