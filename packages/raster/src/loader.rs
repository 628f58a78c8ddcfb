//! Sources an elevation raster can be loaded from.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::{RasterError, RasterHandle, geotiff};

/// Something that can produce a decoded raster.
///
/// Loaders do the expensive work; [`crate::DemProvider`] makes sure it
/// happens once.
#[async_trait]
pub trait RasterLoader: Send + Sync {
    /// Short description for log messages (a path or URL).
    fn describe(&self) -> String;

    /// Loads and decodes the raster.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError`] if the raster cannot be fetched or decoded.
    async fn load(&self) -> Result<RasterHandle, RasterError>;
}

/// Loads a GeoTIFF from the local filesystem.
#[derive(Debug, Clone)]
pub struct GeoTiffFileLoader {
    path: PathBuf,
}

impl GeoTiffFileLoader {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RasterLoader for GeoTiffFileLoader {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<RasterHandle, RasterError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || geotiff::read_path(&path)).await?
    }
}

/// Downloads a GeoTIFF over HTTP(S).
#[derive(Debug, Clone)]
pub struct GeoTiffUrlLoader {
    url: String,
    client: reqwest::Client,
}

impl GeoTiffUrlLoader {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    #[must_use]
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl RasterLoader for GeoTiffUrlLoader {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn load(&self) -> Result<RasterHandle, RasterError> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?.to_vec();
        log::debug!("Downloaded {} bytes from {}", bytes.len(), self.url);

        tokio::task::spawn_blocking(move || geotiff::read_bytes(bytes)).await?
    }
}

/// Hands out a copy of a raster that is already in memory.
#[derive(Debug, Clone)]
pub struct InMemoryLoader {
    raster: RasterHandle,
}

impl InMemoryLoader {
    #[must_use]
    pub const fn new(raster: RasterHandle) -> Self {
        Self { raster }
    }
}

#[async_trait]
impl RasterLoader for InMemoryLoader {
    fn describe(&self) -> String {
        let (width, height) = self.raster.dimensions();
        format!("in-memory {width}x{height} raster")
    }

    async fn load(&self) -> Result<RasterHandle, RasterError> {
        Ok(self.raster.clone())
    }
}

/// Picks a loader for a DEM location: `http://` and `https://` locations
/// are downloaded, anything else is read as a file path.
#[must_use]
pub fn for_location(location: &str) -> Box<dyn RasterLoader> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(GeoTiffUrlLoader::new(location))
    } else {
        Box::new(GeoTiffFileLoader::new(location))
    }
}
