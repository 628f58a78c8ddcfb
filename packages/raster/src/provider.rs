//! Session-wide, lazily loaded elevation raster.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{RasterError, RasterHandle, RasterLoader};

/// Shares one decoded raster across every analysis run of a session.
///
/// The first call to [`DemProvider::get_raster`] runs the loader;
/// concurrent first calls wait on that same load instead of starting
/// their own. A failed load leaves the provider empty, so a later call
/// tries again.
pub struct DemProvider {
    loader: Box<dyn RasterLoader>,
    raster: OnceCell<Arc<RasterHandle>>,
}

impl std::fmt::Debug for DemProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemProvider")
            .field("source", &self.loader.describe())
            .field("loaded", &self.raster.initialized())
            .finish()
    }
}

impl DemProvider {
    #[must_use]
    pub fn new(loader: impl RasterLoader + 'static) -> Self {
        Self::from_boxed(Box::new(loader))
    }

    #[must_use]
    pub fn from_boxed(loader: Box<dyn RasterLoader>) -> Self {
        Self {
            loader,
            raster: OnceCell::new(),
        }
    }

    /// Builds a provider that already holds `raster`.
    #[must_use]
    pub fn preloaded(raster: RasterHandle) -> Self {
        let loader = crate::InMemoryLoader::new(raster.clone());
        Self {
            loader: Box::new(loader),
            raster: OnceCell::new_with(Some(Arc::new(raster))),
        }
    }

    /// Returns `true` once a raster has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.raster.initialized()
    }

    /// Returns the shared raster, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError`] if the load fails.
    pub async fn get_raster(&self) -> Result<Arc<RasterHandle>, RasterError> {
        self.raster
            .get_or_try_init(|| async {
                let source = self.loader.describe();
                log::info!("Loading elevation raster from {source}");

                let raster = self.loader.load().await.inspect_err(|e| {
                    log::warn!("Failed to load elevation raster from {source}: {e}");
                })?;

                let (width, height) = raster.dimensions();
                log::info!(
                    "Loaded {width}x{height} elevation raster ({:?}) from {source}",
                    raster.crs()
                );
                Ok::<_, RasterError>(Arc::new(raster))
            })
            .await
            .map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::{RasterBounds, RasterCrs};

    fn tiny_raster() -> RasterHandle {
        RasterHandle::from_grid(
            RasterBounds {
                min_x: -61.0,
                min_y: 10.0,
                max_x: -60.0,
                max_y: 11.0,
            },
            RasterCrs::Geographic,
            None,
            &[vec![42.0]],
        )
        .unwrap()
    }

    struct CountingLoader {
        calls: Arc<AtomicUsize>,
        fail_first: bool,
    }

    #[async_trait]
    impl RasterLoader for CountingLoader {
        fn describe(&self) -> String {
            "counting loader".to_string()
        }

        async fn load(&self) -> Result<RasterHandle, RasterError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_first && call == 0 {
                return Err(RasterError::InvalidGeoTiff("first load fails".to_string()));
            }
            Ok(tiny_raster())
        }
    }

    #[tokio::test]
    async fn concurrent_first_calls_load_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(DemProvider::new(CountingLoader {
            calls: Arc::clone(&calls),
            fail_first: false,
        }));

        let tasks = (0..8).map(|_| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.get_raster().await })
        });
        let results = futures::future::join_all(tasks).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let first = results[0].as_ref().unwrap().as_ref().unwrap();
        for result in &results {
            let raster = result.as_ref().unwrap().as_ref().unwrap();
            assert!(Arc::ptr_eq(first, raster));
        }
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = DemProvider::new(CountingLoader {
            calls: Arc::clone(&calls),
            fail_first: true,
        });

        assert!(provider.get_raster().await.is_err());
        assert!(!provider.is_loaded());

        let raster = provider.get_raster().await.unwrap();
        assert_eq!(raster.sample_elevation(-60.5, 10.5), Some(42.0));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn preloaded_never_calls_loader() {
        let provider = DemProvider::preloaded(tiny_raster());
        assert!(provider.is_loaded());
        let raster = provider.get_raster().await.unwrap();
        assert_eq!(raster.dimensions(), (1, 1));
    }
}
