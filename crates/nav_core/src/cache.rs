//! Bounded LRU cache of single tiles in front of a [`TileSource`].
//!
//! A failed fetch never reaches the caller of [`TileCache::get`]: it gets a
//! uniform placeholder instead, which is not stored so a later tick retries.

use std::num::NonZeroUsize;
use std::sync::Arc;

use image::{Rgb, RgbImage};
use lru::LruCache;

use crate::config::TileCacheConfig;
use crate::error::DownloadError;
use crate::raster::RasterTile;
use crate::tile_source::TileSource;
use crate::tiles::{tile_extent, TileKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub failures: u64,
    /// Keys currently remembered as failing.
    pub failing: usize,
    pub len: usize,
    pub capacity: usize,
}

pub struct TileCache {
    source: Box<dyn TileSource>,
    config: TileCacheConfig,
    tiles: LruCache<TileKey, Arc<RasterTile>>,
    /// Keys already reported at warn level, bounded like the tiles.
    failed: LruCache<TileKey, ()>,
    hits: u64,
    misses: u64,
    failures: u64,
}

impl TileCache {
    /// Zero capacity is bumped to one; [`TileCacheConfig::validate`] rejects it earlier.
    pub fn new(source: Box<dyn TileSource>, config: TileCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            config,
            tiles: LruCache::new(capacity),
            failed: LruCache::new(capacity),
            hits: 0,
            misses: 0,
            failures: 0,
        }
    }

    pub fn config(&self) -> &TileCacheConfig {
        &self.config
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Tile for `key`, or a placeholder when the source fails.
    pub fn get(&mut self, key: TileKey) -> Arc<RasterTile> {
        match self.try_get(key) {
            Ok(tile) => tile,
            Err(err) => {
                if self.failed.put(key, ()).is_none() {
                    log::warn!("tile {key} unavailable, using placeholder: {err}");
                } else {
                    log::debug!("tile {key} still unavailable: {err}");
                }
                Arc::new(self.placeholder(key))
            }
        }
    }

    /// Like [`TileCache::get`] but hands the failure to the caller.
    pub fn try_get(&mut self, key: TileKey) -> Result<Arc<RasterTile>, DownloadError> {
        if let Some(tile) = self.tiles.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(tile));
        }
        self.misses += 1;
        log::debug!("tile cache miss for {key}");

        let tile = self
            .source
            .fetch_tile(key)
            .and_then(|image| {
                RasterTile::new(key.z, image, tile_extent(key)).map_err(|err| {
                    DownloadError::Unavailable(format!("{key}: {err}"))
                })
            })
            .map_err(|err| {
                self.failures += 1;
                err
            })?;

        self.failed.pop(&key);
        let tile = Arc::new(tile);
        self.tiles.put(key, Arc::clone(&tile));
        Ok(tile)
    }

    /// Uniform tile standing in for `key`, tagged with that tile's extent.
    pub fn placeholder(&self, key: TileKey) -> RasterTile {
        RasterTile::from_grid(key.z, self.placeholder_image(), tile_extent(key))
    }

    /// Placeholder pixels alone, for grid cells that have no tile key.
    pub fn placeholder_image(&self) -> RgbImage {
        let size = self.config.tile_size_px.max(1);
        RgbImage::from_pixel(size, size, Rgb(self.config.placeholder_rgb))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            failures: self.failures,
            failing: self.failed.len(),
            len: self.tiles.len(),
            capacity: self.tiles.cap().get(),
        }
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.tiles.contains(key)
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
        self.failed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoRaster;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        fail_x: Option<u32>,
    }

    impl TileSource for CountingSource {
        fn fetch_tile(&self, key: TileKey) -> Result<RgbImage, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_x == Some(key.x) {
                return Err(DownloadError::Status {
                    url: key.to_string(),
                    status: 404,
                });
            }
            Ok(RgbImage::from_pixel(8, 8, Rgb([key.x as u8, key.y as u8, 1])))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn cache_with(capacity: usize, fail_x: Option<u32>) -> (TileCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            calls: Arc::clone(&calls),
            fail_x,
        };
        let config = TileCacheConfig {
            capacity,
            tile_size_px: 8,
            placeholder_rgb: [0, 0, 0],
        };
        (TileCache::new(Box::new(source), config), calls)
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let (mut cache, calls) = cache_with(4, None);
        let key = TileKey::new(3, 2, 5);
        let first = cache.get(key);
        let second = cache.get(key);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.len), (1, 1, 1));
        assert_eq!(first.extent(), &tile_extent(key));
    }

    #[test]
    fn least_recently_used_tile_is_evicted() {
        let (mut cache, calls) = cache_with(2, None);
        let a = TileKey::new(3, 0, 0);
        let b = TileKey::new(3, 1, 0);
        let c = TileKey::new(3, 2, 0);
        cache.get(a);
        cache.get(b);
        cache.get(a);
        cache.get(c);
        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failures_yield_uncached_placeholders() {
        let (mut cache, calls) = cache_with(4, Some(1));
        let key = TileKey::new(3, 1, 1);
        let tile = cache.get(key);
        assert!(tile.image().pixels().all(|p| *p == Rgb([0, 0, 0])));
        assert!(!cache.contains(&key));
        cache.get(key);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().failures, 2);
        assert!(cache.try_get(key).is_err());
    }

    #[test]
    fn failure_log_is_bounded_by_capacity() {
        let (mut cache, _) = cache_with(2, Some(1));
        for y in 0..3 {
            cache.get(TileKey::new(3, 1, y));
        }
        let stats = cache.stats();
        assert_eq!(stats.failures, 3);
        assert_eq!(stats.failing, 2);
    }

    #[test]
    fn recovered_tile_leaves_the_failure_log() {
        let calls = Arc::new(AtomicUsize::new(0));
        let flaky = FlakySource {
            calls: Arc::clone(&calls),
        };
        let config = TileCacheConfig {
            capacity: 4,
            tile_size_px: 8,
            placeholder_rgb: [0, 0, 0],
        };
        let mut cache = TileCache::new(Box::new(flaky), config);
        let key = TileKey::new(2, 1, 1);
        cache.get(key);
        assert_eq!(cache.stats().failing, 1);
        cache.get(key);
        assert_eq!(cache.stats().failing, 0);
        assert!(cache.contains(&key));
    }

    /// Fails the first request only.
    struct FlakySource {
        calls: Arc<AtomicUsize>,
    }

    impl TileSource for FlakySource {
        fn fetch_tile(&self, key: TileKey) -> Result<RgbImage, DownloadError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DownloadError::Unavailable(key.to_string()));
            }
            Ok(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])))
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[test]
    fn clear_forgets_tiles() {
        let (mut cache, calls) = cache_with(4, None);
        let key = TileKey::new(1, 0, 1);
        cache.get(key);
        cache.clear();
        assert_eq!(cache.stats().len, 0);
        assert_eq!(cache.stats().failing, 0);
        cache.get(key);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
