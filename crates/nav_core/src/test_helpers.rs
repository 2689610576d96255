//! Deterministic stand-ins for the network, shared by unit, integration and
//! benchmark code.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};

use crate::config::{TileCacheConfig, ZoomSettings};
use crate::download::Downloader;
use crate::error::DownloadError;
use crate::map::SlippyMap;
use crate::tile_source::UrlTileSource;
use crate::tiles::UrlTemplate;

/// Template whose URLs [`FakeDownloader`] can parse back into tile indices.
pub const FAKE_URL_TEMPLATE: &str = "fake://tiles/{z}/{x}/{y}.png";

/// The test position used across the suite, Jena city center.
pub const TEST_LAT_DEG: f64 = 50.908_38;
pub const TEST_LON_DEG: f64 = 11.568_21;

#[derive(Default)]
struct Script {
    images: HashMap<String, RgbImage>,
    json: HashMap<String, serde_json::Value>,
    failing: HashSet<String>,
}

/// Answers from a script instead of the network.
///
/// Image URLs without a scripted answer get a synthetic tile whose pixel at
/// `(col, row)` encodes the tile indices, so stitched output can be checked.
/// Failing URLs answer with HTTP 503; `fail_all` makes every request fail.
#[derive(Clone)]
pub struct FakeDownloader {
    script: Arc<Mutex<Script>>,
    calls: Arc<AtomicUsize>,
    tile_size_px: u32,
    fail_all: bool,
}

impl FakeDownloader {
    pub fn new(tile_size_px: u32) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            calls: Arc::new(AtomicUsize::new(0)),
            tile_size_px,
            fail_all: false,
        }
    }

    pub fn failing(tile_size_px: u32) -> Self {
        Self {
            fail_all: true,
            ..Self::new(tile_size_px)
        }
    }

    pub fn with_image(self, url: &str, image: RgbImage) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.images.insert(url.to_string(), image);
        }
        self
    }

    pub fn with_json(self, url: &str, value: serde_json::Value) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.json.insert(url.to_string(), value);
        }
        self
    }

    pub fn with_failure(self, url: &str) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.failing.insert(url.to_string());
        }
        self
    }

    /// Number of requests seen so far, by this downloader and its clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self, url: &str) -> Result<(), DownloadError> {
        let scripted = self
            .script
            .lock()
            .map(|script| script.failing.contains(url))
            .unwrap_or(false);
        if self.fail_all || scripted {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        Ok(())
    }
}

/// Color the fake tile server paints tile `x`, `y` with.
pub fn fake_tile_color(x: u32, y: u32, z: u8) -> [u8; 3] {
    [(x % 251) as u8, (y % 251) as u8, z]
}

fn parse_fake_url(url: &str) -> Option<(u8, u32, u32)> {
    let path = url.strip_prefix("fake://tiles/")?.strip_suffix(".png")?;
    let mut parts = path.split('/');
    let z = parts.next()?.parse().ok()?;
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    Some((z, x, y))
}

impl Downloader for FakeDownloader {
    fn fetch_image(&self, url: &str) -> Result<RgbImage, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(url)?;
        let scripted = self
            .script
            .lock()
            .ok()
            .and_then(|script| script.images.get(url).cloned());
        if let Some(image) = scripted {
            return Ok(image);
        }
        let (z, x, y) =
            parse_fake_url(url).ok_or_else(|| DownloadError::Unavailable(url.to_string()))?;
        Ok(RgbImage::from_pixel(
            self.tile_size_px,
            self.tile_size_px,
            Rgb(fake_tile_color(x, y, z)),
        ))
    }

    fn fetch_json(&self, url: &str) -> Result<serde_json::Value, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(url)?;
        self.script
            .lock()
            .ok()
            .and_then(|script| script.json.get(url).cloned())
            .ok_or_else(|| DownloadError::Unavailable(url.to_string()))
    }
}

pub fn test_zoom_settings() -> ZoomSettings {
    ZoomSettings {
        min_zoom: 0,
        max_zoom: 19,
        default_zoom: 18,
    }
}

pub fn test_cache_config(tile_size_px: u32) -> TileCacheConfig {
    TileCacheConfig {
        capacity: 256,
        tile_size_px,
        placeholder_rgb: [0, 0, 0],
    }
}

/// A map at zoom 18 backed by `downloader` through [`FAKE_URL_TEMPLATE`].
///
/// # Panics
///
/// Panics if the fixture configuration is invalid (should never happen).
pub fn fake_map(downloader: FakeDownloader) -> SlippyMap {
    let tile_size_px = downloader.tile_size_px;
    let template = UrlTemplate::parse(FAKE_URL_TEMPLATE).expect("fake template is valid");
    let source = UrlTileSource::new(template, Box::new(downloader));
    SlippyMap::new(
        Box::new(source),
        test_cache_config(tile_size_px),
        test_zoom_settings(),
        "fake tiles",
    )
    .expect("fixture map is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_tiles_encode_their_index() {
        let downloader = FakeDownloader::new(4);
        let image = downloader
            .fetch_image("fake://tiles/3/5/6.png")
            .expect("synthetic tile");
        assert_eq!(image.get_pixel(0, 0), &Rgb([5, 6, 3]));
        assert_eq!(downloader.calls(), 1);
    }

    #[test]
    fn scripted_failures_and_json() {
        let downloader = FakeDownloader::new(4)
            .with_failure("fake://tiles/1/0/0.png")
            .with_json("fake://search", serde_json::json!({"hits": 1}));
        assert!(downloader.fetch_image("fake://tiles/1/0/0.png").is_err());
        assert_eq!(
            downloader.fetch_json("fake://search").expect("scripted json")["hits"],
            1
        );
        assert!(downloader.fetch_json("fake://other").is_err());
    }
}
