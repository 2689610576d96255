//! Where single tiles come from: a tile server or a synthetic debug pattern.

use image::{Rgb, RgbImage};
use sha2::{Digest, Sha256};

use crate::config::MapProviderKind;
use crate::download::Downloader;
use crate::error::{ConfigError, DownloadError};
use crate::tiles::{TileKey, UrlTemplate};

/// Edge length of the white marker drawn into the upper left of debug tiles.
const DEBUG_MARKER_PX: u32 = 30;

/// Produces the pixels of one tile. The cache above it handles failures.
pub trait TileSource: Send + Sync {
    fn fetch_tile(&self, key: TileKey) -> Result<RgbImage, DownloadError>;

    fn name(&self) -> &str;
}

/// Tiles downloaded from an XYZ server.
pub struct UrlTileSource {
    template: UrlTemplate,
    downloader: Box<dyn Downloader>,
}

impl UrlTileSource {
    pub fn new(template: UrlTemplate, downloader: Box<dyn Downloader>) -> Self {
        Self {
            template,
            downloader,
        }
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }
}

impl TileSource for UrlTileSource {
    fn fetch_tile(&self, key: TileKey) -> Result<RgbImage, DownloadError> {
        self.downloader.fetch_image(&self.template.url_for(key))
    }

    fn name(&self) -> &str {
        "slippy"
    }
}

/// Offline tiles: each tile gets a color derived from its key plus a white
/// triangle in its upper left, so seams and orientation are easy to spot.
#[derive(Debug, Clone, Copy)]
pub struct DebugTileSource {
    tile_size_px: u32,
}

impl DebugTileSource {
    pub fn new(tile_size_px: u32) -> Self {
        Self { tile_size_px }
    }

    pub fn color_for(key: TileKey) -> [u8; 3] {
        let digest = Sha256::digest(format!("{}/{}/{}", key.x, key.y, key.z).as_bytes());
        [digest[0], digest[1], digest[2]]
    }
}

impl TileSource for DebugTileSource {
    fn fetch_tile(&self, key: TileKey) -> Result<RgbImage, DownloadError> {
        let fill = Rgb(Self::color_for(key));
        let marker = DEBUG_MARKER_PX.min(self.tile_size_px);
        Ok(RgbImage::from_fn(self.tile_size_px, self.tile_size_px, |col, row| {
            if row < marker && col < marker - row {
                Rgb([255, 255, 255])
            } else {
                fill
            }
        }))
    }

    fn name(&self) -> &str {
        "debug"
    }
}

/// Build the tile source a provider profile describes.
pub fn build_tile_source(
    kind: &MapProviderKind,
    downloader: Box<dyn Downloader>,
) -> Result<Box<dyn TileSource>, ConfigError> {
    match kind {
        MapProviderKind::SlippyMap { url_template, .. } => {
            let template = UrlTemplate::parse(url_template)?;
            Ok(Box::new(UrlTileSource::new(template, downloader)))
        }
        MapProviderKind::DebugMap { tile_size_px, .. } => {
            if *tile_size_px == 0 {
                return Err(ConfigError::InvalidCacheSetting {
                    field: "tile_size_px",
                });
            }
            Ok(Box::new(DebugTileSource::new(*tile_size_px)))
        }
    }
}
