//! Per-tick entry point: keeps a working tile around the current position and
//! cuts the frame for the display out of it.

use image::RgbImage;

use crate::cache::{CacheStats, TileCache};
use crate::config::{MapProviderKind, TileCacheConfig, ZoomSettings};
use crate::crop::{check_viewport, crop_by_angle};
use crate::download::Downloader;
use crate::error::{ConfigError, DomainError, MapError};
use crate::position::PositionSnapshot;
use crate::raster::{GeoRaster, RasterTile};
use crate::rotation::{crop_rotated, enwrapping_size, RotatedRasterTile};
use crate::stitch::build_working_tile;
use crate::tile_source::{build_tile_source, TileSource};

/// One rendered frame, north-up or heading-up.
#[derive(Debug, Clone)]
pub enum MapFrame {
    Straight(RasterTile),
    Rotated(RotatedRasterTile),
}

impl MapFrame {
    pub fn zoom(&self) -> u8 {
        match self {
            MapFrame::Straight(tile) => tile.zoom(),
            MapFrame::Rotated(tile) => tile.zoom(),
        }
    }

    pub fn heading_deg(&self) -> f64 {
        match self {
            MapFrame::Straight(_) => 0.0,
            MapFrame::Rotated(tile) => tile.heading_deg(),
        }
    }

    pub fn into_image(self) -> RgbImage {
        match self {
            MapFrame::Straight(tile) => tile.into_image(),
            MapFrame::Rotated(tile) => tile.into_image(),
        }
    }
}

impl GeoRaster for MapFrame {
    fn image(&self) -> &RgbImage {
        match self {
            MapFrame::Straight(tile) => tile.image(),
            MapFrame::Rotated(tile) => tile.image(),
        }
    }

    fn angle_to_pixel(&self, lat_deg: f64, lon_deg: f64) -> (i64, i64) {
        match self {
            MapFrame::Straight(tile) => tile.angle_to_pixel(lat_deg, lon_deg),
            MapFrame::Rotated(tile) => tile.angle_to_pixel(lat_deg, lon_deg),
        }
    }

    fn pixel_to_angle(&self, row: f64, col: f64) -> (f64, f64) {
        match self {
            MapFrame::Straight(tile) => tile.pixel_to_angle(row, col),
            MapFrame::Rotated(tile) => tile.pixel_to_angle(row, col),
        }
    }

    fn scale_m_per_px(&self) -> f64 {
        match self {
            MapFrame::Straight(tile) => tile.scale_m_per_px(),
            MapFrame::Rotated(tile) => tile.scale_m_per_px(),
        }
    }
}

/// Raster map backed by a tile cache.
///
/// The working tile is rebuilt when the zoom changed or the requested crop no
/// longer fits. A crop that still does not fit after one rebuild is returned
/// as [`MapError::CroppingBounds`].
pub struct SlippyMap {
    cache: TileCache,
    working: Option<RasterTile>,
    zoom: ZoomSettings,
    current_zoom: u8,
    map_copyright: String,
}

impl SlippyMap {
    pub fn new(
        source: Box<dyn TileSource>,
        cache_config: TileCacheConfig,
        zoom: ZoomSettings,
        map_copyright: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        zoom.validate()?;
        cache_config.validate()?;
        Ok(Self {
            cache: TileCache::new(source, cache_config),
            working: None,
            zoom,
            current_zoom: zoom.default_zoom,
            map_copyright: map_copyright.into(),
        })
    }

    /// Build the map a provider profile describes.
    pub fn from_provider(
        kind: &MapProviderKind,
        downloader: Box<dyn Downloader>,
        cache_config: TileCacheConfig,
    ) -> Result<Self, ConfigError> {
        kind.validate()?;
        let mut cache_config = cache_config;
        if let MapProviderKind::DebugMap { tile_size_px, .. } = kind {
            cache_config.tile_size_px = *tile_size_px;
        }
        let source = build_tile_source(kind, downloader)?;
        log::info!(
            "map provider {} ready at zoom {}",
            source.name(),
            kind.zoom_settings().default_zoom
        );
        Self::new(source, cache_config, kind.zoom_settings(), kind.map_copyright())
    }

    pub fn current_zoom(&self) -> u8 {
        self.current_zoom
    }

    pub fn zoom_settings(&self) -> ZoomSettings {
        self.zoom
    }

    /// Clamp into the provider's zoom range; returns the zoom actually set.
    pub fn set_zoom(&mut self, zoom: u8) -> u8 {
        self.current_zoom = zoom.clamp(self.zoom.min_zoom, self.zoom.max_zoom);
        self.current_zoom
    }

    pub fn zoom_in(&mut self) -> u8 {
        self.set_zoom(self.current_zoom.saturating_add(1))
    }

    pub fn zoom_out(&mut self) -> u8 {
        self.set_zoom(self.current_zoom.saturating_sub(1))
    }

    pub fn map_copyright(&self) -> &str {
        &self.map_copyright
    }

    pub fn working_tile(&self) -> Option<&RasterTile> {
        self.working.as_ref()
    }

    /// Drop the working tile; the next request stitches a fresh one.
    pub fn invalidate(&mut self) {
        self.working = None;
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// North-up crop of `width_px x height_px` centered on the position.
    pub fn get_cropped_tile(
        &mut self,
        center_lat_deg: f64,
        center_lon_deg: f64,
        width_px: u32,
        height_px: u32,
    ) -> Result<RasterTile, MapError> {
        check_viewport(width_px, height_px)?;
        let restitch_px = width_px.max(height_px).saturating_mul(2);
        self.crop_with_restitch(center_lat_deg, center_lon_deg, restitch_px, |working| {
            crop_by_angle(working, center_lat_deg, center_lon_deg, width_px, height_px)
        })
    }

    /// Crop with `heading_rad` pointing up. A zero heading takes the
    /// north-up path and yields [`MapFrame::Straight`].
    pub fn get_rotated_cropped_tile(
        &mut self,
        center_lat_deg: f64,
        center_lon_deg: f64,
        width_px: u32,
        height_px: u32,
        heading_rad: f64,
    ) -> Result<MapFrame, MapError> {
        if !heading_rad.is_finite() {
            return Err(DomainError::InvalidHeading(heading_rad).into());
        }
        if heading_rad == 0.0 {
            return self
                .get_cropped_tile(center_lat_deg, center_lon_deg, width_px, height_px)
                .map(MapFrame::Straight);
        }
        check_viewport(width_px, height_px)?;
        let (enwrap_w, enwrap_h) = enwrapping_size(width_px, height_px, heading_rad);
        let restitch_px = enwrap_w.max(enwrap_h).saturating_mul(2);
        self.crop_with_restitch(center_lat_deg, center_lon_deg, restitch_px, |working| {
            crop_rotated(
                working,
                center_lat_deg,
                center_lon_deg,
                width_px,
                height_px,
                heading_rad,
            )
        })
        .map(MapFrame::Rotated)
    }

    pub fn frame_for_position(
        &mut self,
        position: &PositionSnapshot,
        width_px: u32,
        height_px: u32,
    ) -> Result<MapFrame, MapError> {
        self.get_rotated_cropped_tile(
            position.latitude_deg,
            position.longitude_deg,
            width_px,
            height_px,
            position.heading_rad(),
        )
    }

    fn crop_with_restitch<T>(
        &mut self,
        center_lat_deg: f64,
        center_lon_deg: f64,
        restitch_px: u32,
        crop: impl Fn(&RasterTile) -> Result<T, MapError>,
    ) -> Result<T, MapError> {
        let zoom = self.current_zoom;
        let first = match self.working.as_ref().filter(|working| working.zoom() == zoom) {
            Some(working) => crop(working),
            None => {
                let working = self.restitch(center_lat_deg, center_lon_deg, restitch_px)?;
                return crop(working);
            }
        };
        match first {
            Err(err) if err.is_recoverable() => {
                log::debug!("{err}; re-stitching around {center_lat_deg}, {center_lon_deg}");
                let working = self.restitch(center_lat_deg, center_lon_deg, restitch_px)?;
                crop(working)
            }
            other => other,
        }
    }

    fn restitch(
        &mut self,
        center_lat_deg: f64,
        center_lon_deg: f64,
        size_px: u32,
    ) -> Result<&RasterTile, MapError> {
        // Release the old buffer before the new one is assembled.
        self.working = None;
        let working = build_working_tile(
            &mut self.cache,
            center_lat_deg,
            center_lon_deg,
            self.current_zoom,
            size_px,
            size_px,
        )?;
        Ok(self.working.insert(working))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_source::DebugTileSource;

    fn debug_map() -> SlippyMap {
        let zoom = ZoomSettings {
            min_zoom: 2,
            max_zoom: 18,
            default_zoom: 15,
        };
        let cache = TileCacheConfig {
            capacity: 128,
            tile_size_px: 64,
            placeholder_rgb: [0, 0, 0],
        };
        SlippyMap::new(Box::new(DebugTileSource::new(64)), cache, zoom, "test").expect("valid map")
    }

    #[test]
    fn zoom_is_clamped() {
        let mut map = debug_map();
        assert_eq!(map.current_zoom(), 15);
        assert_eq!(map.set_zoom(30), 18);
        assert_eq!(map.zoom_in(), 18);
        assert_eq!(map.set_zoom(0), 2);
        assert_eq!(map.zoom_out(), 2);
    }

    #[test]
    fn working_tile_is_reused_for_small_moves() {
        let mut map = debug_map();
        map.get_cropped_tile(50.9, 11.5, 50, 40).expect("first frame");
        let misses = map.cache_stats().misses;
        map.get_cropped_tile(50.9001, 11.5001, 50, 40).expect("second frame");
        assert_eq!(map.cache_stats().misses, misses);
    }

    #[test]
    fn zoom_change_rebuilds_working_tile() {
        let mut map = debug_map();
        map.get_cropped_tile(50.9, 11.5, 50, 40).expect("frame");
        map.zoom_out();
        let frame = map.get_cropped_tile(50.9, 11.5, 50, 40).expect("frame");
        assert_eq!(frame.zoom(), 14);
        assert_eq!(map.working_tile().map(RasterTile::zoom), Some(14));
    }

    #[test]
    fn zero_heading_is_straight() {
        let mut map = debug_map();
        let frame = map
            .get_rotated_cropped_tile(50.9, 11.5, 50, 40, 0.0)
            .expect("frame");
        assert!(matches!(frame, MapFrame::Straight(_)));
        let frame = map
            .get_rotated_cropped_tile(50.9, 11.5, 50, 40, 0.3)
            .expect("frame");
        assert!(matches!(frame, MapFrame::Rotated(_)));
        assert_eq!(frame.image().dimensions(), (50, 40));
    }

    #[test]
    fn out_of_range_latitude_surfaces() {
        let mut map = debug_map();
        let err = map.get_cropped_tile(89.0, 0.0, 50, 40).unwrap_err();
        assert!(matches!(err, MapError::Domain(_)));
    }

    #[test]
    fn non_finite_heading_is_rejected_before_any_fetch() {
        let mut map = debug_map();
        for heading in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = map
                .get_rotated_cropped_tile(50.9, 11.5, 50, 40, heading)
                .unwrap_err();
            assert!(matches!(err, MapError::Domain(DomainError::InvalidHeading(_))));
        }
        assert_eq!(map.cache_stats().misses, 0);
        assert!(map.working_tile().is_none());
    }

    #[test]
    fn huge_viewport_is_rejected() {
        let mut map = debug_map();
        let err = map.get_cropped_tile(50.9, 11.5, 3_000_000_000, 10).unwrap_err();
        assert!(matches!(
            err,
            MapError::Domain(DomainError::ViewportTooLarge { .. })
        ));
        let err = map
            .get_rotated_cropped_tile(50.9, 11.5, u32::MAX, u32::MAX, 0.5)
            .unwrap_err();
        assert!(matches!(
            err,
            MapError::Domain(DomainError::ViewportTooLarge { .. })
        ));
    }
}
