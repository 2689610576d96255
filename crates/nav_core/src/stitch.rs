//! Builds the working tile: a block of tiles around the one under the center.

use image::{imageops, Rgb, RgbImage};

use crate::cache::TileCache;
use crate::error::MapError;
use crate::raster::{AngularExtent, GeoRaster, RasterTile};
use crate::tiles::{tiles_per_axis, to_angle, to_tile_index, TileKey};

/// Tiles needed on each side of the center tile so that `min_px` fits with at
/// least one full tile of margin.
pub fn half_count(min_px: u32, tile_px: u32) -> u32 {
    let tiles = f64::from(min_px) / f64::from(tile_px.max(1));
    ((0.5 * (tiles - 1.0)).ceil().max(1.0)) as u32
}

/// Stitch `(2*hx + 1) x (2*hy + 1)` tiles around the center position.
///
/// Rows beyond the poles are filled with placeholders without asking the
/// cache. Columns wrap around the antimeridian for fetching only; the extent
/// keeps growing past +-180 degrees.
pub fn build_working_tile(
    cache: &mut TileCache,
    center_lat_deg: f64,
    center_lon_deg: f64,
    zoom: u8,
    min_width_px: u32,
    min_height_px: u32,
) -> Result<RasterTile, MapError> {
    let center_key = to_tile_index(center_lat_deg, center_lon_deg, zoom)?;
    let center = cache.get(center_key);
    let (tile_w, tile_h) = (center.xsize_px(), center.ysize_px());
    let hx = i64::from(half_count(min_width_px, tile_w));
    let hy = i64::from(half_count(min_height_px, tile_h));

    let cols = (2 * hx + 1) as u32;
    let rows = (2 * hy + 1) as u32;
    let mut canvas = RgbImage::new(cols * tile_w, rows * tile_h);
    let placeholder = RgbImage::from_pixel(tile_w, tile_h, Rgb(cache.config().placeholder_rgb));

    let n = i64::from(tiles_per_axis(zoom));
    let cx = i64::from(center_key.x);
    let cy = i64::from(center_key.y);
    for dy in -hy..=hy {
        for dx in -hx..=hx {
            let offset_x = (dx + hx) * i64::from(tile_w);
            let offset_y = (dy + hy) * i64::from(tile_h);
            let y = cy + dy;
            if !(0..n).contains(&y) {
                imageops::replace(&mut canvas, &placeholder, offset_x, offset_y);
                continue;
            }
            let key = TileKey::new(zoom, (cx + dx).rem_euclid(n) as u32, y as u32);
            let tile = if key == center_key {
                center.clone()
            } else {
                cache.get(key)
            };
            if tile.image().dimensions() == (tile_w, tile_h) {
                imageops::replace(&mut canvas, tile.image(), offset_x, offset_y);
            } else {
                log::warn!(
                    "tile {key} is {:?}, expected {tile_w}x{tile_h}; using placeholder",
                    tile.image().dimensions()
                );
                imageops::replace(&mut canvas, &placeholder, offset_x, offset_y);
            }
        }
    }

    let (north_lat, west_lon) = to_angle((cx - hx) as f64, (cy - hy) as f64, zoom);
    let (south_lat, east_lon) = to_angle((cx + hx + 1) as f64, (cy + hy + 1) as f64, zoom);
    let extent = AngularExtent {
        north_lat,
        south_lat,
        east_lon,
        west_lon,
    };
    log::info!(
        "stitched {cols}x{rows} tiles around {center_key} into {}x{} px",
        canvas.width(),
        canvas.height()
    );
    Ok(RasterTile::new(zoom, canvas, extent)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TileCacheConfig;
    use crate::tile_source::DebugTileSource;

    fn debug_cache(tile_size_px: u32) -> TileCache {
        let config = TileCacheConfig {
            capacity: 64,
            tile_size_px,
            placeholder_rgb: [0, 0, 0],
        };
        TileCache::new(Box::new(DebugTileSource::new(tile_size_px)), config)
    }

    #[test]
    fn half_count_is_at_least_one() {
        assert_eq!(half_count(1, 256), 1);
        assert_eq!(half_count(256, 256), 1);
        assert_eq!(half_count(300, 256), 1);
        assert_eq!(half_count(800, 256), 2);
        assert_eq!(half_count(1400, 256), 3);
    }

    #[test]
    fn center_tile_sits_in_the_middle() {
        let mut cache = debug_cache(32);
        let working = build_working_tile(&mut cache, 50.0, 10.0, 6, 10, 10).expect("stitched");
        assert_eq!(working.image().dimensions(), (96, 96));
        let key = to_tile_index(50.0, 10.0, 6).expect("valid");
        let expected = DebugTileSource::color_for(key);
        assert_eq!(working.image().get_pixel(63, 63), &Rgb(expected));
        // debug marker of the center tile
        assert_eq!(working.image().get_pixel(32, 32), &Rgb([255, 255, 255]));
    }

    #[test]
    fn rows_beyond_the_pole_are_placeholders() {
        let mut cache = debug_cache(32);
        let working = build_working_tile(&mut cache, 85.0, 0.5, 3, 10, 10).expect("stitched");
        assert!((0..96).all(|col| working.image().get_pixel(col, 31) == &Rgb([0, 0, 0])));
        assert_eq!(cache.stats().misses, 6);
    }

    #[test]
    fn columns_wrap_for_fetching() {
        let mut cache = debug_cache(32);
        let working = build_working_tile(&mut cache, 0.5, 179.9, 2, 10, 10).expect("stitched");
        assert!(working.extent().east_lon > 180.0);
        let wrapped = TileKey::new(2, 0, 1);
        assert_eq!(
            working.image().get_pixel(95, 40),
            &Rgb(DebugTileSource::color_for(wrapped))
        );
    }
}
