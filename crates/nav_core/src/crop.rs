//! Axis-aligned crops of a working tile around a geographic center.

use image::imageops;

use crate::error::{DomainError, MapError};
use crate::raster::{AngularExtent, GeoRaster, RasterTile};
use crate::tiles::MAX_MERCATOR_LAT_DEG;

/// Largest viewport edge accepted; re-stitch sizes are derived from it.
pub const MAX_VIEWPORT_PX: u32 = 8192;

/// Pixel rows `top..bottom` and columns `left..right` of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub top: i64,
    pub bottom: i64,
    pub left: i64,
    pub right: i64,
}

impl CropWindow {
    /// Window of `width x height` pixels whose center pixel lies under the given angles.
    ///
    /// No bounds check; the window may extend past the tile.
    pub fn centered_on(
        tile: &RasterTile,
        center_lat_deg: f64,
        center_lon_deg: f64,
        width_px: u32,
        height_px: u32,
    ) -> Self {
        let (row, col) = tile.angle_to_pixel(center_lat_deg, center_lon_deg);
        let top = row - i64::from(height_px) / 2;
        let left = col - i64::from(width_px) / 2;
        CropWindow {
            top,
            bottom: top + i64::from(height_px),
            left,
            right: left + i64::from(width_px),
        }
    }

    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    /// True when the window lies inside `tile` without touching its far edges.
    pub fn fits(&self, tile: &RasterTile) -> bool {
        let height = i64::from(tile.ysize_px());
        let width = i64::from(tile.xsize_px());
        self.top >= 0
            && self.top < self.bottom
            && self.bottom < height
            && self.left >= 0
            && self.left < self.right
            && self.right < width
    }
}

pub(crate) fn check_viewport(width_px: u32, height_px: u32) -> Result<(), DomainError> {
    if width_px == 0 || height_px == 0 {
        return Err(DomainError::EmptyViewport {
            width: width_px,
            height: height_px,
        });
    }
    if width_px > MAX_VIEWPORT_PX || height_px > MAX_VIEWPORT_PX {
        return Err(DomainError::ViewportTooLarge {
            width: width_px,
            height: height_px,
            max: MAX_VIEWPORT_PX,
        });
    }
    Ok(())
}

/// A crop center must be a real position inside the Mercator square.
pub(crate) fn check_center(lat_deg: f64, lon_deg: f64) -> Result<(), DomainError> {
    if !lat_deg.is_finite() || lat_deg.abs() >= MAX_MERCATOR_LAT_DEG {
        return Err(DomainError::LatitudeOutOfRange(lat_deg));
    }
    if !lon_deg.is_finite() || lon_deg.abs() > 180.0 {
        return Err(DomainError::LongitudeOutOfRange(lon_deg));
    }
    Ok(())
}

/// Cut `window` out of `tile` as a new tile with a recomputed extent.
pub fn crop_by_window(tile: &RasterTile, window: CropWindow) -> Result<RasterTile, MapError> {
    if !window.fits(tile) {
        return Err(MapError::CroppingBounds {
            window,
            width: tile.xsize_px(),
            height: tile.ysize_px(),
        });
    }
    let image = imageops::crop_imm(
        tile.image(),
        window.left as u32,
        window.top as u32,
        window.width() as u32,
        window.height() as u32,
    )
    .to_image();
    let (north_lat, west_lon) = tile.pixel_to_angle(window.top as f64, window.left as f64);
    let (south_lat, east_lon) = tile.pixel_to_angle(window.bottom as f64, window.right as f64);
    let extent = AngularExtent {
        north_lat,
        south_lat,
        east_lon,
        west_lon,
    };
    Ok(RasterTile::new(tile.zoom(), image, extent)?)
}

/// Crop exactly `out_w_px x out_h_px` pixels centered on the given position.
pub fn crop_by_angle(
    working: &RasterTile,
    center_lat_deg: f64,
    center_lon_deg: f64,
    out_w_px: u32,
    out_h_px: u32,
) -> Result<RasterTile, MapError> {
    check_viewport(out_w_px, out_h_px)?;
    check_center(center_lat_deg, center_lon_deg)?;
    let window = CropWindow::centered_on(working, center_lat_deg, center_lon_deg, out_w_px, out_h_px);
    crop_by_window(working, window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient_tile() -> RasterTile {
        let image = RgbImage::from_fn(200, 100, |x, y| Rgb([x as u8, y as u8, 7]));
        let extent = AngularExtent {
            north_lat: 10.0,
            south_lat: 9.0,
            east_lon: 22.0,
            west_lon: 20.0,
        };
        RasterTile::new(5, image, extent).expect("valid tile")
    }

    #[test]
    fn crop_has_requested_size_and_pixels() {
        let tile = gradient_tile();
        let cropped = crop_by_angle(&tile, 9.5, 21.0, 40, 30).expect("fits");
        assert_eq!(cropped.xsize_px(), 40);
        assert_eq!(cropped.ysize_px(), 30);
        // center (50, 100) -> top 35, left 80
        assert_eq!(cropped.image().get_pixel(0, 0), &Rgb([80, 35, 7]));
        assert_eq!(cropped.zoom(), 5);
    }

    #[test]
    fn crop_extent_follows_window() {
        let tile = gradient_tile();
        let cropped = crop_by_angle(&tile, 9.5, 21.0, 40, 30).expect("fits");
        let e = cropped.extent();
        assert!((e.north_lat - 9.65).abs() < 1e-12);
        assert!((e.south_lat - 9.35).abs() < 1e-12);
        assert!((e.west_lon - 20.8).abs() < 1e-12);
        assert!((e.east_lon - 21.2).abs() < 1e-12);
    }

    #[test]
    fn crop_outside_tile_is_a_bounds_error() {
        let tile = gradient_tile();
        let err = crop_by_angle(&tile, 9.99, 21.0, 40, 30).unwrap_err();
        assert!(err.is_recoverable());
        let err = crop_by_angle(&tile, 9.5, 21.0, 200, 30).unwrap_err();
        assert!(matches!(err, MapError::CroppingBounds { .. }));
    }

    #[test]
    fn zero_sized_viewport_is_a_domain_error() {
        let tile = gradient_tile();
        let err = crop_by_angle(&tile, 9.5, 21.0, 0, 30).unwrap_err();
        assert!(matches!(
            err,
            MapError::Domain(DomainError::EmptyViewport { .. })
        ));
    }

    #[test]
    fn oversized_viewport_is_a_domain_error() {
        let tile = gradient_tile();
        let err = crop_by_angle(&tile, 9.5, 21.0, 3_000_000_000, 10).unwrap_err();
        assert!(matches!(
            err,
            MapError::Domain(DomainError::ViewportTooLarge { .. })
        ));
    }

    #[test]
    fn non_finite_center_is_a_domain_error() {
        let tile = gradient_tile();
        assert!(matches!(
            crop_by_angle(&tile, f64::NAN, f64::NAN, 1, 1),
            Err(MapError::Domain(DomainError::LatitudeOutOfRange(_)))
        ));
        assert!(matches!(
            crop_by_angle(&tile, 9.5, f64::INFINITY, 1, 1),
            Err(MapError::Domain(DomainError::LongitudeOutOfRange(_)))
        ));
    }
}
