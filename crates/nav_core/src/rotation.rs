//! Heading-up crops: the working tile is cut around the rotated viewport,
//! turned so the heading points up, and trimmed to the requested size.
//!
//! The result keeps three of its corners in angular coordinates and answers
//! angle/pixel queries through an affine map built from them. That map is
//! accurate to about one pixel, good enough for overlays.

use image::{Rgb, RgbImage};

use crate::crop::{check_center, check_viewport, crop_by_window, CropWindow};
use crate::error::{DomainError, MapError};
use crate::geodesy::{haversine_distance, Point};
use crate::raster::{GeoRaster, RasterTile};

const CEIL_EPSILON: f64 = 1e-9;
const DEGENERATE_DETERMINANT: f64 = 1e-18;

/// Size of the axis-aligned rectangle enclosing a `width x height` rectangle
/// rotated by `angle_rad`.
pub fn enwrapping_size(width_px: u32, height_px: u32, angle_rad: f64) -> (u32, u32) {
    let (sin, cos) = angle_rad.sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let w = f64::from(width_px);
    let h = f64::from(height_px);
    let ew = (w * cos + h * sin - CEIL_EPSILON).ceil().max(1.0);
    let eh = (w * sin + h * cos - CEIL_EPSILON).ceil().max(1.0);
    (ew as u32, eh as u32)
}

/// Crop window in `working` that holds the whole rotated viewport.
pub fn enwrapping_window(
    working: &RasterTile,
    center_lat_deg: f64,
    center_lon_deg: f64,
    out_w_px: u32,
    out_h_px: u32,
    heading_rad: f64,
) -> CropWindow {
    let (ew, eh) = enwrapping_size(out_w_px, out_h_px, heading_rad);
    CropWindow::centered_on(working, center_lat_deg, center_lon_deg, ew, eh)
}

/// Maps an offset from the center of the heading-up image to an offset in the
/// north-up source: x grows east, y grows south, headings turn clockwise.
fn to_north_up(du: f64, dv: f64, sin: f64, cos: f64) -> (f64, f64) {
    (du * cos - dv * sin, du * sin + dv * cos)
}

/// Rotate so that the compass direction `heading_rad` ends up pointing to the
/// top edge. The output grows to fit every source pixel; uncovered corners are black.
pub fn rotate_expand(source: &RgbImage, heading_rad: f64) -> RgbImage {
    let (rw, rh) = enwrapping_size(source.width(), source.height(), heading_rad);
    let (sin, cos) = heading_rad.sin_cos();
    let half_sw = f64::from(source.width()) / 2.0;
    let half_sh = f64::from(source.height()) / 2.0;
    let half_rw = f64::from(rw) / 2.0;
    let half_rh = f64::from(rh) / 2.0;

    RgbImage::from_fn(rw, rh, |x, y| {
        let du = f64::from(x) + 0.5 - half_rw;
        let dv = f64::from(y) + 0.5 - half_rh;
        let (dx, dy) = to_north_up(du, dv, sin, cos);
        let sx = (dx + half_sw).floor();
        let sy = (dy + half_sh).floor();
        if sx >= 0.0 && sy >= 0.0 && sx < f64::from(source.width()) && sy < f64::from(source.height())
        {
            *source.get_pixel(sx as u32, sy as u32)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// A raster whose edges are not aligned with meridians and parallels.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedRasterTile {
    zoom: u8,
    image: RgbImage,
    heading_deg: f64,
    top_left: Point,
    top_right: Point,
    bottom_left: Point,
    /// Inverse of the matrix with columns `top_right - top_left` and
    /// `bottom_left - top_left`, in (lat, lon) components.
    inverse: [[f64; 2]; 2],
}

impl RotatedRasterTile {
    pub fn new(
        zoom: u8,
        image: RgbImage,
        heading_deg: f64,
        top_left: Point,
        top_right: Point,
        bottom_left: Point,
    ) -> Result<Self, DomainError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DomainError::EmptyRaster);
        }
        let ea = (
            top_right.lat_deg - top_left.lat_deg,
            top_right.lon_deg - top_left.lon_deg,
        );
        let eb = (
            bottom_left.lat_deg - top_left.lat_deg,
            bottom_left.lon_deg - top_left.lon_deg,
        );
        let det = ea.0 * eb.1 - eb.0 * ea.1;
        if !det.is_finite() || det.abs() < DEGENERATE_DETERMINANT {
            return Err(DomainError::DegenerateCorners);
        }
        let inverse = [[eb.1 / det, -eb.0 / det], [-ea.1 / det, ea.0 / det]];
        Ok(Self {
            zoom,
            image,
            heading_deg: heading_deg.rem_euclid(360.0),
            top_left,
            top_right,
            bottom_left,
            inverse,
        })
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Compass heading that points to the top edge of the image.
    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    /// Top-left, top-right and bottom-left corners.
    pub fn corners(&self) -> [Point; 3] {
        [self.top_left, self.top_right, self.bottom_left]
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

impl GeoRaster for RotatedRasterTile {
    fn image(&self) -> &RgbImage {
        &self.image
    }

    fn angle_to_pixel(&self, lat_deg: f64, lon_deg: f64) -> (i64, i64) {
        let d_lat = lat_deg - self.top_left.lat_deg;
        let d_lon = lon_deg - self.top_left.lon_deg;
        let s = self.inverse[0][0] * d_lat + self.inverse[0][1] * d_lon;
        let t = self.inverse[1][0] * d_lat + self.inverse[1][1] * d_lon;
        let col = s * f64::from(self.image.width());
        let row = t * f64::from(self.image.height());
        (row.round() as i64, col.round() as i64)
    }

    fn pixel_to_angle(&self, row: f64, col: f64) -> (f64, f64) {
        let s = col / f64::from(self.image.width());
        let t = row / f64::from(self.image.height());
        let tl = self.top_left;
        let lat = tl.lat_deg
            + s * (self.top_right.lat_deg - tl.lat_deg)
            + t * (self.bottom_left.lat_deg - tl.lat_deg);
        let lon = tl.lon_deg
            + s * (self.top_right.lon_deg - tl.lon_deg)
            + t * (self.bottom_left.lon_deg - tl.lon_deg);
        (lat, lon)
    }

    /// Ground distance along the left edge divided by the image height.
    fn scale_m_per_px(&self) -> f64 {
        haversine_distance(self.top_left, self.bottom_left) / f64::from(self.image.height())
    }
}

/// Crop `out_w_px x out_h_px` pixels around the center with `heading_rad` pointing up.
pub fn crop_rotated(
    working: &RasterTile,
    center_lat_deg: f64,
    center_lon_deg: f64,
    out_w_px: u32,
    out_h_px: u32,
    heading_rad: f64,
) -> Result<RotatedRasterTile, MapError> {
    if !heading_rad.is_finite() {
        return Err(DomainError::InvalidHeading(heading_rad).into());
    }
    check_viewport(out_w_px, out_h_px)?;
    check_center(center_lat_deg, center_lon_deg)?;
    let window = enwrapping_window(
        working,
        center_lat_deg,
        center_lon_deg,
        out_w_px,
        out_h_px,
        heading_rad,
    );
    let enwrapped = crop_by_window(working, window)?;
    let rotated = rotate_expand(enwrapped.image(), heading_rad);

    let (Some(spare_x), Some(spare_y)) = (
        rotated.width().checked_sub(out_w_px),
        rotated.height().checked_sub(out_h_px),
    ) else {
        return Err(MapError::CroppingBounds {
            window,
            width: rotated.width(),
            height: rotated.height(),
        });
    };
    let offset_x = spare_x / 2;
    let offset_y = spare_y / 2;
    let image =
        image::imageops::crop_imm(&rotated, offset_x, offset_y, out_w_px, out_h_px).to_image();

    let (sin, cos) = heading_rad.sin_cos();
    let half_rw = f64::from(rotated.width()) / 2.0;
    let half_rh = f64::from(rotated.height()) / 2.0;
    let half_ew = f64::from(enwrapped.xsize_px()) / 2.0;
    let half_eh = f64::from(enwrapped.ysize_px()) / 2.0;
    let corner = |x: u32, y: u32| {
        let du = f64::from(x + offset_x) - half_rw;
        let dv = f64::from(y + offset_y) - half_rh;
        let (dx, dy) = to_north_up(du, dv, sin, cos);
        let row = window.top as f64 + dy + half_eh;
        let col = window.left as f64 + dx + half_ew;
        let (lat, lon) = working.pixel_to_angle(row, col);
        Point::new(lat, lon)
    };

    Ok(RotatedRasterTile::new(
        working.zoom(),
        image,
        heading_rad.to_degrees(),
        corner(0, 0),
        corner(out_w_px, 0),
        corner(0, out_h_px),
    )?)
}
