//! Raster tiles: an RGB buffer tagged with its angular bounding box.

use image::{Rgb, RgbImage};

use crate::error::DomainError;

/// Meters per degree of latitude, the usual 111 km approximation.
pub const METERS_PER_DEG_LAT: f64 = 111_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularExtent {
    pub north_lat: f64,
    pub south_lat: f64,
    pub east_lon: f64,
    pub west_lon: f64,
}

impl AngularExtent {
    pub fn validate(&self) -> Result<(), DomainError> {
        let finite = [self.north_lat, self.south_lat, self.east_lon, self.west_lon]
            .iter()
            .all(|v| v.is_finite());
        if finite && self.north_lat > self.south_lat && self.east_lon > self.west_lon {
            Ok(())
        } else {
            Err(DomainError::InvalidExtent {
                north: self.north_lat,
                south: self.south_lat,
                east: self.east_lon,
                west: self.west_lon,
            })
        }
    }

    pub fn contains(&self, lat_deg: f64, lon_deg: f64) -> bool {
        lat_deg <= self.north_lat
            && lat_deg >= self.south_lat
            && lon_deg >= self.west_lon
            && lon_deg <= self.east_lon
    }

    /// Strict containment of another box, no shared edges.
    pub fn strictly_contains(&self, other: &AngularExtent) -> bool {
        other.north_lat < self.north_lat
            && other.south_lat > self.south_lat
            && other.west_lon > self.west_lon
            && other.east_lon < self.east_lon
    }
}

/// What a renderer needs from a frame: the pixels and the angle/pixel mapping
/// for placing markers and a scale bar.
pub trait GeoRaster {
    fn image(&self) -> &RgbImage;

    /// `(row, col)` of a geographic position, possibly outside the buffer.
    fn angle_to_pixel(&self, lat_deg: f64, lon_deg: f64) -> (i64, i64);

    /// `(lat, lon)` of a pixel corner position.
    fn pixel_to_angle(&self, row: f64, col: f64) -> (f64, f64);

    fn scale_m_per_px(&self) -> f64;

    fn width_px(&self) -> u32 {
        self.image().width()
    }

    fn height_px(&self) -> u32 {
        self.image().height()
    }
}

/// Immutable raster with a north-up, axis-aligned angular extent.
///
/// Pixel `(0, 0)` has its corner at (north, west); `(height, width)` is the
/// (south, east) corner just outside the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterTile {
    zoom: u8,
    image: RgbImage,
    extent: AngularExtent,
}

impl RasterTile {
    pub fn new(zoom: u8, image: RgbImage, extent: AngularExtent) -> Result<Self, DomainError> {
        extent.validate()?;
        if image.width() == 0 || image.height() == 0 {
            return Err(DomainError::EmptyRaster);
        }
        Ok(Self {
            zoom,
            image,
            extent,
        })
    }

    /// For extents computed from the tile grid, which are ordered by construction.
    pub(crate) fn from_grid(zoom: u8, image: RgbImage, extent: AngularExtent) -> Self {
        debug_assert!(extent.validate().is_ok() && image.width() > 0 && image.height() > 0);
        Self {
            zoom,
            image,
            extent,
        }
    }

    /// Uniformly colored square tile.
    pub fn filled(
        zoom: u8,
        size_px: u32,
        rgb: [u8; 3],
        extent: AngularExtent,
    ) -> Result<Self, DomainError> {
        Self::new(zoom, RgbImage::from_pixel(size_px, size_px, Rgb(rgb)), extent)
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn extent(&self) -> &AngularExtent {
        &self.extent
    }

    pub fn xsize_px(&self) -> u32 {
        self.image.width()
    }

    pub fn ysize_px(&self) -> u32 {
        self.image.height()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

impl GeoRaster for RasterTile {
    fn image(&self) -> &RgbImage {
        &self.image
    }

    fn angle_to_pixel(&self, lat_deg: f64, lon_deg: f64) -> (i64, i64) {
        let e = &self.extent;
        let row = f64::from(self.ysize_px()) * (lat_deg - e.north_lat) / (e.south_lat - e.north_lat);
        let col = f64::from(self.xsize_px()) * (lon_deg - e.west_lon) / (e.east_lon - e.west_lon);
        (row.round() as i64, col.round() as i64)
    }

    fn pixel_to_angle(&self, row: f64, col: f64) -> (f64, f64) {
        let e = &self.extent;
        let lat = e.north_lat + row / f64::from(self.ysize_px()) * (e.south_lat - e.north_lat);
        let lon = e.west_lon + col / f64::from(self.xsize_px()) * (e.east_lon - e.west_lon);
        (lat, lon)
    }

    /// Ground scale from the north-south extent; longitudinal scale differs
    /// away from the equator in Mercator imagery.
    fn scale_m_per_px(&self) -> f64 {
        METERS_PER_DEG_LAT * (self.extent.north_lat - self.extent.south_lat)
            / f64::from(self.ysize_px())
    }
}
