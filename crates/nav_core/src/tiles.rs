//! Slippy-map tile addressing under the Web-Mercator XYZ scheme.

use std::f64::consts::PI;
use std::fmt;

use crate::error::{ConfigError, DomainError};
use crate::raster::AngularExtent;

/// Highest zoom level accepted; indices stay well inside `u32` up to here.
pub const MAX_ZOOM: u8 = 24;

/// Latitude where the Mercator square ends, `atan(sinh(pi))` in degrees.
pub const MAX_MERCATOR_LAT_DEG: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Number of tiles along one axis at `zoom`.
pub fn tiles_per_axis(zoom: u8) -> u32 {
    1u32 << zoom
}

/// Index of the tile containing `(lat_deg, lon_deg)` at `zoom`.
///
/// The eastern and southern map edges belong to the last tile of their axis.
pub fn to_tile_index(lat_deg: f64, lon_deg: f64, zoom: u8) -> Result<TileKey, DomainError> {
    if zoom > MAX_ZOOM {
        return Err(DomainError::ZoomOutOfRange {
            zoom,
            max: MAX_ZOOM,
        });
    }
    if !lat_deg.is_finite() || lat_deg.abs() >= MAX_MERCATOR_LAT_DEG {
        return Err(DomainError::LatitudeOutOfRange(lat_deg));
    }
    if !lon_deg.is_finite() || lon_deg.abs() > 180.0 {
        return Err(DomainError::LongitudeOutOfRange(lon_deg));
    }

    let n = f64::from(tiles_per_axis(zoom));
    let last = tiles_per_axis(zoom) - 1;
    let lat_rad = lat_deg.to_radians();
    let x = ((lon_deg + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();

    Ok(TileKey {
        z: zoom,
        x: (x.max(0.0) as u32).min(last),
        y: (y.max(0.0) as u32).min(last),
    })
}

/// North-west corner `(lat_deg, lon_deg)` of the tile at `(xtile, ytile)`.
///
/// Pass `x + 1` / `y + 1` for the opposite corner and `+ 0.5` for the center.
/// Indices outside the tile grid extrapolate the projection.
pub fn to_angle(xtile: f64, ytile: f64, zoom: u8) -> (f64, f64) {
    let n = 2f64.powi(i32::from(zoom));
    let lon_deg = xtile / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * ytile / n)).sinh().atan();
    (lat_rad.to_degrees(), lon_deg)
}

/// Angular bounding box of a single tile.
pub fn tile_extent(key: TileKey) -> AngularExtent {
    let (north_lat, west_lon) = to_angle(f64::from(key.x), f64::from(key.y), key.z);
    let (south_lat, east_lon) = to_angle(f64::from(key.x) + 1.0, f64::from(key.y) + 1.0, key.z);
    AngularExtent {
        north_lat,
        south_lat,
        east_lon,
        west_lon,
    }
}

/// A tile server URL with `{x}`, `{y}` and `{z}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        for placeholder in ["{x}", "{y}", "{z}"] {
            if !template.contains(placeholder) {
                return Err(ConfigError::MissingPlaceholder {
                    template: template.to_string(),
                    placeholder,
                });
            }
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn url_for(&self, key: TileKey) -> String {
        self.template
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string())
            .replace("{z}", &key.z.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_zero_is_a_single_tile() {
        let key = to_tile_index(45.0, 90.0, 0).expect("inside domain");
        assert_eq!(key, TileKey::new(0, 0, 0));
        let extent = tile_extent(key);
        assert!((extent.north_lat - MAX_MERCATOR_LAT_DEG).abs() < 1e-9);
        assert!((extent.south_lat + MAX_MERCATOR_LAT_DEG).abs() < 1e-9);
        assert_eq!(extent.west_lon, -180.0);
        assert_eq!(extent.east_lon, 180.0);
    }

    #[test]
    fn map_edges_belong_to_last_tile() {
        let key = to_tile_index(-85.0, 180.0, 3).expect("inside domain");
        assert_eq!(key.x, 7);
        assert_eq!(key.y, 7);
        let key = to_tile_index(85.0, -180.0, 3).expect("inside domain");
        assert_eq!((key.x, key.y), (0, 0));
    }

    #[test]
    fn rejects_out_of_domain_inputs() {
        assert!(matches!(
            to_tile_index(89.0, 0.0, 5),
            Err(DomainError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            to_tile_index(-85.06, 0.0, 5),
            Err(DomainError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            to_tile_index(f64::NAN, 0.0, 5),
            Err(DomainError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            to_tile_index(0.0, 180.5, 5),
            Err(DomainError::LongitudeOutOfRange(_))
        ));
        assert!(matches!(
            to_tile_index(0.0, 0.0, MAX_ZOOM + 1),
            Err(DomainError::ZoomOutOfRange { .. })
        ));
    }

    #[test]
    fn center_of_tile_lies_inside_it() {
        let key = TileKey::new(12, 2200, 1350);
        let (lat, lon) = to_angle(2200.5, 1350.5, 12);
        assert_eq!(to_tile_index(lat, lon, 12).expect("inside domain"), key);
    }

    #[test]
    fn url_template_substitutes_all_placeholders() {
        let template =
            UrlTemplate::parse("http://localhost:8553/v1/tile?z={z}&x={x}&y={y}").expect("valid");
        assert_eq!(
            template.url_for(TileKey::new(18, 140_000, 87_000)),
            "http://localhost:8553/v1/tile?z=18&x=140000&y=87000"
        );
    }

    #[test]
    fn url_template_requires_every_placeholder() {
        let err = UrlTemplate::parse("https://tile.example.org/{z}/{x}.png").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingPlaceholder {
                placeholder: "{y}",
                ..
            }
        ));
    }
}
