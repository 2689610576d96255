#![allow(dead_code)]

use image::{Rgb, RgbImage};
use nav_core::raster::{AngularExtent, RasterTile};

/// Sample latitudes spread over the Mercator range, both hemispheres.
pub const SAMPLE_LATS: [f64; 9] = [-85.0, -60.5, -33.9, -0.001, 0.0, 12.3, 50.90838, 71.2, 85.05];

/// Sample longitudes including both map edges.
pub const SAMPLE_LONS: [f64; 8] = [-180.0, -122.4, -45.0, -0.5, 0.0, 11.56821, 139.7, 179.999];

/// Tile whose pixel at `(col, row)` encodes its own position.
pub fn gradient_tile(width: u32, height: u32, extent: AngularExtent) -> RasterTile {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x / 256 + y / 256) % 256) as u8])
    });
    RasterTile::new(12, image, extent).expect("valid gradient tile")
}

pub fn jena_extent() -> AngularExtent {
    AngularExtent {
        north_lat: 51.0,
        south_lat: 50.8,
        east_lon: 11.8,
        west_lon: 11.3,
    }
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} +- {tolerance}, got {actual}"
    );
}
