pub mod cache;
pub mod config;
pub mod crop;
pub mod download;
pub mod error;
pub mod geodesy;
pub mod map;
pub mod position;
pub mod raster;
pub mod rotation;
pub mod stitch;
pub mod tile_source;
pub mod tiles;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use error::{ConfigError, DomainError, DownloadError, MapError};
pub use map::{MapFrame, SlippyMap};
pub use raster::{GeoRaster, RasterTile};
