//! Error kinds, split by how a caller is expected to react.
//!
//! - [`DomainError`]: inputs outside the projection or trigonometric domain. Never clamped.
//! - [`MapError::CroppingBounds`]: the crop does not fit the working tile. [`crate::map::SlippyMap`]
//!   re-stitches once before letting it through.
//! - [`DownloadError`]: a single tile failed. The cache turns it into a placeholder tile.
//! - [`ConfigError`]: malformed profiles or templates, fatal at construction time.

use thiserror::Error;

use crate::crop::CropWindow;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("latitude {0} is outside the Web-Mercator range")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("zoom {zoom} exceeds the maximum of {max}")]
    ZoomOutOfRange { zoom: u8, max: u8 },

    #[error("invalid angular extent: north {north} / south {south}, east {east} / west {west}")]
    InvalidExtent {
        north: f64,
        south: f64,
        east: f64,
        west: f64,
    },

    #[error("raster buffer is empty")]
    EmptyRaster,

    #[error("requested viewport {width}x{height} has no pixels")]
    EmptyViewport { width: u32, height: u32 },

    #[error("requested viewport {width}x{height} exceeds {max} px per side")]
    ViewportTooLarge { width: u32, height: u32, max: u32 },

    #[error("heading {0} rad is not a finite angle")]
    InvalidHeading(f64),

    #[error("rotated corners are degenerate, no affine inverse exists")]
    DegenerateCorners,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("failed to decode image from {url}: {source}")]
    Image {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to decode json from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no tile available for {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid profiles file: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("url template '{template}' is missing the {placeholder} placeholder")]
    MissingPlaceholder {
        template: String,
        placeholder: &'static str,
    },

    #[error("map provider '{name}' not found, choose one of {available:?}")]
    UnknownProvider { name: String, available: Vec<String> },

    #[error("zoom range {min}..={max} with default {default} is inconsistent")]
    InvalidZoomRange { min: u8, max: u8, default: u8 },

    #[error("tile cache {field} must be greater than zero")]
    InvalidCacheSetting { field: &'static str },
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("crop window {window:?} does not fit a {width}x{height} working tile")]
    CroppingBounds {
        window: CropWindow,
        width: u32,
        height: u32,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MapError {
    /// True for the only error kind the map recovers from by re-stitching.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MapError::CroppingBounds { .. })
    }
}
