//! Provider profiles: which tile server to use and how the cache behaves.
//!
//! Profiles are JSON in the layout the navigation app keeps on disk:
//!
//! ```json
//! {
//!   "MapProviders": {
//!     "OpenStreetMap": {
//!       "class_name": "SlippyMap",
//!       "parameters": { "url_template": "https://tile.openstreetmap.org/{z}/{x}/{y}.png" }
//!     }
//!   },
//!   "TileCache": { "capacity": 512 }
//! }
//! ```
//!
//! `class_name` picks a [`MapProviderKind`] variant; other provider sections
//! (position, search, routing) are ignored here.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tiles::{UrlTemplate, MAX_ZOOM};

const DEFAULT_MIN_ZOOM: u8 = 0;
const DEFAULT_MAX_ZOOM: u8 = 19;
const DEFAULT_ZOOM: u8 = 17;
const DEFAULT_TILE_SIZE_PX: u32 = 256;
const DEFAULT_CACHE_CAPACITY: usize = 512;

fn default_min_zoom() -> u8 {
    DEFAULT_MIN_ZOOM
}

fn default_max_zoom() -> u8 {
    DEFAULT_MAX_ZOOM
}

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

fn default_tile_size_px() -> u32 {
    DEFAULT_TILE_SIZE_PX
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

/// Which map backend to build. Deserialized from `class_name` + `parameters`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "class_name", content = "parameters")]
pub enum MapProviderKind {
    /// Raster tiles from an XYZ tile server.
    SlippyMap {
        url_template: String,
        #[serde(default = "default_min_zoom")]
        min_zoom: u8,
        #[serde(default = "default_max_zoom")]
        max_zoom: u8,
        #[serde(default = "default_zoom")]
        default_zoom: u8,
        #[serde(default)]
        map_copyright: String,
    },
    /// Offline tiles in a per-tile color, handy to see tile seams.
    DebugMap {
        #[serde(default = "default_min_zoom")]
        min_zoom: u8,
        #[serde(default = "default_max_zoom")]
        max_zoom: u8,
        #[serde(default = "default_zoom")]
        default_zoom: u8,
        #[serde(default = "default_tile_size_px")]
        tile_size_px: u32,
    },
}

/// Allowed and initial zoom of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomSettings {
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub default_zoom: u8,
}

impl ZoomSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let consistent = self.min_zoom <= self.max_zoom
            && self.max_zoom <= MAX_ZOOM
            && (self.min_zoom..=self.max_zoom).contains(&self.default_zoom);
        if consistent {
            Ok(())
        } else {
            Err(ConfigError::InvalidZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
                default: self.default_zoom,
            })
        }
    }
}

impl MapProviderKind {
    pub fn zoom_settings(&self) -> ZoomSettings {
        match self {
            MapProviderKind::SlippyMap {
                min_zoom,
                max_zoom,
                default_zoom,
                ..
            }
            | MapProviderKind::DebugMap {
                min_zoom,
                max_zoom,
                default_zoom,
                ..
            } => ZoomSettings {
                min_zoom: *min_zoom,
                max_zoom: *max_zoom,
                default_zoom: *default_zoom,
            },
        }
    }

    pub fn map_copyright(&self) -> &str {
        match self {
            MapProviderKind::SlippyMap { map_copyright, .. } => map_copyright,
            MapProviderKind::DebugMap { .. } => "",
        }
    }

    /// Check everything that would otherwise fail later when the map is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zoom_settings().validate()?;
        match self {
            MapProviderKind::SlippyMap { url_template, .. } => {
                UrlTemplate::parse(url_template)?;
            }
            MapProviderKind::DebugMap { tile_size_px, .. } => {
                if *tile_size_px == 0 {
                    return Err(ConfigError::InvalidCacheSetting {
                        field: "tile_size_px",
                    });
                }
            }
        }
        Ok(())
    }
}

/// Tile cache sizing and the look of placeholder tiles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TileCacheConfig {
    /// Maximum number of single tiles kept; least recently used go first.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Edge length of placeholder tiles substituted for failed downloads.
    #[serde(default = "default_tile_size_px")]
    pub tile_size_px: u32,
    #[serde(default)]
    pub placeholder_rgb: [u8; 3],
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            tile_size_px: DEFAULT_TILE_SIZE_PX,
            placeholder_rgb: [0, 0, 0],
        }
    }
}

impl TileCacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCacheSetting { field: "capacity" });
        }
        if self.tile_size_px == 0 {
            return Err(ConfigError::InvalidCacheSetting {
                field: "tile_size_px",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profiles {
    #[serde(rename = "MapProviders")]
    pub map_providers: BTreeMap<String, MapProviderKind>,
    #[serde(rename = "TileCache", default)]
    pub tile_cache: TileCacheConfig,
}

impl Profiles {
    /// Read and validate a profiles file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let profiles: Profiles = serde_json::from_str(raw)?;
        profiles.validate()?;
        Ok(profiles)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Profiles shipped with the app, used when no file is given.
    pub fn builtin() -> Self {
        let slippy = |url: &str, copyright: &str| MapProviderKind::SlippyMap {
            url_template: url.to_string(),
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            default_zoom: DEFAULT_ZOOM,
            map_copyright: copyright.to_string(),
        };
        let mut map_providers = BTreeMap::new();
        map_providers.insert(
            "OpenStreetMap".to_string(),
            slippy(
                "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
                "© OpenStreetMap contributors",
            ),
        );
        map_providers.insert(
            "OpenTopoMap".to_string(),
            slippy(
                "https://tile.opentopomap.org/{z}/{x}/{y}.png",
                "© OpenStreetMap contributors, SRTM | © OpenTopoMap (CC-BY-SA)",
            ),
        );
        map_providers.insert(
            "OSMScout".to_string(),
            slippy(
                "http://localhost:8553/v1/tile?daylight=1&scale=1&z={z}&x={x}&y={y}",
                "© OpenStreetMap contributors",
            ),
        );
        map_providers.insert(
            "Debug".to_string(),
            MapProviderKind::DebugMap {
                min_zoom: DEFAULT_MIN_ZOOM,
                max_zoom: DEFAULT_MAX_ZOOM,
                default_zoom: DEFAULT_ZOOM,
                tile_size_px: DEFAULT_TILE_SIZE_PX,
            },
        );
        Self {
            map_providers,
            tile_cache: TileCacheConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tile_cache.validate()?;
        self.map_providers.values().try_for_each(MapProviderKind::validate)
    }

    pub fn map_provider(&self, name: &str) -> Result<&MapProviderKind, ConfigError> {
        self.map_providers
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProvider {
                name: name.to_string(),
                available: self.map_providers.keys().cloned().collect(),
            })
    }
}
