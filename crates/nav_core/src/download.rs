//! Byte-level fetch collaborator: images and JSON documents by URL.
//!
//! [`Downloader`] is the seam; [`HttpDownloader`] (feature `http`) is the
//! production implementation, tests substitute a deterministic fake.

use image::RgbImage;

use crate::error::DownloadError;

/// Fetches remote resources. Implementations signal failure instead of
/// returning partial data.
pub trait Downloader: Send + Sync {
    /// Fetch and decode an image into an RGB buffer.
    fn fetch_image(&self, url: &str) -> Result<RgbImage, DownloadError>;

    /// Fetch and decode a JSON document.
    fn fetch_json(&self, url: &str) -> Result<serde_json::Value, DownloadError>;
}

/// Decode PNG or JPEG bytes, dropping any alpha channel.
pub fn decode_image(url: &str, bytes: &[u8]) -> Result<RgbImage, DownloadError> {
    image::load_from_memory(bytes)
        .map(|decoded| decoded.to_rgb8())
        .map_err(|source| DownloadError::Image {
            url: url.to_string(),
            source,
        })
}

/// Fails every request with [`DownloadError::Unavailable`]. Tile sources
/// that never touch the network, like the debug provider, still work behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineDownloader;

impl Downloader for OfflineDownloader {
    fn fetch_image(&self, url: &str) -> Result<RgbImage, DownloadError> {
        Err(DownloadError::Unavailable(url.to_string()))
    }

    fn fetch_json(&self, url: &str) -> Result<serde_json::Value, DownloadError> {
        Err(DownloadError::Unavailable(url.to_string()))
    }
}

#[cfg(feature = "http")]
pub use http::HttpDownloader;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use image::RgbImage;
    use reqwest::blocking::{Client, Response};

    use super::{decode_image, Downloader};
    use crate::error::DownloadError;

    const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
    const USER_AGENT: &str = concat!("navmap/", env!("CARGO_PKG_VERSION"));

    /// Blocking HTTP client; every call stalls the caller until done.
    #[derive(Debug, Clone)]
    pub struct HttpDownloader {
        client: Client,
    }

    impl HttpDownloader {
        pub fn new() -> Result<Self, DownloadError> {
            Self::with_timeout(REQUEST_TIMEOUT)
        }

        pub fn with_timeout(timeout: Duration) -> Result<Self, DownloadError> {
            let client = Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()
                .map_err(|err| DownloadError::Http {
                    url: String::new(),
                    message: format!("failed to build HTTP client: {err}"),
                })?;
            Ok(Self { client })
        }

        fn get(&self, url: &str) -> Result<Response, DownloadError> {
            log::debug!("downloading {url}");
            let response = self.client.get(url).send().map_err(|err| DownloadError::Http {
                url: url.to_string(),
                message: err.to_string(),
            })?;
            if !response.status().is_success() {
                return Err(DownloadError::Status {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                });
            }
            Ok(response)
        }
    }

    impl Downloader for HttpDownloader {
        fn fetch_image(&self, url: &str) -> Result<RgbImage, DownloadError> {
            let bytes = self.get(url)?.bytes().map_err(|err| DownloadError::Http {
                url: url.to_string(),
                message: err.to_string(),
            })?;
            decode_image(url, &bytes)
        }

        fn fetch_json(&self, url: &str) -> Result<serde_json::Value, DownloadError> {
            let text = self.get(url)?.text().map_err(|err| DownloadError::Http {
                url: url.to_string(),
                message: err.to_string(),
            })?;
            serde_json::from_str(&text).map_err(|source| DownloadError::Json {
                url: url.to_string(),
                source,
            })
        }
    }
}
