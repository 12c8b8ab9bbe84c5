use std::time::Duration;

use image::ImageFormat;
use log::debug;

use crate::error::NetworkError;

/// Loads the raw bytes of a photo from its locator.
pub trait PhotoLoader: Send + Sync {
    fn load(&self, url: &str) -> Result<Vec<u8>, NetworkError>;
}

/// Photo loader downloading images over HTTP.
///
/// Makes exactly one request per call; retrying is left to the caller.
pub struct HttpPhotoLoader {
    timeout_seconds: u64,
}

impl HttpPhotoLoader {
    /// Create a loader whose requests give up after `timeout_seconds`.
    pub fn new(timeout_seconds: u64) -> Self {
        Self { timeout_seconds }
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

impl PhotoLoader for HttpPhotoLoader {
    /// Download the image at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP client cannot be built
    /// - The request fails or times out
    /// - The server returns a non-success status
    /// - The response body cannot be read
    fn load(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .build()
            .map_err(|e| request_failed(url, e))?;

        let response = client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                NetworkError::Timeout {
                    url: url.to_string(),
                    timeout_seconds: self.timeout_seconds,
                }
            } else {
                request_failed(url, e)
            }
        })?;

        if !response.status().is_success() {
            return Err(NetworkError::RequestFailed {
                url: url.to_string(),
                reason: format!("HTTP request failed with status: {}", response.status()),
            });
        }

        let data = response.bytes().map_err(|e| request_failed(url, e))?;
        debug!("Fetched {} bytes from {}", data.len(), url);
        Ok(data.to_vec())
    }
}

fn request_failed(url: &str, err: reqwest::Error) -> NetworkError {
    NetworkError::RequestFailed {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

/// MIME type of an encoded image, sniffed from its magic bytes.
///
/// Unknown or unrecognised data is reported as JPEG, which is what booth
/// cameras produce.
pub fn mime_type_of(image_data: &[u8]) -> &'static str {
    match image::guess_format(image_data) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Tiff) => "image/tiff",
        _ => "image/jpeg",
    }
}
