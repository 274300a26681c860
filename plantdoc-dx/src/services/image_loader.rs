//! Image acquisition
//!
//! Turns a request's image reference (an http(s) URL or inline base64) into
//! the base64 payload sent to the inference API.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("plantdoc-dx/", env!("CARGO_PKG_VERSION"));

/// Upper bound on fetched or uploaded image size
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Reference stored for images supplied inline
pub const INLINE_REFERENCE: &str = "inline";

/// Image loading errors. All of them are caller mistakes (4xx).
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image URL must start with http:// or https://: {0}")]
    InvalidUrl(String),

    #[error("Failed to download image: {0}")]
    Fetch(String),

    #[error("Image URL returned HTTP {0}")]
    Status(u16),

    #[error("Image is larger than {} bytes", MAX_IMAGE_BYTES)]
    TooLarge,

    #[error("Image is empty")]
    Empty,

    #[error("Image is not valid base64: {0}")]
    InvalidBase64(String),
}

/// Where the image comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Url(String),
    Base64(String),
}

/// Base64 image ready for inference, plus the reference stored with the diagnosis
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    /// Standard base64 without any `data:` URI prefix
    pub base64: String,
    /// Source URL, or [`INLINE_REFERENCE`]
    pub reference: String,
}

impl ImagePayload {
    /// Build a payload from raw image bytes
    pub fn from_bytes(bytes: &[u8], reference: impl Into<String>) -> Self {
        Self {
            base64: STANDARD.encode(bytes),
            reference: reference.into(),
        }
    }

    /// Build a payload from inline base64, stripping any `data:<mime>;base64,` prefix
    pub fn from_base64(input: &str) -> Result<Self, ImageError> {
        let body = match input.trim().split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => input.trim(),
        };

        let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(ImageError::Empty);
        }

        let decoded = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| ImageError::InvalidBase64(e.to_string()))?;
        if decoded.is_empty() {
            return Err(ImageError::Empty);
        }
        if decoded.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge);
        }

        Ok(Self {
            base64: compact,
            reference: INLINE_REFERENCE.to_string(),
        })
    }
}

/// Downloads images referenced by URL
pub struct ImageLoader {
    http_client: reqwest::Client,
}

impl ImageLoader {
    pub fn new(timeout: Duration) -> Result<Self, ImageError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ImageError::Fetch(e.to_string()))?;

        Ok(Self { http_client })
    }

    pub async fn load(&self, source: ImageSource) -> Result<ImagePayload, ImageError> {
        match source {
            ImageSource::Base64(data) => ImagePayload::from_base64(&data),
            ImageSource::Url(url) => self.fetch(url.trim()).await,
        }
    }

    async fn fetch(&self, url: &str) -> Result<ImagePayload, ImageError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ImageError::InvalidUrl(url.to_string()));
        }

        tracing::debug!(url = %url, "Downloading image");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|len| len as usize > MAX_IMAGE_BYTES)
        {
            return Err(ImageError::TooLarge);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageError::Fetch(e.to_string()))?;

        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge);
        }

        tracing::debug!(url = %url, bytes = bytes.len(), "Image downloaded");

        Ok(ImagePayload::from_bytes(&bytes, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base64_strips_data_uri_prefix() {
        let encoded = STANDARD.encode(b"fake-jpeg-bytes");
        let payload =
            ImagePayload::from_base64(&format!("data:image/jpeg;base64,{}", encoded)).unwrap();
        assert_eq!(payload.base64, encoded);
        assert_eq!(payload.reference, INLINE_REFERENCE);
    }

    #[test]
    fn test_from_base64_accepts_bare_payload_with_whitespace() {
        let encoded = STANDARD.encode(b"0123456789abcdef0123456789");
        let wrapped = format!("{}\n{}", &encoded[..10], &encoded[10..]);
        let payload = ImagePayload::from_base64(&wrapped).unwrap();
        assert_eq!(payload.base64, encoded);
    }

    #[test]
    fn test_from_base64_rejects_garbage_and_empty() {
        assert!(matches!(
            ImagePayload::from_base64("not base64!!"),
            Err(ImageError::InvalidBase64(_))
        ));
        assert!(matches!(ImagePayload::from_base64("  "), Err(ImageError::Empty)));
        assert!(matches!(
            ImagePayload::from_base64("data:image/png;base64,"),
            Err(ImageError::Empty)
        ));
    }

    #[test]
    fn test_from_bytes_encodes() {
        let payload = ImagePayload::from_bytes(b"abc", "https://example.com/a.jpg");
        assert_eq!(payload.base64, "YWJj");
        assert_eq!(payload.reference, "https://example.com/a.jpg");
    }

    #[tokio::test]
    async fn test_load_rejects_non_http_url() {
        let loader = ImageLoader::new(Duration::from_secs(1)).unwrap();
        let result = loader
            .load(ImageSource::Url("file:///etc/passwd".to_string()))
            .await;
        assert!(matches!(result, Err(ImageError::InvalidUrl(_))));
    }
}
