//! Image downloads for imported products.

use std::time::Duration;

use reqwest::Client;
use sha2::{Digest, Sha256};
use shopcrawl_core::MediaAsset;

use crate::error::ImportError;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

pub struct AssetDownloader {
    client: Client,
}

impl AssetDownloader {
    /// # Errors
    ///
    /// Returns [`ImportError::Client`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ImportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(ImportError::Client)?;
        Ok(Self { client })
    }

    /// Downloads `url` into a [`MediaAsset`] named after the URL's hash.
    ///
    /// # Errors
    ///
    /// - [`ImportError::Download`] on transport failure.
    /// - [`ImportError::Status`] on any non-2xx status.
    /// - [`ImportError::NotAnImage`] when the server answers with a
    ///   non-image content type, e.g. an HTML error page.
    pub async fn download(&self, url: &str) -> Result<MediaAsset, ImportError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "image/*,*/*;q=0.8")
            .send()
            .await
            .map_err(|source| ImportError::Download {
                url: url.to_owned(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_owned());
        if !content_type.starts_with("image/") && content_type != FALLBACK_CONTENT_TYPE {
            return Err(ImportError::NotAnImage {
                url: url.to_owned(),
                content_type,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ImportError::Download {
                url: url.to_owned(),
                source,
            })?;

        Ok(MediaAsset {
            file_name: media_file_name(url, &content_type),
            content_type,
            source_url: url.to_owned(),
            bytes: bytes.to_vec(),
        })
    }
}

/// `<sha256(url)>.<ext>`, with the extension taken from the content type,
/// else from the URL path, else `bin`.
#[must_use]
pub fn media_file_name(url: &str, content_type: &str) -> String {
    let hash = format!("{:x}", Sha256::digest(url.as_bytes()));
    let ext = extension_for_content_type(content_type)
        .map(str::to_owned)
        .or_else(|| extension_from_url(url))
        .unwrap_or_else(|| "bin".to_owned());
    format!("{hash}.{ext}")
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/avif" => Some("avif"),
        "image/svg+xml" => Some("svg"),
        "image/bmp" => Some("bmp"),
        "image/tiff" => Some("tiff"),
        _ => None,
    }
}

fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
