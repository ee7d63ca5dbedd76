//! Inline image encoding.
//!
//! Uploaded images are never written to disk or object storage. They are
//! turned into `data:` URIs and stored directly on the owning document
//! (a recipe's cover `imageUrl` or a section's `imageUrl`).

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

/// Largest accepted image payload (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MediaError {
    #[error("Unsupported media type: {0}. Only image files are allowed")]
    UnsupportedMediaType(String),
    #[error("Image too large: {size} bytes (limit {limit} bytes)")]
    PayloadTooLarge { size: usize, limit: usize },
}

/// A binary image as received from a form upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ImageUpload {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn to_data_uri(&self) -> Result<String, MediaError> {
        encode_data_uri(&self.data, &self.content_type)
    }
}

/// Encode `data` as `data:<mime>;base64,<payload>`.
pub fn encode_data_uri(data: &[u8], content_type: &str) -> Result<String, MediaError> {
    let mime = content_type.trim();
    if !mime.to_ascii_lowercase().starts_with("image/") {
        return Err(MediaError::UnsupportedMediaType(mime.to_string()));
    }
    if data.len() > MAX_IMAGE_BYTES {
        return Err(MediaError::PayloadTooLarge {
            size: data.len(),
            limit: MAX_IMAGE_BYTES,
        });
    }

    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(data)))
}
