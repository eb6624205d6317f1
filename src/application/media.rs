//! Port for storing user-supplied images.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("media storage failed: {message}")]
pub struct MediaError {
    pub message: String,
}

impl MediaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist an image under `directory` and return its stored path.
    async fn store_image(
        &self,
        directory: &str,
        original_name: &str,
        data: Bytes,
    ) -> Result<String, MediaError>;
}

/// Whether `data` starts like an image format we can serve back.
pub fn looks_like_image(data: &[u8]) -> bool {
    imagesize::blob_size(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    #[test]
    fn gif_bytes_are_recognised() {
        assert!(looks_like_image(SMALL_GIF));
    }

    #[test]
    fn plain_text_is_rejected() {
        assert!(!looks_like_image(b"definitely not an image"));
        assert!(!looks_like_image(&[]));
    }
}
