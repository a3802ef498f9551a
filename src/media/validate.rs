/// Upload checks applied before any file leaves the server

use thiserror::Error;

/// Largest accepted image, in bytes
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// MIME types the site can display
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/avif",
];

/// An image received from a form, not yet stored anywhere
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImageRejection {
    #[error("Image '{0}' is empty")]
    Empty(String),

    #[error("Image '{filename}' is {size} bytes; the limit is 10 MB")]
    TooLarge { filename: String, size: usize },

    #[error("Image '{filename}' has unsupported type '{content_type}'")]
    UnsupportedType { filename: String, content_type: String },
}

impl ImageUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Check size and MIME type
    pub fn validate(&self) -> Result<(), ImageRejection> {
        let content_type = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
            return Err(ImageRejection::UnsupportedType {
                filename: self.filename.clone(),
                content_type: self.content_type.clone(),
            });
        }
        if self.bytes.is_empty() {
            return Err(ImageRejection::Empty(self.filename.clone()));
        }
        if self.size() > MAX_IMAGE_BYTES {
            return Err(ImageRejection::TooLarge {
                filename: self.filename.clone(),
                size: self.size(),
            });
        }

        Ok(())
    }
}

/// Validate every image of a request; the first failure wins
pub fn validate_all<'a>(images: impl IntoIterator<Item = &'a ImageUpload>) -> Result<(), ImageRejection> {
    images.into_iter().try_for_each(ImageUpload::validate)
}
