//! Image attachment staging
//!
//! A picked file is validated (MIME `image/*`, size limit) and held until it
//! is uploaded. A failed upload leaves it staged for another attempt.

use crate::api::ImageUpload;
use crate::model::IMAGE_PLACEHOLDER;
use crate::{Error, Result};
use bytes::Bytes;

/// A validated image waiting to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    /// Original file name
    pub file_name: String,
    /// MIME type
    pub mime_type: String,
    /// File contents
    pub bytes: Bytes,
}

impl StagedImage {
    /// Validate a picked file
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Bytes,
        max_bytes: usize,
    ) -> Result<Self> {
        let mime_type = mime_type.into();
        if !mime_type.starts_with("image/") {
            return Err(Error::Validation("Please select an image file".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(Error::Validation(format!(
                "Image must be smaller than {} MB",
                max_bytes / (1024 * 1024)
            )));
        }
        Ok(Self {
            file_name: file_name.into(),
            mime_type,
            bytes,
        })
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the file is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Build the upload request
    ///
    /// A blank caption is replaced by the image placeholder.
    pub fn to_upload(&self, caption: &str, reply_to: Option<String>) -> ImageUpload {
        let caption = caption.trim();
        ImageUpload {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            bytes: self.bytes.clone(),
            caption: if caption.is_empty() {
                IMAGE_PLACEHOLDER.to_string()
            } else {
                caption.to_string()
            },
            reply_to,
        }
    }
}

/// Staging slot for one image
#[derive(Debug, Clone)]
pub struct AttachmentState {
    max_bytes: usize,
    staged: Option<StagedImage>,
}

impl AttachmentState {
    /// Create an empty slot accepting images up to `max_bytes`
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            staged: None,
        }
    }

    /// Validate and stage a file; an invalid file leaves the slot unchanged
    pub fn stage(&mut self, file_name: &str, mime_type: &str, bytes: Bytes) -> Result<&StagedImage> {
        let image = StagedImage::new(file_name, mime_type, bytes, self.max_bytes)?;
        Ok(self.staged.insert(image))
    }

    /// Staged image
    pub fn staged(&self) -> Option<&StagedImage> {
        self.staged.as_ref()
    }

    /// Drop the staged image
    pub fn clear(&mut self) {
        self.staged = None;
    }
}
