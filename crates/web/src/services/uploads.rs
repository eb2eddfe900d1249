//! Store photo uploads.
//!
//! Two steps run before a store is written:
//!
//! 1. [`accept_content_type`] rejects anything that does not claim to be an
//!    image, before the file body is buffered.
//! 2. [`ImageResizer::process`] scales the accepted image to a fixed width,
//!    writes it under the uploads directory as `<uuid>.<ext>` and returns
//!    the filename to store on the record.
//!
//! Writes are not transactional with the database: a failed store write
//! leaves the resized file behind.

use std::io::Cursor;
use std::path::PathBuf;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use uuid::Uuid;

use delicious_core::ValidationError;

/// Shown when a non-image file is submitted.
pub const REJECTED_FILETYPE: &str = "That filetype isn't allowed!";

/// Accept a declared content type iff it is an `image/*` type.
///
/// # Errors
///
/// Returns a [`ValidationError`] on the `photo` field otherwise.
pub fn accept_content_type(content_type: &str) -> Result<(), ValidationError> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err(ValidationError::single("photo", REJECTED_FILETYPE))
    }
}

/// Errors from the upload pipeline.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload filter refused the file.
    #[error("upload rejected: {0}")]
    Rejected(#[from] ValidationError),

    /// The bytes could not be decoded or re-encoded.
    #[error("image processing failed: {0}")]
    Decode(#[from] image::ImageError),

    /// The content type names an image format we cannot write.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Writing the resized file failed.
    #[error("could not save photo: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking resize task panicked or was cancelled.
    #[error("resize task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A photo that passed the upload filter, fully buffered.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// File extension taken from the content-type subtype (`image/png` is `png`).
    #[must_use]
    pub fn extension(&self) -> &str {
        let subtype = self
            .content_type
            .split_once('/')
            .map_or("", |(_, subtype)| subtype);
        // Drop parameters such as `; charset=...`.
        subtype.split(';').next().unwrap_or_default().trim()
    }
}

/// Resizes accepted photos and saves them under the uploads directory.
#[derive(Debug, Clone)]
pub struct ImageResizer {
    uploads_dir: PathBuf,
    width: u32,
}

impl ImageResizer {
    #[must_use]
    pub fn new(uploads_dir: impl Into<PathBuf>, width: u32) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            width: width.max(1),
        }
    }

    /// Resize and save `upload`, returning the new filename.
    ///
    /// `None` means no file was submitted; nothing is written and `Ok(None)`
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::UnsupportedFormat` for an extension we cannot
    /// encode, `UploadError::Decode` for unreadable image data and
    /// `UploadError::Io` if the file cannot be written.
    pub async fn process(&self, upload: Option<PhotoUpload>) -> Result<Option<String>, UploadError> {
        let Some(upload) = upload else {
            return Ok(None);
        };

        accept_content_type(&upload.content_type)?;
        let extension = upload.extension().to_ascii_lowercase();
        let format = ImageFormat::from_extension(&extension)
            .filter(|f| f.reading_enabled() && f.writing_enabled())
            .ok_or_else(|| UploadError::UnsupportedFormat(extension.clone()))?;

        let filename = format!("{}.{extension}", Uuid::new_v4());
        let width = self.width;
        let encoded =
            tokio::task::spawn_blocking(move || resize(&upload.bytes, width, format)).await??;

        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        tokio::fs::write(self.uploads_dir.join(&filename), &encoded).await?;

        tracing::debug!(%filename, bytes = encoded.len(), "Saved resized photo");
        Ok(Some(filename))
    }
}

/// Height that keeps the aspect ratio when scaling `width x height` to
/// `target_width` wide. Never less than one pixel.
#[must_use]
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return height.max(1);
    }
    let scaled = (u64::from(height) * u64::from(target_width) + u64::from(width) / 2)
        / u64::from(width);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

fn resize(bytes: &[u8], width: u32, format: ImageFormat) -> Result<Vec<u8>, image::ImageError> {
    let source = image::load_from_memory(bytes)?;
    let height = scaled_height(source.width(), source.height(), width);
    let resized = source.resize_exact(width, height, FilterType::Triangle);

    // JPEG has no alpha channel.
    let resized = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
        _ => DynamicImage::ImageRgba8(resized.to_rgba8()),
    };

    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, format)?;
    Ok(out.into_inner())
}
