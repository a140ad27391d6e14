use std::path::Path;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// 5 MB cap for khatmah cover images
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Subdirectory of the media root holding cover images.
const IMAGE_DIR: &str = "khatmah_images";

const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
];

/// A validated cover image waiting to be written to disk.
#[derive(Debug)]
pub struct UploadedImage {
    extension: &'static str,
    bytes: Bytes,
}

impl UploadedImage {
    pub fn new(content_type: Option<&str>, bytes: Bytes) -> Result<Self, ApiError> {
        let content_type = content_type.unwrap_or_default();
        let extension = ALLOWED_TYPES
            .iter()
            .find(|(mime, _)| content_type.eq_ignore_ascii_case(mime))
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                ApiError::validation(format!(
                    "Unsupported image type '{}'. Allowed: JPEG, PNG, GIF.",
                    content_type
                ))
            })?;

        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(ApiError::validation("Image must be 5MB or smaller."));
        }

        Ok(Self { extension, bytes })
    }

    /// Writes the image under `media_dir` and returns its public URL path.
    pub async fn save(&self, media_dir: &Path) -> anyhow::Result<String> {
        let dir = media_dir.join(IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), self.extension);
        let file_path = dir.join(&file_name);
        let mut file = tokio::fs::File::create(&file_path).await?;
        file.write_all(&self.bytes).await?;
        file.flush().await?;

        info!("Stored cover image {} ({} bytes)", file_path.display(), self.bytes.len());
        Ok(format!("/media/{}/{}", IMAGE_DIR, file_name))
    }
}

/// Deletes a cover image previously returned by [`UploadedImage::save`].
/// URLs that point anywhere else are left alone.
pub async fn remove_stored(media_dir: &Path, url: &str) {
    let Some(file_name) = url
        .strip_prefix("/media/")
        .and_then(|rest| rest.strip_prefix(IMAGE_DIR))
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return;
    };
    if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
        return;
    }

    let path = media_dir.join(IMAGE_DIR).join(file_name);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => info!("Removed cover image {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove cover image {}: {}", path.display(), e),
    }
}
