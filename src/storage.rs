//! Image uploads stored on local disk and served under `/media`.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::AppError;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
pub const MEDIA_PREFIX: &str = "/media";

#[derive(Debug, Clone)]
pub struct ImageStorage { root: PathBuf }

impl ImageStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    /// Lower-cased extension of an allowed image file name.
    pub fn image_extension(original_name: &str) -> Result<String, AppError> {
        Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
            .ok_or_else(|| AppError::not_valid("File is not a valid image"))
    }

    /// Saves the bytes under a fresh name and returns the public URL.
    pub async fn store_image(&self, bytes: &[u8], original_name: &str) -> Result<String, AppError> {
        let ext = Self::image_extension(original_name)?;
        if bytes.is_empty() { return Err(AppError::not_null("File must be not null")); }
        let name = format!("{}.{ext}", Uuid::new_v4());
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| AppError::Internal(format!("create upload dir: {e}")))?;
        tokio::fs::write(self.root.join(&name), bytes).await.map_err(|e| AppError::Internal(format!("write upload: {e}")))?;
        tracing::info!(file = %name, size = bytes.len(), "Stored image");
        Ok(format!("{MEDIA_PREFIX}/{name}"))
    }

    /// Removes an image saved by `store_image`, given its public URL. Failures are logged only.
    pub async fn discard(&self, url: &str) {
        let Some(name) = url.strip_prefix(MEDIA_PREFIX).and_then(|n| n.strip_prefix('/')) else { return };
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.root.join(name)).await {
            tracing::warn!(error = %e, %url, "Could not remove orphaned image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::codes;

    #[test]
    fn only_images_are_accepted() {
        assert_eq!(ImageStorage::image_extension("Latte.JPG").unwrap(), "jpg");
        assert_eq!(ImageStorage::image_extension("a.webp").unwrap(), "webp");
        assert_eq!(ImageStorage::image_extension("notes.txt").unwrap_err().code(), codes::FIELD_NOT_VALID);
        assert!(ImageStorage::image_extension("noext").is_err());
    }

    #[tokio::test]
    async fn stores_under_uuid_name() {
        let dir = std::env::temp_dir().join(format!("coffee-shop-test-{}", Uuid::new_v4()));
        let storage = ImageStorage::new(&dir);
        let url = storage.store_image(b"\x89PNG", "cup.png").await.unwrap();
        assert!(url.starts_with("/media/") && url.ends_with(".png"));
        let file = dir.join(url.trim_start_matches("/media/"));
        assert_eq!(tokio::fs::read(&file).await.unwrap(), b"\x89PNG");

        storage.discard(&url).await;
        assert!(!file.exists());
        storage.discard("/elsewhere/../secret.png").await;
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
