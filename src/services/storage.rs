use crate::config::StorageConfig;
use anyhow::{Context, Result};
use mime_guess::mime;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Writes uploaded images under the media root and maps stored paths to URLs.
pub struct MediaStorage {
    media_root: PathBuf,
    upload_dir: String,
    media_url: String,
}

impl MediaStorage {
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            media_root: PathBuf::from(&config.media_root),
            upload_dir: config.upload_dir.trim_matches('/').to_string(),
            media_url: config.media_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// URL prefix stored files are served under, without a trailing slash.
    #[must_use]
    pub fn media_url(&self) -> &str {
        &self.media_url
    }

    pub async fn ensure_dirs(&self) -> Result<()> {
        let dir = self.media_root.join(&self.upload_dir);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))
    }

    /// Stores `bytes` under a fresh random name, keeping the original
    /// extension only when it is a known image type. Returns the path
    /// relative to the media root, always `/`-separated.
    pub async fn save_upload(
        &self,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<String> {
        self.ensure_dirs().await?;

        let filename = format!(
            "{}.{}",
            uuid::Uuid::new_v4().simple(),
            stored_extension(original_name)
        );
        let relative = format!("{}/{}", self.upload_dir, filename);
        let absolute = self.absolute_path(&relative);

        fs::write(&absolute, bytes)
            .await
            .with_context(|| format!("Failed to write upload to {}", absolute.display()))?;

        info!(path = %absolute.display(), size = bytes.len(), "Stored upload");

        Ok(relative)
    }

    /// Deletes a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, relative: &str) -> Result<()> {
        let path = self.absolute_path(relative);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove upload {}", path.display()))
            }
        }
    }

    #[must_use]
    pub fn absolute_path(&self, relative: &str) -> PathBuf {
        self.media_root.join(relative)
    }

    #[must_use]
    pub fn public_url(&self, relative: &str) -> String {
        format!("{}/{}", self.media_url, relative.trim_start_matches('/'))
    }
}

fn stored_extension(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| {
            mime_guess::from_ext(ext)
                .first()
                .is_some_and(|m| m.type_() == mime::IMAGE)
        })
        .unwrap_or_else(|| "bin".to_string())
}
