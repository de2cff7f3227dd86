//! Local filesystem storage for uploads and stage outputs
//!
//! Uploads are renamed to a fresh UUID (original extension kept) so user
//! supplied names never touch the filesystem. Stage outputs land in a
//! separate directory under the same stored name.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use darkroom_common::checksum;

pub mod config;

pub use config::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unsupported file extension: '{0}'")]
    UnsupportedExtension(String),

    #[error("file too large: {size} bytes exceeds limit of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of persisting one upload
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub stored_filename: String,
    pub path: PathBuf,
    pub checksum: String,
    pub size_bytes: i64,
}

/// Filesystem-backed artifact store
#[derive(Debug, Clone)]
pub struct LocalStorage {
    config: StorageConfig,
}

impl LocalStorage {
    /// Create the store, making both directories if absent
    pub async fn new(config: StorageConfig) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&config.upload_dir).await?;
        tokio::fs::create_dir_all(&config.processed_dir).await?;
        info!(
            upload_dir = %config.upload_dir.display(),
            processed_dir = %config.processed_dir.display(),
            "artifact storage ready"
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Validate and persist an upload under a fresh stored name
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn save_upload(
        &self,
        original_filename: &str,
        data: &[u8],
    ) -> Result<StoredUpload, StorageError> {
        let ext = extension_of(original_filename)
            .filter(|ext| self.config.is_allowed_extension(ext))
            .ok_or_else(|| StorageError::UnsupportedExtension(original_filename.to_string()))?
            .to_lowercase();

        if data.len() > self.config.max_upload_size {
            return Err(StorageError::TooLarge {
                size: data.len(),
                max: self.config.max_upload_size,
            });
        }

        let stored_filename = format!("{}.{ext}", Uuid::new_v4());
        let path = self.config.upload_dir.join(&stored_filename);
        tokio::fs::write(&path, data).await?;

        let checksum = checksum::sha256_hex(data);
        debug!(stored = %stored_filename, checksum = %checksum, "upload persisted");

        Ok(StoredUpload {
            stored_filename,
            path,
            checksum,
            size_bytes: data.len() as i64,
        })
    }

    pub fn upload_path(&self, stored_filename: &str) -> PathBuf {
        self.config.upload_dir.join(stored_filename)
    }

    pub fn processed_path(&self, filename: &str) -> PathBuf {
        self.config.processed_dir.join(filename)
    }

    /// Best-effort removal of everything stored for one image. Absent
    /// files are fine; other failures are logged and swallowed.
    pub async fn remove_artifacts(&self, stored_filename: &str, processed_filename: Option<&str>) {
        remove_if_present(self.upload_path(stored_filename)).await;
        if let Some(name) = processed_filename {
            remove_if_present(self.processed_path(name)).await;
        }
    }
}

async fn remove_if_present(path: PathBuf) {
    if let Err(err) = tokio::fs::remove_file(&path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %err, "failed to remove artifact");
        }
    }
}

fn extension_of(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|ext| ext.to_str())
}
