//! Artifact storage configuration

use std::env;
use std::path::PathBuf;

pub const DEFAULT_UPLOAD_DIR: &str = "./data/uploads";
pub const DEFAULT_PROCESSED_DIR: &str = "./data/processed";
/// 10 MiB upload ceiling
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Where artifacts live and what uploads are accepted
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory for original uploads
    pub upload_dir: PathBuf,
    /// Directory for stage outputs
    pub processed_dir: PathBuf,
    /// Maximum accepted upload size in bytes
    pub max_upload_size: usize,
    /// Lowercased extensions accepted at upload, without the dot
    pub allowed_extensions: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            processed_dir: PathBuf::from(DEFAULT_PROCESSED_DIR),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl StorageConfig {
    /// Build from environment, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = env::var("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("PROCESSED_DIR") {
            config.processed_dir = PathBuf::from(dir);
        }
        if let Ok(size) = env::var("MAX_UPLOAD_SIZE") {
            if let Ok(parsed) = size.parse() {
                config.max_upload_size = parsed;
            }
        }
        if let Ok(exts) = env::var("ALLOWED_EXTENSIONS") {
            let parsed: Vec<String> = exts
                .split(',')
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect();
            if !parsed.is_empty() {
                config.allowed_extensions = parsed;
            }
        }

        config
    }

    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.allowed_extensions.iter().any(|allowed| *allowed == ext)
    }
}
