use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::images::{ImageStore, NewImage, ProcessingStatus};
use crate::pipeline::PipelineLimiter;
use crate::storage::{LocalStorage, StorageError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadImageCommand {
    pub original_filename: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadImageResponse {
    pub id: String,
    pub original_filename: String,
    pub status: ProcessingStatus,
    pub checksum: String,
    pub size_bytes: i64,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadImageError {
    #[error("Filename is required and cannot be empty")]
    FilenameRequired,
    #[error("File content is required and cannot be empty")]
    ContentRequired,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),
}

impl Request<Result<UploadImageResponse, UploadImageError>> for UploadImageCommand {}

impl UploadImageCommand {
    pub fn validate(&self) -> Result<(), UploadImageError> {
        if self.original_filename.trim().is_empty() {
            return Err(UploadImageError::FilenameRequired);
        }
        if self.content.is_empty() {
            return Err(UploadImageError::ContentRequired);
        }
        Ok(())
    }
}

/// Persist the upload, insert the pending record, queue the job
#[tracing::instrument(skip_all, fields(filename = %command.original_filename, size = command.content.len()))]
pub async fn handle(
    store: ImageStore,
    storage: LocalStorage,
    limiter: PipelineLimiter,
    command: UploadImageCommand,
) -> Result<UploadImageResponse, UploadImageError> {
    command.validate()?;

    let stored = storage
        .save_upload(&command.original_filename, &command.content)
        .await?;

    let record = store
        .create(NewImage {
            id: Uuid::new_v4().to_string(),
            original_filename: command.original_filename,
            stored_filename: stored.stored_filename,
            checksum: stored.checksum,
            size_bytes: stored.size_bytes,
        })
        .await?;

    limiter.submit(record.id.clone());

    Ok(UploadImageResponse {
        id: record.id,
        original_filename: record.original_filename,
        status: record.status,
        checksum: record.checksum,
        size_bytes: record.size_bytes,
        message: "Image queued for processing".to_string(),
    })
}
