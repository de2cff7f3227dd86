use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::images::ImageStore;
use crate::storage::LocalStorage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteImageCommand {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteImageResponse {
    pub id: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteImageError {
    #[error("Image not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),
}

impl Request<Result<DeleteImageResponse, DeleteImageError>> for DeleteImageCommand {}

/// Remove the record (events cascade) and its artifacts
#[tracing::instrument(skip(store, storage))]
pub async fn handle(
    store: ImageStore,
    storage: LocalStorage,
    command: DeleteImageCommand,
) -> Result<DeleteImageResponse, DeleteImageError> {
    let record = store
        .delete(&command.id)
        .await?
        .ok_or(DeleteImageError::NotFound)?;

    storage
        .remove_artifacts(&record.stored_filename, record.processed_filename.as_deref())
        .await;

    Ok(DeleteImageResponse {
        id: record.id,
        message: "Image deleted".to_string(),
    })
}
