use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::images::ImageStore;

use super::super::types::ImageResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetImageQuery {
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetImageError {
    #[error("Image not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),
}

impl Request<Result<ImageResponse, GetImageError>> for GetImageQuery {}

pub async fn handle(store: ImageStore, query: GetImageQuery) -> Result<ImageResponse, GetImageError> {
    let record = store.get(&query.id).await?.ok_or(GetImageError::NotFound)?;
    Ok(record.into())
}
