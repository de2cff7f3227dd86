use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::images::ImageStore;

use super::super::types::ImageResponse;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 500;

/// Query parameters for listing images
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListImagesQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl ListImagesQuery {
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct ListImagesResponse {
    pub images: Vec<ImageResponse>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ListImagesError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),
}

impl Request<Result<ListImagesResponse, ListImagesError>> for ListImagesQuery {}

pub async fn handle(
    store: ImageStore,
    query: ListImagesQuery,
) -> Result<ListImagesResponse, ListImagesError> {
    let offset = query.offset();
    let limit = query.limit();

    let total = store.count().await?;
    let records = store.list(offset, limit).await?;
    let images = records.into_iter().map(ImageResponse::from).collect();

    Ok(ListImagesResponse { images, total, offset, limit })
}
