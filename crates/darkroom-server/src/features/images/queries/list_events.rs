use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::images::{EventRecord, ImageStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEventsQuery {
    pub image_id: String,
}

#[derive(Debug, Serialize)]
pub struct ListEventsResponse {
    pub image_id: String,
    pub events: Vec<EventRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListEventsError {
    #[error("Image not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),
}

impl Request<Result<ListEventsResponse, ListEventsError>> for ListEventsQuery {}

pub async fn handle(
    store: ImageStore,
    query: ListEventsQuery,
) -> Result<ListEventsResponse, ListEventsError> {
    // distinguish an unknown image from one with no events yet
    if store.get(&query.image_id).await?.is_none() {
        return Err(ListEventsError::NotFound);
    }

    let events = store.list_events(&query.image_id).await?;
    Ok(ListEventsResponse { image_id: query.image_id, events })
}
