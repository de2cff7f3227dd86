//! Image routes

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::response::{ApiResponse, ErrorResponse, ListMeta};
use crate::features::FeatureState;
use crate::storage::StorageError;

use super::commands::{
    delete::handle as handle_delete, upload::handle as handle_upload, DeleteImageCommand,
    DeleteImageError, UploadImageCommand, UploadImageError,
};
use super::queries::{
    get_image::handle as handle_get, list_events::handle as handle_list_events,
    list_images::handle as handle_list, GetImageError, GetImageQuery, ListEventsError,
    ListEventsQuery, ListImagesError, ListImagesQuery,
};

pub fn images_routes() -> Router<FeatureState> {
    Router::new()
        .route("/upload", post(upload_image))
        .route("/", get(list_images))
        .route("/:id", get(get_image).delete(delete_image))
        .route("/:id/events", get(list_image_events))
}

/// POST /images/upload, multipart with a `file` field
#[tracing::instrument(skip(state, multipart))]
async fn upload_image(
    State(state): State<FeatureState>,
    mut multipart: Multipart,
) -> Result<Response, ImagesApiError> {
    let mut original_filename: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImagesApiError::Multipart(format!("could not read multipart field: {e}")))?
    {
        if field.name() == Some("file") {
            original_filename = field.file_name().map(|name| name.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ImagesApiError::Multipart(format!("could not read file bytes: {e}")))?;
            content = Some(data.to_vec());
        }
    }

    let content = content.ok_or(ImagesApiError::MissingFile)?;
    let command = UploadImageCommand {
        original_filename: original_filename.unwrap_or_default(),
        content,
    };

    let response = handle_upload(
        state.store.clone(),
        state.storage.clone(),
        state.limiter.clone(),
        command,
    )
    .await?;

    tracing::info!(id = %response.id, size = response.size_bytes, "image uploaded via API");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

/// GET /images?offset=0&limit=100
async fn list_images(
    State(state): State<FeatureState>,
    Query(query): Query<ListImagesQuery>,
) -> Result<Response, ImagesApiError> {
    let response = handle_list(state.store.clone(), query).await?;
    let meta = ListMeta::new(response.total, response.offset, response.limit);
    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(response.images, meta))).into_response())
}

/// GET /images/:id
async fn get_image(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ImagesApiError> {
    let query = GetImageQuery { id: id.to_string() };
    let response = handle_get(state.store.clone(), query).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// DELETE /images/:id
async fn delete_image(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ImagesApiError> {
    let command = DeleteImageCommand { id: id.to_string() };
    let response = handle_delete(state.store.clone(), state.storage.clone(), command).await?;

    tracing::info!(id = %response.id, "image deleted via API");
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// GET /images/:id/events
async fn list_image_events(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ImagesApiError> {
    let query = ListEventsQuery { image_id: id.to_string() };
    let response = handle_list_events(state.store.clone(), query).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[derive(Debug)]
enum ImagesApiError {
    Multipart(String),
    MissingFile,
    Upload(UploadImageError),
    Delete(DeleteImageError),
    Get(GetImageError),
    List(ListImagesError),
    Events(ListEventsError),
}

impl From<UploadImageError> for ImagesApiError {
    fn from(err: UploadImageError) -> Self {
        Self::Upload(err)
    }
}

impl From<DeleteImageError> for ImagesApiError {
    fn from(err: DeleteImageError) -> Self {
        Self::Delete(err)
    }
}

impl From<GetImageError> for ImagesApiError {
    fn from(err: GetImageError) -> Self {
        Self::Get(err)
    }
}

impl From<ListImagesError> for ImagesApiError {
    fn from(err: ListImagesError) -> Self {
        Self::List(err)
    }
}

impl From<ListEventsError> for ImagesApiError {
    fn from(err: ListEventsError) -> Self {
        Self::Events(err)
    }
}

impl IntoResponse for ImagesApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ImagesApiError::Multipart(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            ImagesApiError::MissingFile => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                "No file field found in multipart data".to_string(),
            ),
            ImagesApiError::Upload(UploadImageError::FilenameRequired)
            | ImagesApiError::Upload(UploadImageError::ContentRequired) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.to_string())
            }
            ImagesApiError::Upload(UploadImageError::Storage(
                StorageError::UnsupportedExtension(_),
            )) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.to_string()),
            ImagesApiError::Upload(UploadImageError::Storage(StorageError::TooLarge {
                ..
            })) => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE", self.to_string()),
            ImagesApiError::Get(GetImageError::NotFound)
            | ImagesApiError::Delete(DeleteImageError::NotFound)
            | ImagesApiError::Events(ListEventsError::NotFound) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "Image not found".to_string())
            }
            ImagesApiError::Upload(UploadImageError::Storage(StorageError::Io(_))) => {
                tracing::error!("storage error during upload: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            ImagesApiError::Upload(UploadImageError::Database(_))
            | ImagesApiError::Delete(DeleteImageError::Database(_))
            | ImagesApiError::Get(GetImageError::Database(_))
            | ImagesApiError::List(ListImagesError::Database(_))
            | ImagesApiError::Events(ListEventsError::Database(_)) => {
                tracing::error!("database error: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "A database error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

impl std::fmt::Display for ImagesApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Multipart(msg) => write!(f, "{msg}"),
            Self::MissingFile => write!(f, "No file field found in multipart data"),
            Self::Upload(e) => write!(f, "{e}"),
            Self::Delete(e) => write!(f, "{e}"),
            Self::Get(e) => write!(f, "{e}"),
            Self::List(e) => write!(f, "{e}"),
            Self::Events(e) => write!(f, "{e}"),
        }
    }
}
