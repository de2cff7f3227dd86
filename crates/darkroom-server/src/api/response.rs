//! API response envelopes
//!
//! Every JSON reply is wrapped: successes as `{"success": true, "data",
//! "meta"?}`, errors as `{"success": false, "error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Standard success wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ListMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data, meta: None }
    }

    pub fn success_with_meta(data: T, meta: ListMeta) -> Self {
        Self { success: true, data, meta: Some(meta) }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Pagination metadata for list responses
#[derive(Debug, Serialize)]
pub struct ListMeta {
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

impl ListMeta {
    pub fn new(total: i64, offset: i64, limit: i64) -> Self {
        Self { total, offset, limit }
    }
}

/// Standard error wrapper
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail { code: code.into(), message: message.into() },
        }
    }
}
