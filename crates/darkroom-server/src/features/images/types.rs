//! Shared image representations

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::images::{ImageRecord, ProcessingStatus, StageResults};

/// An image job as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct ImageResponse {
    pub id: String,
    pub original_filename: String,
    pub stored_filename: String,
    /// Where the original upload is served
    pub url: String,
    /// Where the processed artifact is served, once one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_url: Option<String>,
    pub checksum: String,
    pub size_bytes: i64,
    pub status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_results: Option<StageResults>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl From<ImageRecord> for ImageResponse {
    fn from(record: ImageRecord) -> Self {
        let url = format!("/uploads/{}", record.stored_filename);
        let processed_url = record
            .processed_filename
            .as_deref()
            .map(|name| format!("/processed/{name}"));

        Self {
            id: record.id,
            original_filename: record.original_filename,
            stored_filename: record.stored_filename,
            url,
            processed_url,
            checksum: record.checksum,
            size_bytes: record.size_bytes,
            status: record.status,
            error: record.error,
            stage_results: record.stage_results.map(|json| json.0),
            created_at: record.created_at,
            completed_at: record.completed_at,
            duration_secs: record.duration_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_maps_to_serving_urls() {
        let record = ImageRecord {
            id: "img-1".to_string(),
            original_filename: "cat.png".to_string(),
            stored_filename: "abc.png".to_string(),
            checksum: "deadbeef".to_string(),
            size_bytes: 10,
            status: ProcessingStatus::Completed,
            error: None,
            stage_results: None,
            processed_filename: Some("abc.png".to_string()),
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
            duration_secs: Some(0.5),
        };

        let response = ImageResponse::from(record);
        assert_eq!(response.url, "/uploads/abc.png");
        assert_eq!(response.processed_url.as_deref(), Some("/processed/abc.png"));
    }

    #[test]
    fn test_optional_fields_omitted_from_json() {
        let record = ImageRecord {
            id: "img-1".to_string(),
            original_filename: "cat.png".to_string(),
            stored_filename: "abc.png".to_string(),
            checksum: "deadbeef".to_string(),
            size_bytes: 10,
            status: ProcessingStatus::Pending,
            error: None,
            stage_results: None,
            processed_filename: None,
            created_at: Utc::now(),
            completed_at: None,
            duration_secs: None,
        };

        let value = serde_json::to_value(ImageResponse::from(record)).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("processed_url"));
        assert!(!obj.contains_key("error"));
        assert!(!obj.contains_key("completed_at"));
        assert_eq!(obj["status"], "pending");
    }
}
