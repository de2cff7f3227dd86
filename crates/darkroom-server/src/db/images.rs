//! Image job records and the progress-event audit trail
//!
//! All status changes go through guarded updates: the `WHERE` clause pins
//! the expected current status, so a regression (failed back to processing,
//! completed back to pending) matches no row and surfaces as
//! [`DbError::InvalidTransition`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;

use super::{DbError, DbResult};

/// Ordered stage name to stage output mapping; iteration order is
/// insertion order, which is execution order
pub type StageResults = serde_json::Map<String, serde_json::Value>;

/// Lifecycle of an image job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    /// Completed and failed jobs never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One image job as stored
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImageRecord {
    pub id: String,
    pub original_filename: String,
    pub stored_filename: String,
    pub checksum: String,
    pub size_bytes: i64,
    pub status: ProcessingStatus,
    pub error: Option<String>,
    pub stage_results: Option<Json<StageResults>>,
    pub processed_filename: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
}

/// Fields required to create a job record
#[derive(Debug)]
pub struct NewImage {
    pub id: String,
    pub original_filename: String,
    pub stored_filename: String,
    pub checksum: String,
    pub size_bytes: i64,
}

/// One persisted progress event
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub image_id: String,
    pub status: ProcessingStatus,
    pub message: String,
    pub progress: Option<f64>,
    pub stage_results: Option<Json<StageResults>>,
    pub emitted_at: DateTime<Utc>,
}

/// Fields required to append an audit event
#[derive(Debug)]
pub struct NewEvent<'a> {
    pub image_id: &'a str,
    pub status: ProcessingStatus,
    pub message: &'a str,
    pub progress: Option<f64>,
    pub stage_results: Option<&'a StageResults>,
    pub emitted_at: DateTime<Utc>,
}

const IMAGE_COLUMNS: &str = "id, original_filename, stored_filename, checksum, size_bytes, \
     status, error, stage_results, processed_filename, created_at, completed_at, duration_secs";

/// Data access for image jobs and their audit trail
#[derive(Debug, Clone)]
pub struct ImageStore {
    pool: SqlitePool,
}

impl ImageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a fresh `pending` record
    pub async fn create(&self, new: NewImage) -> DbResult<ImageRecord> {
        let created_at = Utc::now();

        sqlx::query(
            "INSERT INTO images \
                 (id, original_filename, stored_filename, checksum, size_bytes, status, created_at) \
             VALUES (?, ?, ?, ?, ?, 'pending', ?)",
        )
        .bind(&new.id)
        .bind(&new.original_filename)
        .bind(&new.stored_filename)
        .bind(&new.checksum)
        .bind(new.size_bytes)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(ImageRecord {
            id: new.id,
            original_filename: new.original_filename,
            stored_filename: new.stored_filename,
            checksum: new.checksum,
            size_bytes: new.size_bytes,
            status: ProcessingStatus::Pending,
            error: None,
            stage_results: None,
            processed_filename: None,
            created_at,
            completed_at: None,
            duration_secs: None,
        })
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<ImageRecord>> {
        let record = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// List records in insertion order
    pub async fn list(&self, offset: i64, limit: i64) -> DbResult<Vec<ImageRecord>> {
        let records = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images ORDER BY rowid ASC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn status_counts(&self) -> DbResult<Vec<(ProcessingStatus, i64)>> {
        let counts = sqlx::query_as::<_, (ProcessingStatus, i64)>(
            "SELECT status, COUNT(*) FROM images GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Delete a record, returning it so the caller can remove artifacts.
    /// Audit events cascade.
    pub async fn delete(&self, id: &str) -> DbResult<Option<ImageRecord>> {
        let record = sqlx::query_as::<_, ImageRecord>(&format!(
            "DELETE FROM images WHERE id = ? RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// pending -> processing
    pub async fn mark_processing(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE images SET status = 'processing' WHERE id = ? AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::invalid_transition(format!(
                "image '{id}' is not pending; cannot start processing"
            )));
        }
        Ok(())
    }

    /// Replace the stage-results snapshot of a processing job
    pub async fn update_stage_results(&self, id: &str, results: &StageResults) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE images SET stage_results = ? WHERE id = ? AND status = 'processing'",
        )
        .bind(Json(results))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::invalid_transition(format!(
                "image '{id}' is not processing; cannot record stage results"
            )));
        }
        Ok(())
    }

    /// processing -> completed
    pub async fn mark_completed(
        &self,
        id: &str,
        results: &StageResults,
        processed_filename: Option<&str>,
        duration_secs: f64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE images \
             SET status = 'completed', stage_results = ?, processed_filename = ?, \
                 completed_at = ?, duration_secs = ? \
             WHERE id = ? AND status = 'processing'",
        )
        .bind(Json(results))
        .bind(processed_filename)
        .bind(Utc::now())
        .bind(duration_secs)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::invalid_transition(format!(
                "image '{id}' is not processing; cannot complete"
            )));
        }
        Ok(())
    }

    /// processing -> failed
    pub async fn mark_failed(&self, id: &str, error: &str, duration_secs: f64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE images \
             SET status = 'failed', error = ?, completed_at = ?, duration_secs = ? \
             WHERE id = ? AND status = 'processing'",
        )
        .bind(error)
        .bind(Utc::now())
        .bind(duration_secs)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::invalid_transition(format!(
                "image '{id}' is not processing; cannot fail"
            )));
        }
        Ok(())
    }

    /// Append one event to the audit trail
    pub async fn record_event(&self, event: NewEvent<'_>) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO image_events \
                 (image_id, status, message, progress, stage_results, emitted_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(event.image_id)
        .bind(event.status)
        .bind(event.message)
        .bind(event.progress)
        .bind(event.stage_results.map(Json))
        .bind(event.emitted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Events for one image, oldest first
    pub async fn list_events(&self, image_id: &str) -> DbResult<Vec<EventRecord>> {
        let events = sqlx::query_as::<_, EventRecord>(
            "SELECT id, image_id, status, message, progress, stage_results, emitted_at \
             FROM image_events WHERE image_id = ? ORDER BY id ASC",
        )
        .bind(image_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}
