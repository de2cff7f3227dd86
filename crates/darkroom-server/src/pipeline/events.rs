//! Progress events
//!
//! One schema serves both consumers: rows in the audit trail and frames
//! pushed to live observers. Every field is always present on the wire;
//! absent values serialize as `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::images::{ProcessingStatus, StageResults};

/// One progress update for one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: String,
    pub status: ProcessingStatus,
    pub message: String,
    /// Fraction of stages finished, `None` when not meaningful
    pub progress: Option<f64>,
    /// Snapshot of results accumulated so far
    pub stage_results: Option<StageResults>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        job_id: impl Into<String>,
        status: ProcessingStatus,
        message: impl Into<String>,
        progress: Option<f64>,
        stage_results: Option<StageResults>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            message: message.into(),
            progress,
            stage_results,
            timestamp: Utc::now(),
        }
    }
}
