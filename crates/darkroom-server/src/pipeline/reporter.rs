//! Progress reporting

use tracing::{trace, warn};

use crate::db::images::{ImageStore, NewEvent};
use crate::hub::EventHub;

use super::events::ProgressEvent;

/// Writes each event to the audit trail before handing it to live
/// observers. A failed audit write is logged and the event still goes
/// out to observers.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    store: ImageStore,
    hub: EventHub,
}

impl ProgressReporter {
    pub fn new(store: ImageStore, hub: EventHub) -> Self {
        Self { store, hub }
    }

    pub async fn publish(&self, event: ProgressEvent) {
        let audit = NewEvent {
            image_id: &event.job_id,
            status: event.status,
            message: &event.message,
            progress: event.progress,
            stage_results: event.stage_results.as_ref(),
            emitted_at: event.timestamp,
        };
        if let Err(err) = self.store.record_event(audit).await {
            warn!(job_id = %event.job_id, error = %err, "failed to persist progress event");
        }

        let delivered = self.hub.broadcast(&event).await;
        trace!(job_id = %event.job_id, status = %event.status, delivered, "progress event published");
    }
}
