//! Fan-out of progress events to live observers
//!
//! Each subscriber gets its own unbounded queue, so one slow consumer
//! never stalls the pipeline or its peers. Observers that dropped their
//! receiver are pruned on the next broadcast.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::debug;

use crate::pipeline::events::ProgressEvent;

/// Handle identifying one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct HubInner {
    next_id: u64,
    observers: HashMap<u64, UnboundedSender<ProgressEvent>>,
}

/// Shared registry of live event observers
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer. Events broadcast before this call are
    /// not replayed; the audit trail covers history.
    pub async fn subscribe(&self) -> (ObserverId, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.observers.insert(id, tx);
        debug!(observer = id, total = inner.observers.len(), "observer subscribed");
        (ObserverId(id), rx)
    }

    pub async fn unsubscribe(&self, id: ObserverId) {
        let mut inner = self.inner.lock().await;
        if inner.observers.remove(&id.0).is_some() {
            debug!(observer = id.0, total = inner.observers.len(), "observer unsubscribed");
        }
    }

    /// Deliver one event to every live observer, returning how many
    /// received it. Closed observers are removed.
    pub async fn broadcast(&self, event: &ProgressEvent) -> usize {
        let mut inner = self.inner.lock().await;

        let mut dead = Vec::new();
        let mut delivered = 0;
        for (id, tx) in &inner.observers {
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*id);
            }
        }
        for id in dead {
            inner.observers.remove(&id);
            debug!(observer = id, "pruned closed observer");
        }

        delivered
    }

    pub async fn observer_count(&self) -> usize {
        self.inner.lock().await.observers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::images::ProcessingStatus;

    fn sample_event(message: &str) -> ProgressEvent {
        ProgressEvent::new("img-1", ProcessingStatus::Processing, message, Some(0.0), None)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_observer() {
        let hub = EventHub::new();
        let (_a, mut rx_a) = hub.subscribe().await;
        let (_b, mut rx_b) = hub.subscribe().await;

        let delivered = hub.broadcast(&sample_event("hello")).await;
        assert_eq!(delivered, 2);

        assert_eq!(rx_a.try_recv().unwrap().message, "hello");
        assert_eq!(rx_b.try_recv().unwrap().message, "hello");
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_nothing_prior() {
        let hub = EventHub::new();
        hub.broadcast(&sample_event("before")).await;

        let (_id, mut rx) = hub.subscribe().await;
        assert!(rx.try_recv().is_err());

        hub.broadcast(&sample_event("after")).await;
        assert_eq!(rx.try_recv().unwrap().message, "after");
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let hub = EventHub::new();
        let (_id, rx) = hub.subscribe().await;
        drop(rx);

        let delivered = hub.broadcast(&sample_event("gone")).await;
        assert_eq!(delivered, 0);
        assert_eq!(hub.observer_count().await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let hub = EventHub::new();
        let (id, mut rx) = hub.subscribe().await;

        hub.unsubscribe(id).await;
        assert_eq!(hub.observer_count().await, 0);

        let delivered = hub.broadcast(&sample_event("later")).await;
        assert_eq!(delivered, 0);
        // sender side is gone, the channel reports closed
        assert!(rx.recv().await.is_none());
    }
}
