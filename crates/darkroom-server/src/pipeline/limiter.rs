//! Admission control
//!
//! A single dispatcher task drains the submission queue in order and
//! waits for a semaphore slot before admitting the next job, so
//! admission order is exactly submission order and at most `capacity`
//! jobs run at once. The slot travels into the job task and is released
//! when the job finishes, however it finishes.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Queue handle for submitting jobs to the pipeline
#[derive(Debug, Clone)]
pub struct PipelineLimiter {
    tx: UnboundedSender<String>,
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl PipelineLimiter {
    /// Spawn the dispatcher. `run` is called once per admitted job; the
    /// job's slot is held until the returned future finishes, panics
    /// included.
    pub fn start<F, Fut>(capacity: usize, run: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let slots = Arc::new(Semaphore::new(capacity));

        let dispatcher_slots = Arc::clone(&slots);
        tokio::spawn(async move {
            let run = Arc::new(run);
            while let Some(image_id) = rx.recv().await {
                // next submission waits here until a slot frees up
                let Ok(permit) = dispatcher_slots.clone().acquire_owned().await else {
                    break;
                };
                debug!(image_id = %image_id, "job admitted");

                let run = Arc::clone(&run);
                tokio::spawn(async move {
                    let _slot = permit;
                    run(image_id).await;
                });
            }
            info!("pipeline dispatcher stopped");
        });

        Self { tx, slots, capacity }
    }

    /// Queue a job for processing; returns immediately regardless of
    /// how many jobs are already waiting
    pub fn submit(&self, image_id: impl Into<String>) {
        let image_id = image_id.into();
        if self.tx.send(image_id.clone()).is_err() {
            error!(image_id = %image_id, "pipeline dispatcher is gone, job not queued");
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}
