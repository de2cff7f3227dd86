//! Job orchestration
//!
//! Drives one admitted job through the stage chain: pending jobs move
//! to `processing`, each stage's output is persisted before the matching
//! progress event goes out, and every exit path lands on a terminal
//! status. A stage panic is contained and recorded like any other fault.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::db::images::{ImageStore, ProcessingStatus, StageResults};
use crate::storage::LocalStorage;

use super::events::ProgressEvent;
use super::reporter::ProgressReporter;
use super::stage::{Artifact, Stage, StageError, StageOutput};

pub struct PipelineOrchestrator {
    store: ImageStore,
    storage: LocalStorage,
    stages: Vec<Arc<dyn Stage>>,
    reporter: ProgressReporter,
}

impl PipelineOrchestrator {
    pub fn new(
        store: ImageStore,
        storage: LocalStorage,
        stages: Vec<Arc<dyn Stage>>,
        reporter: ProgressReporter,
    ) -> Self {
        Self { store, storage, stages, reporter }
    }

    /// Run one job to a terminal status. Never panics the caller.
    pub async fn process(&self, image_id: &str) {
        let record = match self.store.get(image_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(%image_id, "job vanished before processing");
                return;
            }
            Err(err) => {
                error!(%image_id, error = %err, "could not load job");
                return;
            }
        };

        if record.status != ProcessingStatus::Pending {
            warn!(%image_id, status = %record.status, "job is not pending, skipping");
            return;
        }
        if let Err(err) = self.store.mark_processing(image_id).await {
            warn!(%image_id, error = %err, "job no longer admissible");
            return;
        }

        let started = Instant::now();
        let mut results = StageResults::new();
        let mut processed_filename: Option<String> = None;

        self.publish(image_id, ProcessingStatus::Processing, "Processing started", Some(0.0), &results)
            .await;

        let mut artifact = Artifact {
            image_id: image_id.to_string(),
            input_path: self.storage.upload_path(&record.stored_filename),
            output_path: self.storage.processed_path(&record.stored_filename),
        };

        let total = self.stages.len();
        for (index, stage) in self.stages.iter().enumerate() {
            debug!(%image_id, stage = stage.name(), "stage starting");

            let output = match run_isolated(Arc::clone(stage), artifact.clone()).await {
                Ok(output) => output,
                Err(err) => {
                    match &err {
                        StageError::Failed(reason) => {
                            warn!(%image_id, stage = stage.name(), reason, "stage failed")
                        }
                        StageError::Fault(_) => {
                            error!(%image_id, stage = stage.name(), error = %err, "stage fault")
                        }
                    }
                    self.fail(image_id, &err.to_string(), &results, started).await;
                    return;
                }
            };

            results.insert(stage.name().to_string(), output.data);
            if let Some(path) = output.artifact {
                match path.file_name().and_then(|name| name.to_str()) {
                    Some(name) => processed_filename = Some(name.to_string()),
                    None => warn!(%image_id, "stage artifact path has no file name"),
                }
                // downstream stages read what this stage wrote
                artifact.input_path = path;
            }

            if let Err(err) = self.store.update_stage_results(image_id, &results).await {
                error!(%image_id, error = %err, "could not persist stage results");
                self.fail(image_id, "internal error while persisting stage results", &results, started)
                    .await;
                return;
            }

            // the last stage's result rides on the terminal event instead
            if index + 1 < total {
                let progress = (index + 1) as f64 / total as f64;
                self.publish(
                    image_id,
                    ProcessingStatus::Processing,
                    format!("Stage '{}' completed", stage.name()),
                    Some(progress),
                    &results,
                )
                .await;
            }
        }

        let duration = started.elapsed().as_secs_f64();
        if let Err(err) = self
            .store
            .mark_completed(image_id, &results, processed_filename.as_deref(), duration)
            .await
        {
            error!(%image_id, error = %err, "could not mark job completed");
            return;
        }
        info!(%image_id, duration_secs = duration, "processing completed");
        self.publish(image_id, ProcessingStatus::Completed, "Processing completed", Some(1.0), &results)
            .await;
    }

    async fn fail(&self, image_id: &str, reason: &str, results: &StageResults, started: Instant) {
        let duration = started.elapsed().as_secs_f64();
        if let Err(err) = self.store.mark_failed(image_id, reason, duration).await {
            error!(%image_id, error = %err, "could not mark job failed");
            return;
        }
        self.publish(
            image_id,
            ProcessingStatus::Failed,
            format!("Processing failed: {reason}"),
            None,
            results,
        )
        .await;
    }

    async fn publish(
        &self,
        image_id: &str,
        status: ProcessingStatus,
        message: impl Into<String>,
        progress: Option<f64>,
        results: &StageResults,
    ) {
        self.reporter
            .publish(ProgressEvent::new(image_id, status, message, progress, Some(results.clone())))
            .await;
    }
}

/// Execute a stage in its own task so a panic inside it is contained
async fn run_isolated(stage: Arc<dyn Stage>, artifact: Artifact) -> Result<StageOutput, StageError> {
    let name = stage.name().to_string();
    match tokio::spawn(async move { stage.execute(artifact).await }).await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            Err(StageError::Fault(anyhow::anyhow!("stage '{name}' panicked")))
        }
        Err(_) => Err(StageError::Fault(anyhow::anyhow!("stage '{name}' was cancelled"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::images::NewImage;
    use crate::hub::EventHub;
    use crate::storage::StorageConfig;
    use async_trait::async_trait;
    use serde_json::json;
    use sqlx::SqlitePool;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::sync::Semaphore;

    struct OkStage {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Stage for OkStage {
        fn name(&self) -> &str {
            self.name
        }
        async fn execute(&self, _artifact: Artifact) -> Result<StageOutput, StageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StageOutput::data(json!({ "ran": self.name })))
        }
    }

    struct FailStage;

    #[async_trait]
    impl Stage for FailStage {
        fn name(&self) -> &str {
            "fragile"
        }
        async fn execute(&self, _artifact: Artifact) -> Result<StageOutput, StageError> {
            Err(StageError::failed("synthetic failure"))
        }
    }

    struct PanicStage;

    #[async_trait]
    impl Stage for PanicStage {
        fn name(&self) -> &str {
            "explosive"
        }
        async fn execute(&self, _artifact: Artifact) -> Result<StageOutput, StageError> {
            panic!("kaboom")
        }
    }

    /// Parks until released, so tests can act while a job is mid-run
    struct GateStage {
        reached: Arc<Semaphore>,
        release: Arc<Semaphore>,
    }

    #[async_trait]
    impl Stage for GateStage {
        fn name(&self) -> &str {
            "gated"
        }
        async fn execute(&self, _artifact: Artifact) -> Result<StageOutput, StageError> {
            self.reached.add_permits(1);
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
            Ok(StageOutput::data(json!({ "ran": "gated" })))
        }
    }

    async fn harness(
        pool: SqlitePool,
        stages: Vec<Arc<dyn Stage>>,
    ) -> (tempfile::TempDir, ImageStore, EventHub, PipelineOrchestrator) {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            upload_dir: dir.path().join("uploads"),
            processed_dir: dir.path().join("processed"),
            ..StorageConfig::default()
        };
        let storage = LocalStorage::new(config).await.unwrap();
        let store = ImageStore::new(pool);
        let hub = EventHub::new();
        let reporter = ProgressReporter::new(store.clone(), hub.clone());
        let orchestrator =
            PipelineOrchestrator::new(store.clone(), storage, stages, reporter);
        (dir, store, hub, orchestrator)
    }

    async fn seed(store: &ImageStore, id: &str) {
        store
            .create(NewImage {
                id: id.to_string(),
                original_filename: "a.png".to_string(),
                stored_filename: format!("{id}.png"),
                checksum: "c".to_string(),
                size_bytes: 1,
            })
            .await
            .unwrap();
    }

    fn ok_stages(calls: &Arc<AtomicUsize>) -> Vec<Arc<dyn Stage>> {
        vec![
            Arc::new(OkStage { name: "one", calls: calls.clone() }),
            Arc::new(OkStage { name: "two", calls: calls.clone() }),
            Arc::new(OkStage { name: "three", calls: calls.clone() }),
        ]
    }

    fn drain(rx: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_three_stage_run_completes(pool: SqlitePool) {
        let calls = Arc::new(AtomicUsize::new(0));
        let (_dir, store, hub, orchestrator) = harness(pool, ok_stages(&calls)).await;
        seed(&store, "img-1").await;
        let (_oid, mut rx) = hub.subscribe().await;

        orchestrator.process("img-1").await;

        let record = store.get("img-1").await.unwrap().unwrap();
        assert_eq!(record.status, ProcessingStatus::Completed);
        assert!(record.completed_at.is_some());
        assert!(record.duration_secs.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let results = record.stage_results.unwrap().0;
        let keys: Vec<&String> = results.keys().collect();
        assert_eq!(keys, vec!["one", "two", "three"]);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].status, ProcessingStatus::Processing);
        assert_eq!(events[0].progress, Some(0.0));
        assert_eq!(events[1].progress, Some(1.0 / 3.0));
        assert_eq!(events[1].message, "Stage 'one' completed");
        assert_eq!(events[2].progress, Some(2.0 / 3.0));
        assert_eq!(events[3].status, ProcessingStatus::Completed);
        assert_eq!(events[3].progress, Some(1.0));
        assert_eq!(events[3].stage_results.as_ref().unwrap().len(), 3);

        // audit trail carries the same four events
        assert_eq!(store.list_events("img-1").await.unwrap().len(), 4);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_stage_failure_fails_job_and_skips_rest(pool: SqlitePool) {
        let calls = Arc::new(AtomicUsize::new(0));
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(OkStage { name: "one", calls: calls.clone() }),
            Arc::new(FailStage),
            Arc::new(OkStage { name: "three", calls: calls.clone() }),
        ];
        let (_dir, store, hub, orchestrator) = harness(pool, stages).await;
        seed(&store, "img-1").await;
        let (_oid, mut rx) = hub.subscribe().await;

        orchestrator.process("img-1").await;

        let record = store.get("img-1").await.unwrap().unwrap();
        assert_eq!(record.status, ProcessingStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("synthetic failure"));
        assert!(record.completed_at.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "stage after the failure ran");

        let partial = record.stage_results.unwrap().0;
        assert_eq!(partial.len(), 1);
        assert!(partial.contains_key("one"));

        let events = drain(&mut rx);
        let last = events.last().unwrap();
        assert_eq!(last.status, ProcessingStatus::Failed);
        assert_eq!(last.message, "Processing failed: synthetic failure");
        assert_eq!(last.progress, None);
        assert_eq!(last.stage_results.as_ref().unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_stage_panic_is_contained(pool: SqlitePool) {
        let (_dir, store, _hub, orchestrator) =
            harness(pool, vec![Arc::new(PanicStage) as Arc<dyn Stage>]).await;
        seed(&store, "img-1").await;

        orchestrator.process("img-1").await;

        let record = store.get("img-1").await.unwrap().unwrap();
        assert_eq!(record.status, ProcessingStatus::Failed);
        assert!(record.error.unwrap().contains("panicked"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_terminal_job_is_not_reprocessed(pool: SqlitePool) {
        let calls = Arc::new(AtomicUsize::new(0));
        let (_dir, store, _hub, orchestrator) = harness(pool, ok_stages(&calls)).await;
        seed(&store, "img-1").await;

        orchestrator.process("img-1").await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let events_before = store.list_events("img-1").await.unwrap().len();

        orchestrator.process("img-1").await;

        assert_eq!(calls.load(Ordering::SeqCst), 3, "stages ran again");
        assert_eq!(store.list_events("img-1").await.unwrap().len(), events_before);
        let record = store.get("img-1").await.unwrap().unwrap();
        assert_eq!(record.status, ProcessingStatus::Completed);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_unknown_job_is_ignored(pool: SqlitePool) {
        let (_dir, store, _hub, orchestrator) =
            harness(pool, vec![Arc::new(FailStage) as Arc<dyn Stage>]).await;

        orchestrator.process("ghost").await;

        assert!(store.get("ghost").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_mid_run_subscriber_sees_only_later_events(pool: SqlitePool) {
        let reached = Arc::new(Semaphore::new(0));
        let release = Arc::new(Semaphore::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(OkStage { name: "one", calls: calls.clone() }),
            Arc::new(GateStage { reached: reached.clone(), release: release.clone() }),
            Arc::new(OkStage { name: "three", calls: calls.clone() }),
        ];
        let (_dir, store, hub, orchestrator) = harness(pool, stages).await;
        seed(&store, "img-1").await;

        let (_a, mut rx_early) = hub.subscribe().await;

        let orchestrator = Arc::new(orchestrator);
        let run = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.process("img-1").await }
        });

        // join as a second observer while stage two is underway
        reached.acquire().await.unwrap().forget();
        let (_b, mut rx_late) = hub.subscribe().await;
        release.add_permits(1);
        run.await.unwrap();

        let early = drain(&mut rx_early);
        let late = drain(&mut rx_late);
        assert_eq!(early.len(), 4);
        assert_eq!(late.len(), 2, "late observer saw replayed history");
        assert_eq!(late.last().unwrap().status, ProcessingStatus::Completed);
    }
}
