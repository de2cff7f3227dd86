//! The stage abstraction

use std::path::PathBuf;

use async_trait::async_trait;

/// What a stage receives: identity plus the current artifact paths
#[derive(Debug, Clone)]
pub struct Artifact {
    pub image_id: String,
    /// Current input; the original upload, or the output of whichever
    /// earlier stage last produced one
    pub input_path: PathBuf,
    /// Where a transforming stage should write
    pub output_path: PathBuf,
}

/// What a stage hands back
#[derive(Debug)]
pub struct StageOutput {
    /// Summary recorded under the stage's name in the results map
    pub data: serde_json::Value,
    /// New artifact for downstream stages, if one was written
    pub artifact: Option<PathBuf>,
}

impl StageOutput {
    pub fn data(data: serde_json::Value) -> Self {
        Self { data, artifact: None }
    }

    pub fn with_artifact(mut self, path: PathBuf) -> Self {
        self.artifact = Some(path);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Input-dependent failure; the job fails cleanly
    #[error("{0}")]
    Failed(String),

    /// Unexpected fault (I/O, panic, runtime trouble)
    #[error("{0:#}")]
    Fault(#[from] anyhow::Error),
}

impl StageError {
    pub fn failed(message: impl Into<String>) -> Self {
        StageError::Failed(message.into())
    }
}

/// One step of the pipeline. Implementations must be safe to call from
/// concurrently running jobs.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable key under which this stage's output is recorded
    fn name(&self) -> &str;

    async fn execute(&self, artifact: Artifact) -> Result<StageOutput, StageError>;
}
