//! The image processing pipeline
//!
//! [`limiter::PipelineLimiter`] admits queued jobs in submission order
//! under a fixed concurrency cap. Each admitted job runs through
//! [`orchestrator::PipelineOrchestrator`], which drives the configured
//! [`stage::Stage`] chain and publishes progress through
//! [`reporter::ProgressReporter`].

pub mod events;
pub mod limiter;
pub mod orchestrator;
pub mod reporter;
pub mod stage;
pub mod stages;

pub use events::ProgressEvent;
pub use limiter::PipelineLimiter;
pub use orchestrator::PipelineOrchestrator;
pub use reporter::ProgressReporter;
pub use stage::{Artifact, Stage, StageError, StageOutput};
