//! Built-in placeholder stages
//!
//! Stand-ins for real models: cheap deterministic image routines with
//! the same contract a model-backed stage would have.

mod caption;
mod classify;
mod denoise;

pub use caption::CaptionStage;
pub use classify::ClassifyStage;
pub use denoise::DenoiseStage;

use std::sync::Arc;

use super::stage::{Stage, StageError};

/// Split an `image::open` failure into the two halves of the stage
/// contract: undecodable input fails the job, I/O trouble is a fault.
pub(crate) fn decode_error(err: image::ImageError) -> StageError {
    match err {
        image::ImageError::IoError(io) => anyhow::Error::new(io).context("reading image").into(),
        other => StageError::failed(format!("could not decode image: {other}")),
    }
}

/// The default chain: classification, denoising, captioning
pub fn default_stages() -> Vec<Arc<dyn Stage>> {
    vec![
        Arc::new(ClassifyStage),
        Arc::new(DenoiseStage),
        Arc::new(CaptionStage),
    ]
}
