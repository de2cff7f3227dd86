//! Captioning stage

use async_trait::async_trait;
use serde_json::json;

use crate::pipeline::stage::{Artifact, Stage, StageError, StageOutput};

use super::decode_error;

/// Produces a dimensions caption from the image header alone
pub struct CaptionStage;

#[async_trait]
impl Stage for CaptionStage {
    fn name(&self) -> &str {
        "captioning"
    }

    async fn execute(&self, artifact: Artifact) -> Result<StageOutput, StageError> {
        let path = artifact.input_path.clone();
        let (width, height) = tokio::task::spawn_blocking(move || image::image_dimensions(path))
            .await
            .map_err(|err| anyhow::anyhow!("captioning task died: {err}"))?
            .map_err(decode_error)?;

        let caption = format!("An image of size {width}x{height} pixels.");
        Ok(StageOutput::data(json!({ "caption": caption })))
    }
}
