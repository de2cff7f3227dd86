//! Denoising stage
//!
//! The only transforming stage in the default chain: writes a blurred
//! copy into the processed directory and points downstream stages at it.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::json;

use crate::pipeline::stage::{Artifact, Stage, StageError, StageOutput};

use super::decode_error;

const BLUR_SIGMA: f32 = 1.0;

pub struct DenoiseStage;

#[async_trait]
impl Stage for DenoiseStage {
    fn name(&self) -> &str {
        "denoising"
    }

    async fn execute(&self, artifact: Artifact) -> Result<StageOutput, StageError> {
        let input = artifact.input_path.clone();
        let output = artifact.output_path.clone();

        let file_name = output
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow::anyhow!("output path {} has no file name", output.display())
            })?;

        let written = tokio::task::spawn_blocking(move || {
            let image = image::open(&input).map_err(decode_error)?;
            let denoised = image.blur(BLUR_SIGMA);
            denoised.save(&output).map_err(|err| {
                StageError::Fault(anyhow::anyhow!("writing {}: {err}", output.display()))
            })?;
            Ok::<PathBuf, StageError>(output)
        })
        .await
        .map_err(|err| anyhow::anyhow!("denoising task died: {err}"))??;

        Ok(StageOutput::data(json!({ "output": file_name })).with_artifact(written))
    }
}
