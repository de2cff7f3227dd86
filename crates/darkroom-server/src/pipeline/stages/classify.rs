//! Classification stage
//!
//! Labels the image from coarse pixel statistics. No model behind it;
//! the shape of the output matches what a real classifier would emit.

use async_trait::async_trait;
use image::DynamicImage;
use serde_json::json;

use crate::pipeline::stage::{Artifact, Stage, StageError, StageOutput};

use super::decode_error;

pub struct ClassifyStage;

struct PixelStats {
    saturation: f64,
    brightness: f64,
    /// Share of near-black or near-white samples
    extremes: f64,
}

#[async_trait]
impl Stage for ClassifyStage {
    fn name(&self) -> &str {
        "classification"
    }

    async fn execute(&self, artifact: Artifact) -> Result<StageOutput, StageError> {
        let path = artifact.input_path.clone();
        let image = tokio::task::spawn_blocking(move || image::open(path))
            .await
            .map_err(|err| anyhow::anyhow!("classification task died: {err}"))?
            .map_err(decode_error)?;

        let stats = pixel_stats(&image);
        let scores = label_scores(&stats);

        let mut best = scores[0];
        for candidate in &scores[1..] {
            if candidate.1 > best.1 {
                best = *candidate;
            }
        }

        let mut score_map = serde_json::Map::new();
        for (label, score) in scores {
            score_map.insert(label.to_string(), json!(round4(score)));
        }

        Ok(StageOutput::data(json!({ "label": best.0, "scores": score_map })))
    }
}

/// Mean saturation and brightness plus the extreme-pixel share,
/// sampled on a coarse grid rather than every pixel
fn pixel_stats(image: &DynamicImage) -> PixelStats {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let step_x = (width / 64).max(1);
    let step_y = (height / 64).max(1);

    let mut saturation = 0.0;
    let mut brightness = 0.0;
    let mut extremes = 0u32;
    let mut samples = 0u32;

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let pixel = rgb.get_pixel(x, y);
            let r = f64::from(pixel[0]) / 255.0;
            let g = f64::from(pixel[1]) / 255.0;
            let b = f64::from(pixel[2]) / 255.0;
            let max = r.max(g).max(b);
            let min = r.min(g).min(b);

            brightness += max;
            if max > 0.0 {
                saturation += (max - min) / max;
            }
            if max < 0.08 || max > 0.92 {
                extremes += 1;
            }
            samples += 1;
            x += step_x;
        }
        y += step_y;
    }

    let count = f64::from(samples.max(1));
    PixelStats {
        saturation: saturation / count,
        brightness: brightness / count,
        extremes: f64::from(extremes) / count,
    }
}

/// Weighted blends of the statistics, normalized to sum to one
fn label_scores(stats: &PixelStats) -> [(&'static str, f64); 5] {
    let s = stats.saturation;
    let v = stats.brightness;
    let e = stats.extremes;

    let mut scores = [
        ("painting", s * 0.7 + v * 0.3),
        ("photo", s * 0.5 + (1.0 - e) * 0.5),
        ("schematic", (1.0 - s) * 0.5 + e * 0.5),
        ("sketch", (1.0 - s) * 0.6 + v * 0.4),
        ("text", e * 0.8 + (1.0 - s) * 0.2),
    ];

    let total: f64 = scores.iter().map(|(_, score)| score).sum();
    if total > 0.0 {
        for entry in &mut scores {
            entry.1 /= total;
        }
    }
    scores
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
