use std::path::Path;

use anyhow::Context;

use crate::config::Config;
use crate::predictor::{PlaceholderPredictor, Predictor};

pub fn cmd_predict(config: &Config, path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("Image not found: {}", path.display());
    }

    let predictor = PlaceholderPredictor::new(config.predictor.input_size);
    let prediction = predictor.predict(path)?;

    let payload = prediction.to_payload().context("Failed to encode payload")?;
    println!("{}", serde_json::to_string_pretty(&payload)?);

    if prediction.is_failure() {
        anyhow::bail!("Prediction failed for {}", path.display());
    }

    Ok(())
}
