//! Crop disease prediction.
//!
//! A [`Predictor`] maps a stored image to a [`Prediction`]. The payload it
//! produces is persisted verbatim on the analysis record and returned to the
//! client, so the serialized field names are part of the HTTP contract.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod placeholder;

pub use placeholder::{ModelHandle, PlaceholderPredictor, preprocess_image};

/// Successful diagnosis payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub disease: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub description: String,
    pub suggested_actions: Vec<String>,
}

/// Payload reported when the image could not be analysed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFailure {
    pub error: String,
    pub disease: String,
    pub confidence: f64,
}

impl PredictionFailure {
    pub fn new(detail: impl std::fmt::Display) -> Self {
        Self {
            error: format!("Error during prediction: {detail}"),
            disease: "Unknown".to_string(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Diagnosis(Diagnosis),
    Failure(PredictionFailure),
}

impl Prediction {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// JSON document stored on the record and sent to the client.
    pub fn to_payload(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Turns an image on disk into a [`Prediction`].
///
/// `Ok(Prediction::Failure(_))` means the image itself was unusable.
/// `Err(_)` is reserved for faults unrelated to the input, which callers
/// must not expose to clients.
pub trait Predictor: Send + Sync {
    fn predict(&self, image_path: &Path) -> anyhow::Result<Prediction>;
}
