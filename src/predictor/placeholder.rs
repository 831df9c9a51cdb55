//! Stand-in predictor used until a trained model is wired in.
//!
//! It runs the same preprocessing a real model would need (decode, RGB,
//! square resize, `[0, 1]` normalisation) so unreadable uploads are rejected
//! exactly as they would be in production, then returns a fixed diagnosis.

use image::ImageReader;
use image::imageops::FilterType;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info};

use super::{Diagnosis, Prediction, PredictionFailure, Predictor};

static MODEL: OnceLock<ModelHandle> = OnceLock::new();

/// Process-wide model handle. Loaded once on first use and never replaced.
#[derive(Debug)]
pub struct ModelHandle {
    name: &'static str,
}

impl ModelHandle {
    fn load() -> Self {
        info!("Initialising placeholder crop disease model");
        Self {
            name: "PLACEHOLDER_MODEL",
        }
    }

    /// Returns the shared handle, initialising it on the first call.
    pub fn get() -> &'static Self {
        MODEL.get_or_init(Self::load)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("cannot read image {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("input size must be greater than zero")]
    ZeroInputSize,
}

/// Decodes `path` into a `[1, size, size, 3]` tensor with values in `[0, 1]`.
pub fn preprocess_image(path: &Path, size: u32) -> Result<Array4<f32>, PreprocessError> {
    if size == 0 {
        return Err(PreprocessError::ZeroInputSize);
    }

    // Sniff the format from the content; stored names may carry a generic extension
    let img = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|e| PreprocessError::Read {
            path: path.to_path_buf(),
            source: e,
        })?
        .decode()
        .map_err(|e| PreprocessError::Decode {
            path: path.to_path_buf(),
            source: e,
        })?;

    let rgb = image::imageops::resize(&img.to_rgb8(), size, size, FilterType::CatmullRom);
    let side = size as usize;

    Ok(Array4::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
        #[allow(clippy::cast_possible_truncation)]
        let pixel = rgb.get_pixel(x as u32, y as u32);
        f32::from(pixel[c]) / 255.0
    }))
}

pub struct PlaceholderPredictor {
    input_size: u32,
}

impl PlaceholderPredictor {
    #[must_use]
    pub const fn new(input_size: u32) -> Self {
        Self { input_size }
    }

    fn fixed_diagnosis() -> Diagnosis {
        Diagnosis {
            disease: "Sample Disease (Placeholder)".to_string(),
            confidence: 0.85,
            description:
                "This is a placeholder response. Please integrate your actual ML model."
                    .to_string(),
            suggested_actions: vec![
                "Monitor the crop regularly".to_string(),
                "Apply appropriate fungicide if needed".to_string(),
                "Ensure proper irrigation".to_string(),
            ],
        }
    }
}

impl Predictor for PlaceholderPredictor {
    fn predict(&self, image_path: &Path) -> anyhow::Result<Prediction> {
        let model = ModelHandle::get();

        let tensor = match preprocess_image(image_path, self.input_size) {
            Ok(tensor) => tensor,
            Err(e) => return Ok(Prediction::Failure(PredictionFailure::new(e))),
        };

        debug!(
            model = model.name(),
            shape = ?tensor.shape(),
            path = %image_path.display(),
            "Image preprocessed"
        );

        Ok(Prediction::Diagnosis(Self::fixed_diagnosis()))
    }
}
