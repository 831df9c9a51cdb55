//! Domain service for crop image analysis.
//!
//! One upload drives one record through `created -> finalized | deleted`:
//! the record is committed before the predictor runs and removed again on
//! every failure path, so history never shows an unfinished attempt.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors specific to analysis operations.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No image provided")]
    MissingImage,

    /// The predictor rejected the image. Carries the predictor's detail for logs.
    #[error("Image analysis failed: {0}")]
    AnalysisFailed(String),

    /// Anything else that went wrong while analysing. Never shown to clients.
    #[error("Analysis fault: {0}")]
    Fault(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for AnalysisError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AnalysisError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// An image received from a client.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// History entry as shown to the owner. The owner itself is implied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub id: i32,
    /// Public URL of the stored image
    pub image: String,
    pub result: Option<Value>,
    #[serde(rename = "timestamp")]
    pub created_at: String,
}

/// Domain service trait for analyses.
#[async_trait::async_trait]
pub trait AnalysisService: Send + Sync {
    /// Stores the image, records the attempt, runs the predictor and returns
    /// the payload persisted on the record.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::MissingImage`] for an empty upload,
    /// [`AnalysisError::AnalysisFailed`] when the predictor rejects the image
    /// and [`AnalysisError::Fault`] for anything unexpected. No record
    /// survives an error.
    async fn analyze_upload(
        &self,
        user_id: i32,
        upload: UploadedImage,
    ) -> Result<Value, AnalysisError>;

    /// All analyses owned by `user_id`, newest first.
    async fn history(&self, user_id: i32) -> Result<Vec<AnalysisSummary>, AnalysisError>;
}
