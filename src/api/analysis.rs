//! Analysis API endpoints.
//!
//! Uploads are read from a multipart body and handed to the
//! [`AnalysisService`](crate::services::AnalysisService), which owns the
//! record lifecycle.

use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use serde_json::Value;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::services::{AnalysisSummary, AuthUser, UploadedImage};

const IMAGE_FIELD: &str = "image";
const NO_IMAGE: &str = "No image provided";

fn multipart_error(err: &MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::validation(err.body_text())
    }
}

/// Reads the first non-empty `image` field, skipping everything else.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<UploadedImage>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;

        if !bytes.is_empty() {
            return Ok(Some(UploadedImage {
                file_name,
                bytes: bytes.to_vec(),
            }));
        }
    }

    Ok(None)
}

/// `POST /api/analysis/upload/`
pub async fn upload(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let multipart = multipart.map_err(|_| ApiError::validation(NO_IMAGE))?;

    let upload = read_image_field(multipart)
        .await?
        .ok_or_else(|| ApiError::validation(NO_IMAGE))?;

    let payload = state.analysis_service.analyze_upload(user.id, upload).await?;

    Ok(Json(payload))
}

/// `GET /api/analysis/history/`
pub async fn history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<AnalysisSummary>>, ApiError> {
    let items = state.analysis_service.history(user.id).await?;
    Ok(Json(items))
}
