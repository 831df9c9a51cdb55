use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ErrorBody;
use crate::services::{AnalysisError, AuthError, FieldErrors};

const ANALYSIS_FAILED_MESSAGE: &str = "Image analysis failed. Please try with a different image.";
const ANALYSIS_FAULT_MESSAGE: &str = "Analysis failed. Please try again or contact support.";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    /// Per-field problems, returned to the client as the map itself.
    FieldErrors(FieldErrors),

    /// The predictor rejected the upload. Detail is logged, not returned.
    AnalysisFailed(String),

    /// Unexpected fault while analysing an upload.
    AnalysisFault(String),

    InternalError(String),

    Unauthorized(String),

    PayloadTooLarge,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::FieldErrors(errors) => write!(f, "Validation error: {}", errors),
            ApiError::AnalysisFailed(msg) => write!(f, "Analysis failed: {}", msg),
            ApiError::AnalysisFault(msg) => write!(f, "Analysis fault: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::PayloadTooLarge => write!(f, "Payload too large"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::FieldErrors(errors) => {
                return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::AnalysisFailed(_) => {
                (StatusCode::BAD_REQUEST, ANALYSIS_FAILED_MESSAGE.to_string())
            }
            ApiError::AnalysisFault(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ANALYSIS_FAULT_MESSAGE.to_string(),
            ),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Uploaded file is too large".to_string(),
            ),
        };

        (status, Json(ErrorBody::new(error_message))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => Self::FieldErrors(errors),
            err @ (AuthError::InvalidCredentials | AuthError::InvalidToken) => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::UserNotFound => Self::not_found("User"),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            err @ AnalysisError::MissingImage => Self::validation(err.to_string()),
            AnalysisError::AnalysisFailed(detail) => Self::AnalysisFailed(detail),
            AnalysisError::Fault(detail) => Self::AnalysisFault(detail),
            AnalysisError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str) -> Self {
        ApiError::NotFound(format!("{} not found", resource))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_field_errors_are_returned_as_map() {
        let err = ApiError::from(AuthError::Validation(FieldErrors::single(
            "username",
            "A user with that username already exists.",
        )));

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["username"][0],
            "A user with that username already exists."
        );
    }

    #[tokio::test]
    async fn test_analysis_errors_hide_detail() {
        let (status, body) = body_json(ApiError::from(AnalysisError::AnalysisFailed(
            "Error during prediction: bad magic".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], ANALYSIS_FAILED_MESSAGE);

        let (status, body) =
            body_json(ApiError::from(AnalysisError::Fault("disk on fire".to_string()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], ANALYSIS_FAULT_MESSAGE);
    }

    #[tokio::test]
    async fn test_auth_failures_are_unauthorized() {
        let (status, body) = body_json(ApiError::from(AuthError::InvalidCredentials)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body["error"],
            "No active account found with the given credentials"
        );

        let (status, body) = body_json(ApiError::from(AuthError::InvalidToken)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Token is invalid or expired");
    }
}
