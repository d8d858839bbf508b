//! API error type: maps controller errors onto HTTP status codes with a
//! `{"error": ...}` body.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use vdm_core::controller::JobError;

pub const JOB_NOT_FOUND: &str = "Download not found";
pub const NOT_COMPLETE: &str = "Download not found or not complete";
pub const FILE_MISSING: &str = "Download file not found on server";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// Extractor failure on a synchronous request.
    Extractor { message: String, details: String },
    Internal(String),
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Invalid(msg) => ApiError::BadRequest(msg),
            JobError::NotFound(_) => ApiError::NotFound(JOB_NOT_FOUND.to_string()),
            JobError::NotComplete { .. } => ApiError::NotFound(NOT_COMPLETE.to_string()),
            JobError::ArtifactMissing { id, path } => {
                tracing::warn!(job = %id, path = %path.display(), "artifact missing on disk");
                ApiError::NotFound(FILE_MISSING.to_string())
            }
            JobError::Extractor(e) => ApiError::Extractor {
                message: "Failed to fetch video info".to_string(),
                details: e.diagnostic(),
            },
            JobError::Store(e) => ApiError::Internal(format!("{e:#}")),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::Extractor { message, details } => {
                tracing::warn!(details = %details, "{}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": message, "details": details }),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
