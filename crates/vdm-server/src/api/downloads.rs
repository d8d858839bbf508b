//! Per-job routes: status, cancel, file.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::io;
use tokio_util::io::ReaderStream;
use vdm_core::controller::CancelOutcome;
use vdm_core::job::{parse_job_id, JobId};
use vdm_core::naming::content_disposition;

use super::error::{FILE_MISSING, JOB_NOT_FOUND};
use super::{ApiError, AppState};

/// Malformed ids cannot name a job.
fn job_id(raw: &str) -> Result<JobId, ApiError> {
    parse_job_id(raw).ok_or_else(|| ApiError::NotFound(JOB_NOT_FOUND.to_string()))
}

pub async fn status(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = job_id(&raw)?;
    Ok(Json(state.controller.status(id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = job_id(&raw)?;
    match state.controller.cancel(id).await? {
        CancelOutcome::Cancelled => Ok(Json(serde_json::json!({
            "message": "Download cancelled",
        }))),
        CancelOutcome::AlreadyFinished(status) => Err(ApiError::NotFound(format!(
            "Download is not active (status: {status})"
        ))),
    }
}

/// The file can vanish between the size check and the open.
pub(super) fn open_failed(path: &std::path::Path, e: io::Error) -> ApiError {
    match e.kind() {
        io::ErrorKind::NotFound => ApiError::NotFound(FILE_MISSING.to_string()),
        _ => ApiError::Internal(format!("open {}: {e}", path.display())),
    }
}

pub async fn file(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let id = job_id(&raw)?;
    let artifact = state.controller.artifact(id).await?;
    let file = tokio::fs::File::open(&artifact.path)
        .await
        .map_err(|e| open_failed(&artifact.path, e))?;

    let disposition = HeaderValue::from_str(&content_disposition(&artifact.filename))
        .map_err(|e| ApiError::Internal(format!("content-disposition: {e}")))?;
    tracing::info!(job = %id, file = %artifact.filename, bytes = artifact.len, "serving artifact");

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_LENGTH, HeaderValue::from(artifact.len)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
