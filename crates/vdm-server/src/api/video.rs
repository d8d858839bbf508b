//! `POST /api/video/info` and `POST /api/video/download`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Deserializer, Serialize};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct InfoRequest {
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn info(
    State(state): State<AppState>,
    body: Result<Json<InfoRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let url = req.url.unwrap_or_default();
    if url.trim().is_empty() {
        return Err(ApiError::BadRequest("URL is required".to_string()));
    }
    let meta = state.controller.video_info(&url).await?;
    Ok(Json(meta))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default, deserialize_with = "format_id")]
    pub format_id: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadAccepted {
    pub download_id: String,
}

pub async fn download(
    State(state): State<AppState>,
    body: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    // Format 0 and an empty video id count as missing.
    let video_id = req.video_id.filter(|v| !v.is_empty());
    let format_id = req.format_id.filter(|&f| f != 0);
    let (Some(video_id), Some(format_id)) = (video_id, format_id) else {
        return Err(ApiError::BadRequest(
            "Video ID and format ID are required".to_string(),
        ));
    };
    let id = state.controller.create_job(&video_id, format_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(DownloadAccepted {
            download_id: id.to_string(),
        }),
    ))
}

/// Accepts `18` or `"18"`.
fn format_id<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid formatId: {s:?}"))),
    }
}
