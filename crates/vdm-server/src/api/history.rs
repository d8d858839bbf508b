//! `GET /api/downloads` and `DELETE /api/downloads`.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.controller.history(params.limit).await?))
}

pub async fn clear(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.controller.clear_history().await?;
    Ok(Json(serde_json::json!({
        "message": "Download history cleared",
    })))
}
