//! HTTP surface, mounted under `/api`.
//!
//! Handlers are thin: they validate input, call the controller and map
//! `JobError` to status codes via `ApiError`.

mod downloads;
mod error;
mod history;
mod video;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use vdm_core::controller::JobController;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub controller: JobController,
}

pub fn router(controller: JobController) -> Router {
    let api = Router::new()
        .route("/video/info", post(video::info))
        .route("/video/download", post(video::download))
        .route("/download/status/:id", get(downloads::status))
        .route("/download/cancel/:id", delete(downloads::cancel))
        .route("/download/file/:id", get(downloads::file))
        .route("/downloads", get(history::list).delete(history::clear));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { controller })
}
