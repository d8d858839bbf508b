//! Rows read from and written to the store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::extractor::ExtractResult;
use crate::job::{JobId, JobStatus, JobStatusView, ETA_UNKNOWN, SPEED_PLACEHOLDER};

/// Persisted projection of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    pub video_id: String,
    pub format_id: u32,
    pub progress: u8,
    pub status: JobStatus,
    pub file_path: Option<PathBuf>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Status as reported when the live entry is gone: no speed, no ETA.
    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            status: self.status,
            progress: self.progress,
            speed: SPEED_PLACEHOLDER.to_string(),
            estimated_time: ETA_UNKNOWN.to_string(),
            error: self.error.clone(),
        }
    }
}

/// A completed download, as listed by `GET /downloads`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub id: i64,
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub thumbnail: String,
    pub quality: String,
    pub format: String,
    pub size: String,
    pub file_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub download_job_id: Option<JobId>,
}

/// History row to insert when a job completes.
#[derive(Debug, Clone)]
pub struct NewDownload {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub thumbnail: String,
    pub quality: String,
    pub format: String,
    pub size: String,
    pub file_path: PathBuf,
}

impl NewDownload {
    /// Snapshot of an extractor result; `file_path` must already be resolved.
    pub fn from_result(video_id: &str, result: &ExtractResult) -> Self {
        Self {
            video_id: video_id.to_string(),
            title: result.title.clone(),
            author: result.author.clone(),
            thumbnail: result.thumbnail.clone(),
            quality: result.quality.clone(),
            format: result.format.clone(),
            size: result.size.clone(),
            file_path: result.file_path.clone(),
        }
    }
}
