//! Job lifecycle controller.
//!
//! Owns the live registry, the extractor and the store. `create_job` persists a
//! `pending` row, registers the job and spawns one supervising task per job;
//! that task is the only writer for the job until it settles or is cancelled.
//! Pollers read the registry first and fall back to the store.

mod error;
pub mod metrics;
mod supervise;

pub use error::JobError;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::config::VdmConfig;
use crate::extractor::{ExtractRequest, Extractor, VideoMetadata};
use crate::job::{JobId, JobStatus, JobStatusView};
use crate::naming::{artifact_stem, attachment_filename};
use crate::registry::{CancelClaim, JobRegistry, LiveJob};
use crate::store::{DownloadRecord, JobStore};

/// Hard cap on one history page.
pub const MAX_HISTORY_LIMIT: u32 = 100;

/// Tunables taken from the config file.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub downloads_dir: PathBuf,
    pub sample_interval: Duration,
    pub terminal_retention: Duration,
    pub history_limit: u32,
}

impl ControllerSettings {
    pub fn from_config(cfg: &VdmConfig) -> Result<Self> {
        Ok(Self {
            downloads_dir: cfg.resolved_downloads_dir()?,
            sample_interval: cfg.progress_sample_interval(),
            terminal_retention: cfg.terminal_retention(),
            history_limit: cfg.history_limit,
        })
    }
}

/// Result of a cancel request on a job the registry still knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// The job already reached (or is committing) this state.
    AlreadyFinished(JobStatus),
}

/// A completed job's artifact, ready to stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    /// Client-facing filename (`<sanitized title>.<format>`).
    pub filename: String,
    pub len: u64,
}

struct Inner {
    store: JobStore,
    registry: Arc<JobRegistry>,
    extractor: Arc<dyn Extractor>,
    settings: ControllerSettings,
}

#[derive(Clone)]
pub struct JobController {
    inner: Arc<Inner>,
}

impl JobController {
    pub fn new(
        store: JobStore,
        extractor: Arc<dyn Extractor>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                registry: Arc::new(JobRegistry::new()),
                extractor,
                settings,
            }),
        }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.inner.settings.downloads_dir
    }

    pub fn store(&self) -> &JobStore {
        &self.inner.store
    }

    /// Number of jobs in the live registry (including terminal ones not yet evicted).
    pub fn live_jobs(&self) -> usize {
        self.inner.registry.len()
    }

    /// Accept a job and start it in the background. Returns as soon as the job
    /// is persisted and registered.
    pub async fn create_job(&self, video_id: &str, format_id: u32) -> Result<JobId, JobError> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return Err(JobError::Invalid("videoId is required".to_string()));
        }

        let id = Uuid::new_v4();
        self.inner.store.create_job(id, video_id, format_id).await?;

        let kill = CancellationToken::new();
        self.inner
            .registry
            .put(id, LiveJob::new(video_id, format_id, kill.clone()))
            .map_err(anyhow::Error::from)?;

        let request = ExtractRequest {
            video_id: video_id.to_string(),
            format_id,
            output_stem: artifact_stem(&self.inner.settings.downloads_dir, id),
        };
        tokio::spawn(supervise::run(self.clone(), id, request, kill));

        tracing::info!(job = %id, video_id, format_id, "job accepted");
        Ok(id)
    }

    /// Live status if registered, else the persisted row.
    pub async fn status(&self, id: JobId) -> Result<JobStatusView, JobError> {
        if let Some(view) = self.inner.registry.view(id) {
            return Ok(view);
        }
        match self.inner.store.get_job(id).await? {
            Some(record) => Ok(record.view()),
            None => Err(JobError::NotFound(id)),
        }
    }

    /// Cancel a running job. Trips the kill switch and returns without waiting
    /// for the process to exit. Jobs not in the registry are `NotFound`.
    ///
    /// The registry entry answers polls as `Cancelled` until the store row is
    /// written, then it is dropped.
    pub async fn cancel(&self, id: JobId) -> Result<CancelOutcome, JobError> {
        match self.inner.registry.claim_cancel(id) {
            CancelClaim::Missing => Err(JobError::NotFound(id)),
            CancelClaim::Finished(status) => {
                tracing::debug!(job = %id, %status, "cancel ignored, job already finished");
                Ok(CancelOutcome::AlreadyFinished(status))
            }
            CancelClaim::Claimed(job) => {
                let persisted = self
                    .inner
                    .store
                    .finish_job(id, JobStatus::Cancelled, job.progress, None)
                    .await;
                self.inner.registry.remove(id);
                persisted?;
                tracing::info!(job = %id, progress = job.progress, "job cancelled");
                Ok(CancelOutcome::Cancelled)
            }
        }
    }

    /// Locate the artifact of a completed job.
    pub async fn artifact(&self, id: JobId) -> Result<Artifact, JobError> {
        let job = self
            .inner
            .store
            .get_job(id)
            .await?
            .ok_or(JobError::NotFound(id))?;
        if job.status != JobStatus::Complete {
            return Err(JobError::NotComplete {
                id,
                status: job.status,
            });
        }

        let path = job
            .file_path
            .unwrap_or_else(|| artifact_stem(&self.inner.settings.downloads_dir, id));
        let len = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(JobError::ArtifactMissing { id, path }),
        };

        let download = self.inner.store.get_download_by_job(id).await?;
        let filename = attachment_filename(
            download.as_ref().map(|d| d.title.as_str()),
            download.as_ref().map(|d| d.format.as_str()),
            id,
        );
        Ok(Artifact {
            path,
            filename,
            len,
        })
    }

    /// Most recent downloads; `limit` defaults to the configured page size.
    pub async fn history(&self, limit: Option<u32>) -> Result<Vec<DownloadRecord>, JobError> {
        let limit = limit
            .unwrap_or(self.inner.settings.history_limit)
            .clamp(1, MAX_HISTORY_LIMIT);
        Ok(self.inner.store.list_downloads(limit).await?)
    }

    pub async fn clear_history(&self) -> Result<u64, JobError> {
        let n = self.inner.store.clear_downloads().await?;
        tracing::info!(deleted = n, "history cleared");
        Ok(n)
    }

    /// Metadata for a source URL.
    pub async fn video_info(&self, url: &str) -> Result<VideoMetadata, JobError> {
        let url = validate_source_url(url)?;
        Ok(self.inner.extractor.info(url.as_str()).await?)
    }

    /// Fail every job left live by a previous run. Call before accepting requests.
    pub async fn recover(&self) -> Result<u64, JobError> {
        let n = self.inner.store.recover_interrupted_jobs().await?;
        if n > 0 {
            tracing::warn!(jobs = n, "marked interrupted jobs as failed");
        }
        Ok(n)
    }

    /// Cancel every live job. Returns how many were cancelled.
    pub async fn shutdown(&self) -> usize {
        let mut cancelled = 0;
        for id in self.inner.registry.live_ids() {
            match self.cancel(id).await {
                Ok(CancelOutcome::Cancelled) => cancelled += 1,
                Ok(CancelOutcome::AlreadyFinished(_)) | Err(JobError::NotFound(_)) => {}
                Err(e) => tracing::warn!(job = %id, error = %e, "cancel on shutdown failed"),
            }
        }
        if cancelled > 0 {
            tracing::info!(jobs = cancelled, "cancelled live jobs on shutdown");
        }
        cancelled
    }
}

/// Require an absolute http(s) URL.
pub fn validate_source_url(raw: &str) -> Result<Url, JobError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(JobError::Invalid("url is required".to_string()));
    }
    let url = Url::parse(raw).map_err(|e| JobError::Invalid(format!("invalid url: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(JobError::Invalid(
            "url must be an http or https URL".to_string(),
        )),
    }
}
