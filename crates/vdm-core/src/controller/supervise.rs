//! Per-job supervising task: drives the extractor's event stream into the
//! registry and the store, and settles the job exactly once.

use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::metrics::{artifact_bytes, Sample, ThroughputSampler};
use super::JobController;
use crate::extractor::{ExtractRequest, ExtractResult, ExtractorEvent};
use crate::job::{JobId, JobStatus};
use crate::naming::resolve_reported_path;
use crate::store::NewDownload;

const NO_RESULT: &str = "extractor exited without reporting a result";

pub(super) async fn run(
    ctl: JobController,
    id: JobId,
    request: ExtractRequest,
    kill: CancellationToken,
) {
    let mut handle = match ctl.inner.extractor.start(&request).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(job = %id, error = %e, "extractor failed to start");
            ctl.fail(id, e.diagnostic()).await;
            return;
        }
    };
    tracing::debug!(job = %id, stem = %request.output_stem.display(), "extractor started");

    let stem = id.to_string();
    let started = Instant::now();
    let mut sampler = ThroughputSampler::new();
    let mut ticker = tokio::time::interval(ctl.inner.settings.sample_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut result: Option<ExtractResult> = None;
    let mut failure: Option<String> = None;

    loop {
        tokio::select! {
            biased;
            _ = kill.cancelled() => {
                // Cancel owns the terminal write for this job.
                handle.kill();
                tracing::debug!(job = %id, "extractor killed");
                return;
            }
            event = handle.next_event() => match event {
                Some(ExtractorEvent::Progress { percent }) => ctl.progress(id, percent).await,
                Some(ExtractorEvent::Result(r)) => result = Some(r),
                Some(ExtractorEvent::Failure { diagnostic }) => failure = Some(diagnostic),
                None => break,
            },
            _ = ticker.tick() => {
                let Some(job) = ctl.inner.registry.get(id) else { continue };
                let sample = Sample {
                    elapsed_secs: started.elapsed().as_secs_f64(),
                    percent: job.progress,
                    bytes: artifact_bytes(&ctl.inner.settings.downloads_dir, &stem).await,
                };
                let m = sampler.observe(sample);
                let _ = ctl.inner.registry.update_metrics(id, m.speed, m.estimated_time);
            }
        }
    }

    match (failure, result) {
        (Some(diagnostic), _) => ctl.fail(id, diagnostic).await,
        (None, Some(result)) => ctl.complete(id, result).await,
        (None, None) => ctl.fail(id, NO_RESULT.to_string()).await,
    }
}

impl JobController {
    async fn progress(&self, id: JobId, percent: u8) {
        let registry = &self.inner.registry;
        let Ok(progress) = registry.update_progress(id, percent) else {
            return;
        };
        if let Ok(JobStatus::Pending) = registry.set_status(id, JobStatus::Downloading, None) {
            tracing::info!(job = %id, "download started");
        }
        if let Err(e) = self.inner.store.record_progress(id, progress).await {
            tracing::warn!(job = %id, error = %e, "failed to persist progress");
        }
    }

    async fn complete(&self, id: JobId, result: ExtractResult) {
        let registry = &self.inner.registry;
        let Some(job) = registry.get(id) else { return };
        if !registry.settle(id) {
            return;
        }

        let file_path = resolve_reported_path(&self.inner.settings.downloads_dir, &result.file_path);
        let mut download = NewDownload::from_result(&job.video_id, &result);
        download.file_path = file_path.clone();

        match self.inner.store.complete_with_history(id, &download).await {
            Ok(Some(row)) => {
                let _ = registry.set_file_path(id, file_path.clone());
                let _ = registry.set_status(id, JobStatus::Complete, None);
                tracing::info!(
                    job = %id,
                    history = row,
                    path = %file_path.display(),
                    title = %result.title,
                    "job complete"
                );
            }
            Ok(None) => {
                // Row was finished elsewhere; the store is authoritative.
                tracing::warn!(job = %id, "job row already terminal, dropping result");
                registry.remove(id);
                return;
            }
            Err(e) => {
                tracing::error!(job = %id, error = %e, "failed to record completion");
                let message = format!("failed to record completion: {e:#}");
                if let Err(e) = self
                    .inner
                    .store
                    .finish_job(id, JobStatus::Error, job.progress, Some(&message))
                    .await
                {
                    tracing::error!(job = %id, error = %e, "failed to persist error state");
                }
                let _ = registry.set_status(id, JobStatus::Error, Some(message));
            }
        }
        self.schedule_eviction(id);
    }

    async fn fail(&self, id: JobId, diagnostic: String) {
        let registry = &self.inner.registry;
        let Some(job) = registry.get(id) else { return };
        if !registry.settle(id) {
            return;
        }
        let diagnostic = if diagnostic.trim().is_empty() {
            NO_RESULT.to_string()
        } else {
            diagnostic
        };

        tracing::warn!(job = %id, error = %diagnostic, "job failed");
        if let Err(e) = self
            .inner
            .store
            .finish_job(id, JobStatus::Error, job.progress, Some(&diagnostic))
            .await
        {
            tracing::error!(job = %id, error = %e, "failed to persist error state");
        }
        let _ = registry.set_status(id, JobStatus::Error, Some(diagnostic));
        self.schedule_eviction(id);
    }

    /// Drop a terminal entry once the retention window has passed.
    fn schedule_eviction(&self, id: JobId) {
        let retention = self.inner.settings.terminal_retention;
        let registry = self.inner.registry.clone();
        if retention.is_zero() {
            registry.evict_terminal(id);
            return;
        }
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            if registry.evict_terminal(id) {
                tracing::debug!(job = %id, "evicted terminal job");
            }
        });
    }
}
