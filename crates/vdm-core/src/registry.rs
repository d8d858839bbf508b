//! Live job registry: job id → in-memory state of jobs that still have (or just
//! had) a process behind them.
//!
//! The controller's per-job task is the only writer for its entry; status polls
//! read consistent snapshots concurrently. Nothing here is durable; a miss
//! means "ask the store".

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::job::{JobId, JobStatus, JobStatusView, ETA_CALCULATING, SPEED_PLACEHOLDER};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("job {0} is not registered")]
    Unknown(JobId),
    #[error("job {0} is already registered")]
    Duplicate(JobId),
    #[error("job {id}: illegal transition {from} -> {to}")]
    IllegalTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
}

/// In-memory state of one job.
#[derive(Debug, Clone)]
pub struct LiveJob {
    pub video_id: String,
    pub format_id: u32,
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
    pub progress: u8,
    pub speed: String,
    pub estimated_time: String,
    pub error: Option<String>,
    pub file_path: Option<PathBuf>,
    /// Set once the supervising task has claimed the terminal transition.
    settled: bool,
    kill: CancellationToken,
}

impl LiveJob {
    pub fn new(video_id: impl Into<String>, format_id: u32, kill: CancellationToken) -> Self {
        Self {
            video_id: video_id.into(),
            format_id,
            created_at: Utc::now(),
            status: JobStatus::Pending,
            progress: 0,
            speed: SPEED_PLACEHOLDER.to_string(),
            estimated_time: ETA_CALCULATING.to_string(),
            error: None,
            file_path: None,
            settled: false,
            kill,
        }
    }

    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            status: self.status,
            progress: self.progress,
            speed: self.speed.clone(),
            estimated_time: self.estimated_time.clone(),
            error: self.error.clone(),
        }
    }

    /// True once the job can no longer be cancelled.
    pub fn is_settled(&self) -> bool {
        self.settled || self.status.is_terminal()
    }
}

/// Outcome of trying to claim a job for cancellation.
#[derive(Debug)]
pub enum CancelClaim {
    /// The entry was live. It stays registered as a settled `Cancelled` tombstone
    /// (so polls keep its progress) until the caller removes it; its kill switch
    /// has been tripped.
    Claimed(LiveJob),
    /// The job already finished (or is committing its result); nothing changed.
    Finished(JobStatus),
    Missing,
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, LiveJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, LiveJob>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, LiveJob>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new job. Each id may only be registered once.
    pub fn put(&self, id: JobId, job: LiveJob) -> Result<(), RegistryError> {
        let mut jobs = self.write();
        if jobs.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        jobs.insert(id, job);
        Ok(())
    }

    /// Snapshot of a registered job.
    pub fn get(&self, id: JobId) -> Option<LiveJob> {
        self.read().get(&id).cloned()
    }

    /// Status snapshot of a registered job.
    pub fn view(&self, id: JobId) -> Option<JobStatusView> {
        self.read().get(&id).map(LiveJob::view)
    }

    /// Raise progress to `percent` (never lowers it). Returns the stored value.
    /// Terminal entries are left untouched.
    pub fn update_progress(&self, id: JobId, percent: u8) -> Result<u8, RegistryError> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(RegistryError::Unknown(id))?;
        if !job.status.is_terminal() {
            job.progress = job.progress.max(percent.min(100));
        }
        Ok(job.progress)
    }

    /// Replace the display-only speed/ETA strings of a live entry.
    pub fn update_metrics(
        &self,
        id: JobId,
        speed: String,
        estimated_time: String,
    ) -> Result<(), RegistryError> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(RegistryError::Unknown(id))?;
        if !job.status.is_terminal() {
            job.speed = speed;
            job.estimated_time = estimated_time;
        }
        Ok(())
    }

    /// Move a job to `status`. `complete` forces progress to 100; `error` records the message.
    /// Returns the previous status.
    pub fn set_status(
        &self,
        id: JobId,
        status: JobStatus,
        error: Option<String>,
    ) -> Result<JobStatus, RegistryError> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(RegistryError::Unknown(id))?;
        let from = job.status;
        if !from.can_transition_to(status) {
            return Err(RegistryError::IllegalTransition {
                id,
                from,
                to: status,
            });
        }
        job.status = status;
        match status {
            JobStatus::Complete => {
                job.progress = 100;
                job.estimated_time = "0s".to_string();
            }
            JobStatus::Error => job.error = error,
            _ => {}
        }
        Ok(from)
    }

    pub fn set_file_path(&self, id: JobId, path: PathBuf) -> Result<(), RegistryError> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(RegistryError::Unknown(id))?;
        job.file_path = Some(path);
        Ok(())
    }

    /// Claim the terminal transition for the supervising task. Returns false if the
    /// job was cancelled or already settled.
    pub fn settle(&self, id: JobId) -> bool {
        let mut jobs = self.write();
        match jobs.get_mut(&id) {
            Some(job) if !job.is_settled() => {
                job.settled = true;
                true
            }
            _ => false,
        }
    }

    /// Atomically mark a live, unsettled job `Cancelled` and settled, and trip its
    /// kill switch. The entry is not removed.
    pub fn claim_cancel(&self, id: JobId) -> CancelClaim {
        let mut jobs = self.write();
        match jobs.get_mut(&id) {
            None => CancelClaim::Missing,
            Some(job) if job.is_settled() => CancelClaim::Finished(job.status),
            Some(job) => {
                job.status = JobStatus::Cancelled;
                job.settled = true;
                job.kill.cancel();
                CancelClaim::Claimed(job.clone())
            }
        }
    }

    /// Remove an entry unconditionally.
    pub fn remove(&self, id: JobId) -> Option<LiveJob> {
        self.write().remove(&id)
    }

    /// Remove an entry only if it is terminal (eviction after retention).
    pub fn evict_terminal(&self, id: JobId) -> bool {
        let mut jobs = self.write();
        if jobs.get(&id).is_some_and(|j| j.status.is_terminal()) {
            jobs.remove(&id);
            return true;
        }
        false
    }

    /// Ids of entries that are not terminal.
    pub fn live_ids(&self) -> Vec<JobId> {
        self.read()
            .iter()
            .filter(|(_, j)| !j.status.is_terminal())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
