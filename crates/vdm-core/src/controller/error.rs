//! Errors surfaced by the controller to its callers.

use std::path::PathBuf;
use thiserror::Error;

use crate::extractor::ExtractorError;
use crate::job::{JobId, JobStatus};

#[derive(Debug, Error)]
pub enum JobError {
    /// Bad input on the synchronous accept path.
    #[error("{0}")]
    Invalid(String),
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("job {id} is not complete (status {status})")]
    NotComplete { id: JobId, status: JobStatus },
    /// The job completed but its artifact is gone from disk.
    #[error("artifact for job {id} missing at {}", .path.display())]
    ArtifactMissing { id: JobId, path: PathBuf },
    #[error(transparent)]
    Extractor(#[from] ExtractorError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
