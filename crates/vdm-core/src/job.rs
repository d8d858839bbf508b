//! Job model shared by the registry, the controller, the store and the HTTP layer.
//!
//! A job moves `pending → downloading → {complete | error | cancelled}`; the
//! three terminal states have no outgoing transitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job identifier. Also the stem of the job's artifact on disk.
pub type JobId = Uuid;

/// Speed reported before a sample interval has elapsed, and for persisted jobs.
pub const SPEED_PLACEHOLDER: &str = "0 MB/s";
/// ETA reported while the rate is still unknown.
pub const ETA_CALCULATING: &str = "calculating...";
/// ETA reported for jobs answered from the store.
pub const ETA_UNKNOWN: &str = "unknown";

/// Parse an external job handle. Anything that is not a UUID cannot name a job.
pub fn parse_job_id(raw: &str) -> Option<JobId> {
    Uuid::parse_str(raw.trim()).ok()
}

/// Lifecycle state of a job, stored as a lowercase string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Downloading,
    Complete,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Unknown strings map to `Error` so a corrupt row never looks live.
    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "downloading" => JobStatus::Downloading,
            "complete" => JobStatus::Complete,
            "error" => JobStatus::Error,
            "cancelled" => JobStatus::Cancelled,
            _ => JobStatus::Error,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Error | JobStatus::Cancelled
        )
    }

    /// Whether `self → next` is allowed. Staying in the same live state is allowed;
    /// going back to `pending` or leaving a terminal state is not.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending => true,
            JobStatus::Downloading => next != JobStatus::Pending,
            JobStatus::Complete | JobStatus::Error | JobStatus::Cancelled => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a status poll returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub status: JobStatus,
    pub progress: u8,
    pub speed: String,
    pub estimated_time: String,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_roundtrip() {
        for s in [
            JobStatus::Pending,
            JobStatus::Downloading,
            JobStatus::Complete,
            JobStatus::Error,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::from_str(s.as_str()), s);
        }
        assert_eq!(JobStatus::from_str("bogus"), JobStatus::Error);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [JobStatus::Complete, JobStatus::Error, JobStatus::Cancelled] {
            assert!(from.is_terminal());
            for to in [
                JobStatus::Pending,
                JobStatus::Downloading,
                JobStatus::Complete,
                JobStatus::Error,
                JobStatus::Cancelled,
            ] {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn live_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Downloading));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Error));
        assert!(JobStatus::Downloading.can_transition_to(JobStatus::Downloading));
        assert!(JobStatus::Downloading.can_transition_to(JobStatus::Complete));
        assert!(!JobStatus::Downloading.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn status_view_serializes_camel_case() {
        let view = JobStatusView {
            status: JobStatus::Downloading,
            progress: 40,
            speed: SPEED_PLACEHOLDER.to_string(),
            estimated_time: ETA_CALCULATING.to_string(),
            error: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "downloading");
        assert_eq!(json["estimatedTime"], "calculating...");
        assert!(json["error"].is_null());
    }

    #[test]
    fn job_id_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(parse_job_id(&id.to_string()), Some(id));
        assert_eq!(parse_job_id("not-a-job"), None);
    }
}
