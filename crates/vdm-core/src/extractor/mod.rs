//! External extractor adapter.
//!
//! The extractor is a black-box process: given a video id and a format
//! selector it writes the artifact and reports progress on stdout. This module
//! turns that output into a typed event stream and owns the process until it
//! exits or is killed.

mod error;
mod parse;
mod process;
#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use error::ExtractorError;
pub use parse::parse_line;
pub use process::ProcessExtractor;

/// Result payload printed by the extractor once the artifact is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResult {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub quality: String,
    pub format: String,
    #[serde(default)]
    pub size: String,
    /// Where the extractor actually wrote the artifact.
    pub file_path: PathBuf,
}

/// Typed event decoded from the extractor.
///
/// The stream ends after the process exits: a clean exit simply closes the
/// stream, a non-zero exit is reported as a final `Failure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractorEvent {
    Progress { percent: u8 },
    Result(ExtractResult),
    Failure { diagnostic: String },
}

/// One download format offered by the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFormat {
    pub itag: u32,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(rename = "type", default)]
    pub container: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub bitrate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_quality: Option<String>,
    #[serde(default)]
    pub has_video: bool,
    #[serde(default)]
    pub has_audio: bool,
}

/// Flat metadata record returned by the extractor's info mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub views: String,
    #[serde(default)]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub formats: Vec<VideoFormat>,
}

/// What to extract and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    pub video_id: String,
    pub format_id: u32,
    /// Artifact path stem; the extractor may append an extension.
    pub output_stem: PathBuf,
}

/// A running extraction: its event stream and a switch that terminates it.
pub struct ExtractorHandle {
    events: mpsc::Receiver<ExtractorEvent>,
    kill: CancellationToken,
}

impl ExtractorHandle {
    pub fn new(events: mpsc::Receiver<ExtractorEvent>, kill: CancellationToken) -> Self {
        Self { events, kill }
    }

    /// Next decoded event; None once the process has exited and all output is drained.
    pub async fn next_event(&mut self) -> Option<ExtractorEvent> {
        self.events.recv().await
    }

    /// Request immediate termination. Returns without waiting for the process to die.
    pub fn kill(&self) {
        self.kill.cancel();
    }
}

/// Seam between the controller and the extraction engine.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Fetch metadata for a source URL (request/response, no job state).
    async fn info(&self, url: &str) -> Result<VideoMetadata, ExtractorError>;

    /// Spawn one extraction. Errors only if the process could not be started.
    async fn start(&self, request: &ExtractRequest) -> Result<ExtractorHandle, ExtractorError>;
}
