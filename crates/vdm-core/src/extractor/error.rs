//! Extractor error type.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    /// The process could not be started (missing binary, permissions).
    #[error("failed to spawn extractor {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The process exited unsuccessfully; `diagnostic` is its captured stderr.
    #[error("extractor exited with {status}: {diagnostic}")]
    Failed { status: String, diagnostic: String },
    /// The process succeeded but its output could not be decoded.
    #[error("unparsable extractor output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("extractor timed out after {0}s")]
    Timeout(u64),
    #[error("extractor i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractorError {
    /// Diagnostic text suitable for surfacing to a client.
    pub fn diagnostic(&self) -> String {
        match self {
            ExtractorError::Failed { diagnostic, .. } if !diagnostic.is_empty() => {
                diagnostic.clone()
            }
            other => other.to_string(),
        }
    }
}
