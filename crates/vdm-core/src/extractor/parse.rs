//! Line protocol spoken by the extractor on stdout.
//!
//! `progress: <n>` reports a percentage and `file_info: <json>` carries the
//! result payload. Everything else, including malformed markers, is not an event.

use super::{ExtractResult, ExtractorEvent};

const PROGRESS_MARKER: &str = "progress:";
const RESULT_MARKER: &str = "file_info:";

/// Decode one stdout line. Returns None for non-event lines.
pub fn parse_line(line: &str) -> Option<ExtractorEvent> {
    if let Some((_, rest)) = line.split_once(RESULT_MARKER) {
        return match serde_json::from_str::<ExtractResult>(rest.trim()) {
            Ok(result) => Some(ExtractorEvent::Result(result)),
            Err(e) => {
                tracing::warn!("ignoring malformed result payload: {}", e);
                None
            }
        };
    }

    let (_, rest) = line.split_once(PROGRESS_MARKER)?;
    let digits: &str = {
        let rest = rest.trim_start();
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    let value: u64 = digits.parse().ok()?;
    Some(ExtractorEvent::Progress {
        percent: value.min(100) as u8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn progress_lines() {
        assert_eq!(
            parse_line("progress: 42"),
            Some(ExtractorEvent::Progress { percent: 42 })
        );
        assert_eq!(
            parse_line("progress:7\r"),
            Some(ExtractorEvent::Progress { percent: 7 })
        );
        assert_eq!(
            parse_line("progress: 250"),
            Some(ExtractorEvent::Progress { percent: 100 })
        );
    }

    #[test]
    fn malformed_progress_is_ignored() {
        assert_eq!(parse_line("progress: abc"), None);
        assert_eq!(parse_line("progress: -5"), None);
        assert_eq!(parse_line("progress:"), None);
    }

    #[test]
    fn result_line() {
        let line = r#"file_info: {"title":"T","author":"A","thumbnail":"http://t/x.jpg","quality":"360p","format":"mp4","size":"10MB","filePath":"/dl/abc.mp4"}"#;
        match parse_line(line) {
            Some(ExtractorEvent::Result(r)) => {
                assert_eq!(r.title, "T");
                assert_eq!(r.format, "mp4");
                assert_eq!(r.size, "10MB");
                assert_eq!(r.file_path, PathBuf::from("/dl/abc.mp4"));
            }
            other => panic!("expected result, got {:?}", other),
        }
    }

    #[test]
    fn result_with_missing_optional_fields() {
        let line = r#"file_info: {"title":"T","format":"webm","filePath":"x.webm"}"#;
        match parse_line(line) {
            Some(ExtractorEvent::Result(r)) => {
                assert!(r.author.is_empty());
                assert_eq!(r.format, "webm");
            }
            other => panic!("expected result, got {:?}", other),
        }
    }

    #[test]
    fn malformed_result_is_ignored() {
        assert_eq!(parse_line("file_info: {not json"), None);
        assert_eq!(parse_line(r#"file_info: {"title":"T"}"#), None);
    }

    #[test]
    fn noise_is_ignored() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("Downloading video..."), None);
    }
}
