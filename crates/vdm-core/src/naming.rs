//! Artifact paths and download filenames.
//!
//! Artifacts live at `<downloads_dir>/<job id>`; the filename offered to the
//! client is derived from the history title and format, reduced to a token set
//! that is safe both on disk and inside a quoted header parameter.

use std::path::{Path, PathBuf};

use crate::job::JobId;

/// Longest token we emit for a title (well under NAME_MAX with an extension).
const TITLE_MAX: usize = 200;
/// Extension used when no history record names the format.
pub const DEFAULT_FORMAT: &str = "mp4";

/// Output path stem handed to the extractor for a job.
pub fn artifact_stem(downloads_dir: &Path, id: JobId) -> PathBuf {
    downloads_dir.join(id.to_string())
}

/// Resolve a path reported by the extractor. Relative paths are taken as
/// relative to the downloads directory.
pub fn resolve_reported_path(downloads_dir: &Path, reported: &Path) -> PathBuf {
    if reported.is_absolute() {
        reported.to_path_buf()
    } else {
        downloads_dir.join(reported)
    }
}

/// Reduces a title to `[a-z0-9_]`.
///
/// - Lowercases ASCII letters
/// - Replaces every other character with its own `_` (runs are kept)
/// - Limits length to 200 bytes
///
/// Returns None for an empty title.
pub fn sanitize_title(title: &str) -> Option<String> {
    if title.is_empty() {
        return None;
    }
    let token: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .take(TITLE_MAX)
        .collect();
    Some(token)
}

fn sanitize_format(format: &str) -> Option<String> {
    let f: String = format
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (!f.is_empty()).then_some(f)
}

/// Filename offered to the client: `<title token>.<format>`, falling back to
/// the job id and `mp4`.
pub fn attachment_filename(title: Option<&str>, format: Option<&str>, id: JobId) -> String {
    let stem = title
        .and_then(sanitize_title)
        .unwrap_or_else(|| id.to_string());
    let ext = format
        .and_then(sanitize_format)
        .unwrap_or_else(|| DEFAULT_FORMAT.to_string());
    format!("{}.{}", stem, ext)
}

/// `Content-Disposition` value for an attachment. `filename` must already be sanitized.
pub fn content_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn replaces_punctuation_and_lowercases() {
        assert_eq!(
            sanitize_title("Rick Astley - Never Gonna Give You Up (Official)").as_deref(),
            Some("rick_astley___never_gonna_give_you_up__official_")
        );
        assert_eq!(
            sanitize_title("My Video: Part 1").as_deref(),
            Some("my_video__part_1")
        );
    }

    #[test]
    fn strips_quotes_and_path_separators() {
        assert_eq!(
            sanitize_title("a/b\\c\"d").as_deref(),
            Some("a_b_c_d")
        );
    }

    #[test]
    fn every_other_character_becomes_one_underscore() {
        assert_eq!(sanitize_title("日本語").as_deref(), Some("___"));
        assert_eq!(sanitize_title("  ...  ").as_deref(), Some("_______"));
        assert_eq!(sanitize_title(""), None);
    }

    #[test]
    fn long_titles_are_truncated() {
        let title = "x".repeat(1000);
        assert_eq!(sanitize_title(&title).unwrap().len(), TITLE_MAX);
    }

    #[test]
    fn attachment_filename_fallbacks() {
        let id = Uuid::new_v4();
        assert_eq!(attachment_filename(Some("T"), Some("mp4"), id), "t.mp4");
        assert_eq!(attachment_filename(None, None, id), format!("{}.mp4", id));
        assert_eq!(attachment_filename(Some("!!!"), Some("WebM"), id), "___.webm");
        assert_eq!(attachment_filename(Some(""), Some("mp4"), id), format!("{}.mp4", id));
        assert_eq!(
            attachment_filename(Some("My Video: Part 1"), Some("mp4"), id),
            "my_video__part_1.mp4"
        );
        assert_eq!(attachment_filename(Some("Song"), Some("\"; x"), id), "song.x");
    }

    #[test]
    fn content_disposition_is_quoted() {
        assert_eq!(
            content_disposition("t.mp4"),
            "attachment; filename=\"t.mp4\""
        );
    }

    #[test]
    fn artifact_stem_uses_job_id() {
        let id = Uuid::new_v4();
        let stem = artifact_stem(Path::new("/srv/dl"), id);
        assert_eq!(stem, PathBuf::from(format!("/srv/dl/{}", id)));
        assert_eq!(
            resolve_reported_path(Path::new("/srv/dl"), Path::new("x.mp4")),
            PathBuf::from("/srv/dl/x.mp4")
        );
        assert_eq!(
            resolve_reported_path(Path::new("/srv/dl"), Path::new("/abs/x.mp4")),
            PathBuf::from("/abs/x.mp4")
        );
    }
}
