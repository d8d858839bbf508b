//! Process adapter tests driven by `/bin/sh` scripts speaking the extractor protocol.
//!
//! Arguments after the script: $1=--download $2=<url> $3=--itag $4=<format> $5=--output $6=<stem>.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ExtractorConfig;
use crate::extractor::{ExtractRequest, Extractor, ExtractorError, ExtractorEvent, ProcessExtractor};

fn sh_extractor(script: &str) -> ProcessExtractor {
    ProcessExtractor::new(ExtractorConfig {
        program: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "vdm-extractor".to_string()],
        info_timeout_secs: 1,
        kill_grace_secs: 1,
        ..ExtractorConfig::default()
    })
}

fn request() -> ExtractRequest {
    ExtractRequest {
        video_id: "abc123".to_string(),
        format_id: 18,
        output_stem: PathBuf::from("/tmp/vdm-test-stem"),
    }
}

async fn drain(handle: &mut crate::extractor::ExtractorHandle) -> Vec<ExtractorEvent> {
    let mut events = Vec::new();
    while let Some(ev) =
        tokio::time::timeout(Duration::from_secs(10), handle.next_event())
            .await
            .expect("extractor stream stalled")
    {
        events.push(ev);
    }
    events
}

#[tokio::test]
async fn successful_run_streams_progress_then_result() {
    let script = r#"
        [ "$1" = "--download" ] || exit 9
        [ "$4" = "18" ] || exit 9
        echo "progress: 10"
        echo "fetching stream"
        echo "progress: 40"
        echo "progress: 90"
        printf 'file_info: {"title":"T","format":"mp4","size":"10MB","filePath":"%s.mp4"}\n' "$6"
    "#;
    let extractor = sh_extractor(script);
    let mut handle = extractor.start(&request()).await.unwrap();
    let events = drain(&mut handle).await;

    assert_eq!(events.len(), 4, "events: {:?}", events);
    assert_eq!(events[0], ExtractorEvent::Progress { percent: 10 });
    assert_eq!(events[2], ExtractorEvent::Progress { percent: 90 });
    match &events[3] {
        ExtractorEvent::Result(r) => {
            assert_eq!(r.title, "T");
            assert_eq!(r.format, "mp4");
            assert_eq!(r.file_path, PathBuf::from("/tmp/vdm-test-stem.mp4"));
        }
        other => panic!("expected result, got {:?}", other),
    }
}

#[tokio::test]
async fn watch_url_is_built_from_template() {
    let script = r#"
        [ "$2" = "https://www.youtube.com/watch?v=abc123" ] || { echo "bad url $2" >&2; exit 3; }
    "#;
    let extractor = sh_extractor(script);
    let mut handle = extractor.start(&request()).await.unwrap();
    assert!(drain(&mut handle).await.is_empty());
}

#[tokio::test]
async fn non_zero_exit_reports_stderr_as_failure() {
    let script = r#"
        echo "progress: 5"
        echo "Error: stream with itag 18 not found" >&2
        exit 1
    "#;
    let extractor = sh_extractor(script);
    let mut handle = extractor.start(&request()).await.unwrap();
    let events = drain(&mut handle).await;

    assert_eq!(events.first(), Some(&ExtractorEvent::Progress { percent: 5 }));
    match events.last() {
        Some(ExtractorEvent::Failure { diagnostic }) => {
            assert!(diagnostic.contains("itag 18 not found"), "{}", diagnostic);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn silent_failure_still_has_a_diagnostic() {
    let extractor = sh_extractor("exit 4");
    let mut handle = extractor.start(&request()).await.unwrap();
    match drain(&mut handle).await.as_slice() {
        [ExtractorEvent::Failure { diagnostic }] => assert!(!diagnostic.is_empty()),
        other => panic!("expected one failure, got {:?}", other),
    }
}

#[tokio::test]
async fn kill_ends_stream_without_waiting_for_process() {
    let script = r#"
        echo "progress: 5"
        exec sleep 30
    "#;
    let extractor = sh_extractor(script);
    let mut handle = extractor.start(&request()).await.unwrap();
    assert_eq!(
        handle.next_event().await,
        Some(ExtractorEvent::Progress { percent: 5 })
    );

    handle.kill();
    let next = tokio::time::timeout(Duration::from_secs(5), handle.next_event())
        .await
        .expect("stream should close after kill");
    assert_eq!(next, None);
}

#[tokio::test]
async fn spawn_failure_is_reported() {
    let extractor = ProcessExtractor::new(ExtractorConfig {
        program: "/nonexistent/vdm-extractor".to_string(),
        ..ExtractorConfig::default()
    });
    match extractor.start(&request()).await {
        Err(ExtractorError::Spawn { program, .. }) => {
            assert_eq!(program, PathBuf::from("/nonexistent/vdm-extractor"));
        }
        Err(other) => panic!("expected spawn error, got {:?}", other),
        Ok(_) => panic!("expected spawn error"),
    }
}

#[tokio::test]
async fn info_parses_metadata() {
    let script = r#"
        [ "$1" = "--info" ] || exit 9
        printf '{"id":"abc123","title":"T","author":"A","publishDate":null,"formats":[{"itag":18,"quality":"360p","type":"mp4","mimeType":"video/mp4","size":"10.0 MB","bitrate":"500 kbps","hasVideo":true,"hasAudio":true}]}'
    "#;
    let extractor = sh_extractor(script);
    let meta = extractor
        .info("https://www.youtube.com/watch?v=abc123")
        .await
        .unwrap();
    assert_eq!(meta.id, "abc123");
    assert_eq!(meta.title, "T");
    assert_eq!(meta.formats.len(), 1);
    assert_eq!(meta.formats[0].itag, 18);
    assert_eq!(meta.formats[0].container.as_deref(), Some("mp4"));
    assert!(meta.formats[0].has_video);
}

#[tokio::test]
async fn info_failure_carries_diagnostic() {
    let extractor = sh_extractor("echo 'PytubeFixError: video unavailable' >&2; exit 1");
    match extractor.info("https://www.youtube.com/watch?v=gone").await {
        Err(err @ ExtractorError::Failed { .. }) => {
            assert!(err.diagnostic().contains("video unavailable"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn info_garbage_is_a_parse_error() {
    let extractor = sh_extractor("echo 'not json'");
    assert!(matches!(
        extractor.info("https://example.com/v").await,
        Err(ExtractorError::Parse(_))
    ));
}

#[tokio::test]
async fn info_times_out() {
    let extractor = sh_extractor("exec sleep 10");
    assert!(matches!(
        extractor.info("https://example.com/v").await,
        Err(ExtractorError::Timeout(1))
    ));
}
