//! Tests for the store (in-memory DB unless a file is the point).

use std::path::PathBuf;
use uuid::Uuid;

use crate::job::JobStatus;
use crate::store::{JobStore, NewDownload, INTERRUPTED_MESSAGE};

fn download(video_id: &str, title: &str) -> NewDownload {
    NewDownload {
        video_id: video_id.to_string(),
        title: title.to_string(),
        author: "A".to_string(),
        thumbnail: "https://img.example/t.jpg".to_string(),
        quality: "360p".to_string(),
        format: "mp4".to_string(),
        size: "10MB".to_string(),
        file_path: PathBuf::from(format!("/downloads/{video_id}.mp4")),
    }
}

#[tokio::test]
async fn create_and_read_back_pending_job() {
    let store = JobStore::open_in_memory().await.unwrap();
    let id = Uuid::new_v4();
    store.create_job(id, "abc123", 18).await.unwrap();

    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.id, id);
    assert_eq!(job.video_id, "abc123");
    assert_eq!(job.format_id, 18);
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.progress, 0);
    assert!(job.file_path.is_none());
    assert!(job.error.is_none());

    assert!(store.get_job(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn progress_is_monotonic_and_starts_downloading() {
    let store = JobStore::open_in_memory().await.unwrap();
    let id = Uuid::new_v4();
    store.create_job(id, "abc123", 18).await.unwrap();

    store.record_progress(id, 40).await.unwrap();
    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Downloading);
    assert_eq!(job.progress, 40);

    store.record_progress(id, 20).await.unwrap();
    assert_eq!(store.get_job(id).await.unwrap().unwrap().progress, 40);
}

#[tokio::test]
async fn completion_writes_job_and_history_together() {
    let store = JobStore::open_in_memory().await.unwrap();
    let id = Uuid::new_v4();
    store.create_job(id, "abc123", 18).await.unwrap();
    store.record_progress(id, 90).await.unwrap();

    let row = store
        .complete_with_history(id, &download("abc123", "T"))
        .await
        .unwrap();
    assert!(row.is_some());

    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Complete);
    assert_eq!(job.progress, 100);
    assert_eq!(job.file_path, Some(PathBuf::from("/downloads/abc123.mp4")));

    let history = store.list_downloads(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].format, "mp4");
    assert_eq!(history[0].download_job_id, Some(id));

    let by_job = store.get_download_by_job(id).await.unwrap().unwrap();
    assert_eq!(by_job.title, "T");
}

#[tokio::test]
async fn terminal_rows_are_never_overwritten() {
    let store = JobStore::open_in_memory().await.unwrap();
    let id = Uuid::new_v4();
    store.create_job(id, "abc123", 18).await.unwrap();
    store.record_progress(id, 20).await.unwrap();

    assert!(store
        .finish_job(id, JobStatus::Cancelled, 30, None)
        .await
        .unwrap());
    assert!(!store
        .finish_job(id, JobStatus::Error, 80, Some("late"))
        .await
        .unwrap());
    assert!(store
        .complete_with_history(id, &download("abc123", "T"))
        .await
        .unwrap()
        .is_none());
    store.record_progress(id, 90).await.unwrap();

    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.progress, 30);
    assert!(job.error.is_none());
    assert!(store.list_downloads(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn finish_job_rejects_complete() {
    let store = JobStore::open_in_memory().await.unwrap();
    let id = Uuid::new_v4();
    store.create_job(id, "abc123", 18).await.unwrap();
    assert!(store
        .finish_job(id, JobStatus::Complete, 100, None)
        .await
        .is_err());
    assert_eq!(
        store.get_job(id).await.unwrap().unwrap().status,
        JobStatus::Pending
    );
}

#[tokio::test]
async fn error_rows_keep_their_message() {
    let store = JobStore::open_in_memory().await.unwrap();
    let id = Uuid::new_v4();
    store.create_job(id, "abc123", 18).await.unwrap();
    assert!(store
        .finish_job(id, JobStatus::Error, 0, Some("HTTP 403"))
        .await
        .unwrap());
    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("HTTP 403"));
    assert_eq!(job.view().estimated_time, "unknown");
    assert_eq!(job.view().speed, "0 MB/s");
}

#[tokio::test]
async fn recover_marks_live_rows_interrupted() {
    let store = JobStore::open_in_memory().await.unwrap();
    let pending = Uuid::new_v4();
    let downloading = Uuid::new_v4();
    let done = Uuid::new_v4();
    store.create_job(pending, "a", 18).await.unwrap();
    store.create_job(downloading, "b", 18).await.unwrap();
    store.record_progress(downloading, 50).await.unwrap();
    store.create_job(done, "c", 18).await.unwrap();
    store
        .complete_with_history(done, &download("c", "C"))
        .await
        .unwrap();

    assert_eq!(store.recover_interrupted_jobs().await.unwrap(), 2);
    for id in [pending, downloading] {
        let job = store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some(INTERRUPTED_MESSAGE));
    }
    assert_eq!(
        store.get_job(done).await.unwrap().unwrap().status,
        JobStatus::Complete
    );
    assert_eq!(store.recover_interrupted_jobs().await.unwrap(), 0);
}

#[tokio::test]
async fn history_is_newest_first_and_bounded() {
    let store = JobStore::open_in_memory().await.unwrap();
    for n in 0..5 {
        let id = Uuid::new_v4();
        let video = format!("v{n}");
        store.create_job(id, &video, 18).await.unwrap();
        store
            .complete_with_history(id, &download(&video, &format!("title {n}")))
            .await
            .unwrap();
    }

    let all = store.list_downloads(10).await.unwrap();
    let videos: Vec<&str> = all.iter().map(|d| d.video_id.as_str()).collect();
    assert_eq!(videos, vec!["v4", "v3", "v2", "v1", "v0"]);

    let page = store.list_downloads(2).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].video_id, "v4");
}

#[tokio::test]
async fn clear_downloads_keeps_job_rows() {
    let store = JobStore::open_in_memory().await.unwrap();
    let id = Uuid::new_v4();
    store.create_job(id, "abc123", 18).await.unwrap();
    store
        .complete_with_history(id, &download("abc123", "T"))
        .await
        .unwrap();

    assert_eq!(store.clear_downloads().await.unwrap(), 1);
    assert!(store.list_downloads(10).await.unwrap().is_empty());
    assert!(store.get_download_by_job(id).await.unwrap().is_none());
    assert_eq!(
        store.get_job(id).await.unwrap().unwrap().status,
        JobStatus::Complete
    );
}

#[tokio::test]
async fn file_database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("vdm.db");
    let id = Uuid::new_v4();
    {
        let store = JobStore::open_at(&path).await.unwrap();
        store.create_job(id, "abc123", 22).await.unwrap();
        store.record_progress(id, 12).await.unwrap();
    }
    let store = JobStore::open_at(&path).await.unwrap();
    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.format_id, 22);
    assert_eq!(job.progress, 12);
    assert_eq!(store.list_jobs().await.unwrap().len(), 1);
}
