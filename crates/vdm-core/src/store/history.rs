//! Download history: insert happens in `complete_with_history`; this is the
//! read/clear side.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::PathBuf;
use uuid::Uuid;

use super::db::{from_unix_millis, JobStore};
use super::types::DownloadRecord;
use crate::job::JobId;

fn download_from_row(row: &SqliteRow) -> Result<DownloadRecord> {
    let job_id: Option<String> = row.try_get("download_job_id")?;
    let download_job_id = job_id
        .map(|s| Uuid::parse_str(&s).with_context(|| format!("malformed job id {s:?}")))
        .transpose()?;
    let file_path: String = row.try_get("file_path")?;
    let created_at: i64 = row.try_get("created_at")?;

    Ok(DownloadRecord {
        id: row.try_get("id")?,
        video_id: row.try_get("video_id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        thumbnail: row.try_get("thumbnail")?,
        quality: row.try_get("quality")?,
        format: row.try_get("format")?,
        size: row.try_get("size")?,
        file_path: PathBuf::from(file_path),
        created_at: from_unix_millis(created_at),
        download_job_id,
    })
}

impl JobStore {
    /// Most recent downloads first, at most `limit` rows.
    pub async fn list_downloads(&self, limit: u32) -> Result<Vec<DownloadRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, video_id, title, author, thumbnail, quality, format, size,
                   file_path, created_at, download_job_id
            FROM downloads
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(download_from_row).collect()
    }

    /// History row written when the given job completed, if any.
    pub async fn get_download_by_job(&self, id: JobId) -> Result<Option<DownloadRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, video_id, title, author, thumbnail, quality, format, size,
                   file_path, created_at, download_job_id
            FROM downloads
            WHERE download_job_id = ?1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(download_from_row).transpose()
    }

    /// Delete every history row. Job rows are kept. Returns the number deleted.
    pub async fn clear_downloads(&self) -> Result<u64> {
        let r = sqlx::query("DELETE FROM downloads")
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }
}
