//! `DownloadLogs(Id autoincrement, DownloadId FK cascade, Timestamp, Level, Message)` —
//! append-only log of per-download events, for post-mortem inspection.

use anyhow::Result;
use sqlx::Row;
use std::time::{SystemTime, UNIX_EPOCH};

use super::db::ResumeDb;
use super::types::{DownloadLogEntry, JobId};

fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

impl ResumeDb {
    /// Appends one log line for a download.
    pub async fn append_log(&self, job_id: JobId, level: &str, message: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO download_logs (job_id, ts, level, message)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(job_id)
        .bind(unix_timestamp())
        .bind(level)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reads the last `limit` log lines for a download, oldest first.
    pub async fn read_last_logs(&self, job_id: JobId, limit: u32) -> Result<Vec<DownloadLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, job_id, ts, level, message FROM download_logs
            WHERE job_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(job_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut out: Vec<DownloadLogEntry> = rows
            .into_iter()
            .map(|row| DownloadLogEntry {
                id: row.get("id"),
                job_id: row.get("job_id"),
                ts: row.get("ts"),
                level: row.get("level"),
                message: row.get("message"),
            })
            .collect();
        out.reverse();
        Ok(out)
    }
}
