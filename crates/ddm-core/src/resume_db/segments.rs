//! `Segments(Id PK, DownloadId FK cascade, Idx INT, StartByte INT, EndByte INT,
//! DownloadedBytes INT, Status INT, TempFile TEXT NULL)`.
//!
//! The bitmap in `Downloads.completed_bitmap` remains the fast resume path; these
//! rows are a best-effort external mirror, upserted as segments progress, so
//! `get_status`/inspection tooling can see per-segment detail without
//! re-deriving it from the bitmap and the planned ranges.

use anyhow::Result;
use sqlx::Row;

use super::db::ResumeDb;
use super::types::{JobId, SegmentRecord, SegmentStatus};

impl ResumeDb {
    /// Inserts or updates one segment's progress.
    pub async fn upsert_segment(
        &self,
        job_id: JobId,
        idx: i64,
        start_byte: i64,
        end_byte: i64,
        downloaded_bytes: i64,
        status: SegmentStatus,
        temp_file: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO segments (job_id, idx, start_byte, end_byte, downloaded_bytes, status, temp_file)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(job_id, idx) DO UPDATE SET
                start_byte = excluded.start_byte,
                end_byte = excluded.end_byte,
                downloaded_bytes = excluded.downloaded_bytes,
                status = excluded.status,
                temp_file = excluded.temp_file
            "#,
        )
        .bind(job_id)
        .bind(idx)
        .bind(start_byte)
        .bind(end_byte)
        .bind(downloaded_bytes)
        .bind(status.as_str())
        .bind(temp_file)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Lists all segments for a download, ordered by index.
    pub async fn list_segments_for_download(&self, job_id: JobId) -> Result<Vec<SegmentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT idx, start_byte, end_byte, downloaded_bytes, status, temp_file
            FROM segments
            WHERE job_id = ?1
            ORDER BY idx ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SegmentRecord {
                idx: row.get("idx"),
                start_byte: row.get("start_byte"),
                end_byte: row.get("end_byte"),
                downloaded_bytes: row.get("downloaded_bytes"),
                status: SegmentStatus::from_str(&row.get::<String, _>("status")),
                temp_file: row.get("temp_file"),
            })
            .collect())
    }

    /// Removes all segment rows for a download (called once merge/finalize succeeds,
    /// mirroring the spec's "segments exist only until merge succeeds" lifecycle).
    pub async fn clear_segments_for_download(&self, job_id: JobId) -> Result<()> {
        sqlx::query("DELETE FROM segments WHERE job_id = ?1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume_db::JobSettings;

    #[tokio::test]
    async fn upsert_then_list_ordered_by_index() {
        let db = ResumeDb::open_memory().await.unwrap();
        let job_id = db
            .add_job("https://example.com/a", &JobSettings::default())
            .await
            .unwrap();
        db.upsert_segment(job_id, 1, 100, 199, 50, SegmentStatus::Downloading, None)
            .await
            .unwrap();
        db.upsert_segment(job_id, 0, 0, 99, 99, SegmentStatus::Completed, None)
            .await
            .unwrap();

        let segs = db.list_segments_for_download(job_id).await.unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].idx, 0);
        assert_eq!(segs[0].status, SegmentStatus::Completed);
        assert_eq!(segs[1].idx, 1);
        assert_eq!(segs[1].downloaded_bytes, 50);
    }

    #[tokio::test]
    async fn upsert_overwrites_same_index() {
        let db = ResumeDb::open_memory().await.unwrap();
        let job_id = db
            .add_job("https://example.com/a", &JobSettings::default())
            .await
            .unwrap();
        db.upsert_segment(job_id, 0, 0, 99, 10, SegmentStatus::Downloading, None)
            .await
            .unwrap();
        db.upsert_segment(job_id, 0, 0, 99, 100, SegmentStatus::Completed, None)
            .await
            .unwrap();

        let segs = db.list_segments_for_download(job_id).await.unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].downloaded_bytes, 100);
        assert_eq!(segs[0].status, SegmentStatus::Completed);
    }

    #[tokio::test]
    async fn clear_segments_removes_all_rows() {
        let db = ResumeDb::open_memory().await.unwrap();
        let job_id = db
            .add_job("https://example.com/a", &JobSettings::default())
            .await
            .unwrap();
        db.upsert_segment(job_id, 0, 0, 99, 100, SegmentStatus::Completed, None)
            .await
            .unwrap();
        db.clear_segments_for_download(job_id).await.unwrap();
        assert!(db.list_segments_for_download(job_id).await.unwrap().is_empty());
    }
}
