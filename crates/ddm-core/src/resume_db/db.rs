//! SQLite-backed job database implementation.

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};

use super::types::{JobDetails, JobId, JobMetadata, JobSettings, JobState, JobSummary};

/// Handle to the SQLite-backed job database.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/ddm/jobs.db` on Debian.
#[derive(Clone)]
pub struct ResumeDb {
    pub(crate) pool: Pool<Sqlite>,
}

impl ResumeDb {
    /// Open (or create) the default job database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("ddm")?;
        let state_dir = xdg_dirs.get_state_home();
        let db_path = state_dir.join("jobs.db");

        // Ensure parent directory exists.
        tokio::fs::create_dir_all(&state_dir).await?;

        let uri = format!("sqlite://{}", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;

        let db = ResumeDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open an in-memory database for tests. Each call gets its own store.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = ResumeDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        // Downloads table: the engine's primary record, bit-exact with the
        // persistence contract's named columns (Id through LastAttemptAt)
        // plus a handful of engine-internal columns the contract doesn't
        // enumerate (temp_filename, etag, last_modified, completed_bitmap,
        // settings_json, updated_at) that exist purely to drive resume and
        // are not part of the externally-visible record.
        //
        // `completed_bitmap` is the primary (fast) resume representation; the
        // `segments` table below additionally persists one row per segment for
        // external observability/inspection, kept in sync best-effort from the
        // progress loop rather than being the hot path itself.
        //
        // `Id` stays an `INTEGER AUTOINCREMENT` rather than a `TEXT` primary
        // key: see DESIGN.md for why that one column is kept as-is.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS downloads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                file_name TEXT,
                save_path TEXT,
                category TEXT,
                status INTEGER NOT NULL,
                total_size INTEGER,
                downloaded_size INTEGER NOT NULL DEFAULT 0,
                connections INTEGER NOT NULL DEFAULT 0,
                speed_limit INTEGER,
                checksum TEXT,
                checksum_verified INTEGER NOT NULL DEFAULT 0,
                description TEXT,
                media_type TEXT,
                manifest_url TEXT,
                selected_quality TEXT,
                error_message TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                supports_range INTEGER,
                created_at TEXT NOT NULL,
                completed_at TEXT,
                last_attempt_at TEXT,
                temp_filename TEXT,
                etag TEXT,
                last_modified TEXT,
                completed_bitmap BLOB NOT NULL DEFAULT x'',
                settings_json TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS segments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL REFERENCES downloads(id) ON DELETE CASCADE,
                idx INTEGER NOT NULL,
                start_byte INTEGER NOT NULL,
                end_byte INTEGER NOT NULL,
                downloaded_bytes INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                temp_file TEXT,
                UNIQUE(job_id, idx)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_segments_job_id ON segments(job_id);")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                extensions TEXT NOT NULL DEFAULT '',
                mime_types TEXT NOT NULL DEFAULT '',
                save_folder TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS download_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL REFERENCES downloads(id) ON DELETE CASCADE,
                ts INTEGER NOT NULL,
                level TEXT NOT NULL,
                message TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_download_logs_job_id ON download_logs(job_id);",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically claim the next queued job (smallest id) by setting its state to Running.
    /// Returns the claimed job id, or None if no job is queued. Used by the parallel scheduler
    /// so multiple workers never pick the same job. Stranded Running jobs are reset by
    /// `recover_running_jobs()` before scheduling.
    pub async fn claim_next_queued_job(&self) -> Result<Option<JobId>> {
        let now = now_iso8601();
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            r#"
            SELECT id FROM downloads
            WHERE status = ?1
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(JobState::Queued.as_i64())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };
        let id: i64 = row.get("id");
        sqlx::query(
            r#"
            UPDATE downloads
            SET status = ?1,
                last_attempt_at = ?2,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(JobState::Running.as_i64())
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(id))
    }

    /// Insert a new queued job with minimal information.
    ///
    /// Metadata such as size, ETag, and segment layout will be filled in
    /// later by the HEAD/segmenter logic.
    pub async fn add_job(&self, url: &str, settings: &JobSettings) -> Result<JobId> {
        let now = now_iso8601();
        let settings_json = serde_json::to_string(settings)?;

        let row_id = sqlx::query(
            r#"
            INSERT INTO downloads (
                url, file_name, temp_filename, save_path, category, total_size,
                etag, last_modified, connections, completed_bitmap,
                status, created_at, updated_at, settings_json, checksum,
                speed_limit, description, media_type, manifest_url, selected_quality
            ) VALUES (?1, NULL, NULL, ?2, ?3, NULL,
                      NULL, NULL, 0, x'',
                      ?4, ?5, ?5, ?6, ?7,
                      ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(url)
        .bind(&settings.download_dir)
        .bind(&settings.category)
        .bind(JobState::Queued.as_i64())
        .bind(&now)
        .bind(&settings_json)
        .bind(settings.checksum.as_deref())
        .bind(settings.speed_limit.map(|n| n as i64))
        .bind(&settings.description)
        .bind(&settings.media_type)
        .bind(&settings.manifest_url)
        .bind(&settings.selected_quality)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(row_id)
    }

    /// List final filenames already used by other jobs, for collision avoidance
    /// when deriving a save name. `exclude_job_id` omits that job's own row
    /// (so re-probing a job doesn't treat its own prior name as a collision).
    /// `_dir` is accepted for API symmetry with the save-path naming law but is
    /// not part of the filter: names are deduplicated globally across jobs
    /// rather than strictly per directory, which is a safe (if slightly
    /// conservative) simplification given most jobs share one download root.
    pub async fn list_final_filenames_in_dir(
        &self,
        _dir: Option<&str>,
        exclude_job_id: Option<JobId>,
    ) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT file_name FROM downloads
            WHERE file_name IS NOT NULL
              AND (?1 IS NULL OR id != ?1)
            "#,
        )
        .bind(exclude_job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.get::<Option<String>, _>("file_name"))
            .collect())
    }

    /// List all jobs in the database, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, url, status, file_name, total_size
            FROM downloads
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get("id");
            let url: String = row.get("url");
            let status: i64 = row.get("status");
            let final_filename: Option<String> = row.get("file_name");
            let total_size: Option<i64> = row.get("total_size");

            out.push(JobSummary {
                id,
                url,
                state: JobState::from_i64(status),
                final_filename,
                total_size,
            });
        }

        Ok(out)
    }

    /// Fetch a single job row with full metadata for the scheduler.
    pub async fn get_job(&self, id: JobId) -> Result<Option<JobDetails>> {
        let row = sqlx::query(
            r#"
            SELECT
                id, url, file_name, temp_filename, save_path, category, total_size,
                downloaded_size, connections, speed_limit,
                etag, last_modified, completed_bitmap,
                status, description, media_type, manifest_url, selected_quality,
                error_message, retry_count, supports_range,
                created_at, completed_at, last_attempt_at, settings_json
            FROM downloads
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: i64 = row.get("id");
        let url: String = row.get("url");
        let final_filename: Option<String> = row.get("file_name");
        let temp_filename: Option<String> = row.get("temp_filename");
        let save_path: Option<String> = row.get("save_path");
        let category: Option<String> = row.get("category");
        let total_size: Option<i64> = row.get("total_size");
        let downloaded_size: i64 = row.get("downloaded_size");
        let speed_limit: Option<i64> = row.get("speed_limit");
        let etag: Option<String> = row.get("etag");
        let last_modified: Option<String> = row.get("last_modified");
        let segment_count: i64 = row.get("connections");
        let completed_bitmap: Vec<u8> = row.get("completed_bitmap");
        let status: i64 = row.get("status");
        let description: Option<String> = row.get("description");
        let media_type: Option<String> = row.get("media_type");
        let manifest_url: Option<String> = row.get("manifest_url");
        let selected_quality: Option<String> = row.get("selected_quality");
        let error_message: Option<String> = row.get("error_message");
        let retry_count: i64 = row.get("retry_count");
        let supports_range: Option<i64> = row.get("supports_range");
        let created_at: String = row.get("created_at");
        let completed_at: Option<String> = row.get("completed_at");
        let last_attempt_at: Option<String> = row.get("last_attempt_at");
        let settings_json: Option<String> = row.get("settings_json");

        let settings = settings_json
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| serde_json::from_str::<JobSettings>(s))
            .transpose()?
            .unwrap_or_default();

        Ok(Some(JobDetails {
            id,
            url,
            final_filename,
            temp_filename,
            save_path,
            category,
            total_size,
            downloaded_size,
            speed_limit,
            etag,
            last_modified,
            segment_count,
            completed_bitmap,
            state: JobState::from_i64(status),
            description,
            media_type,
            manifest_url,
            selected_quality,
            error_message,
            retry_count,
            supports_range: supports_range.map(|n| n != 0),
            created_at,
            completed_at,
            last_attempt_at,
            settings,
        }))
    }

    /// Update metadata fields for an existing job after HEAD/segment planning.
    pub async fn update_metadata(&self, id: JobId, meta: &JobMetadata) -> Result<()> {
        let now = now_iso8601();
        sqlx::query(
            r#"
            UPDATE downloads
            SET file_name = ?1,
                temp_filename = ?2,
                save_path = ?3,
                total_size = ?4,
                etag = ?5,
                last_modified = ?6,
                connections = ?7,
                completed_bitmap = ?8,
                updated_at = ?9
            WHERE id = ?10
            "#,
        )
        .bind(&meta.final_filename)
        .bind(&meta.temp_filename)
        .bind(&meta.save_path)
        .bind(meta.total_size)
        .bind(&meta.etag)
        .bind(&meta.last_modified)
        .bind(meta.segment_count)
        .bind(&meta.completed_bitmap)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Update only the completed-segment bitmap and the running byte total
    /// (and `updated_at`). Used for durable progress: persist bitmap and
    /// `DownloadedSize` as segments complete so a crash doesn't lose progress.
    pub async fn update_bitmap(&self, id: JobId, bitmap: &[u8], downloaded_size: u64) -> Result<()> {
        let now = now_iso8601();
        sqlx::query(
            r#"
            UPDATE downloads
            SET completed_bitmap = ?1,
                downloaded_size = ?2,
                updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(bitmap)
        .bind(downloaded_size as i64)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persists whether the server honored Range requests for this job, so a
    /// mid-download fallback to single-stream is remembered across restarts
    /// (a later retry of the same job won't try segmented mode again).
    pub async fn set_supports_range(&self, id: JobId, supports_range: bool) -> Result<()> {
        sqlx::query(r#"UPDATE downloads SET supports_range = ?1 WHERE id = ?2"#)
            .bind(supports_range as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Demotes every `Running` job to `Paused` at process start: their worker
    /// tasks did not survive the restart, so they are not safe to silently
    /// re-enqueue. A user (or the queue scheduler, once resumed explicitly)
    /// must call `start`/`resume` again; progress is untouched.
    /// Returns the number of jobs demoted.
    pub async fn recover_running_jobs(&self) -> Result<u64> {
        let now = now_iso8601();
        let stranded: Vec<JobId> = sqlx::query(
            r#"SELECT id FROM downloads WHERE status = ?1"#,
        )
        .bind(JobState::Running.as_i64())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| r.get::<JobId, _>("id"))
        .collect();

        let r = sqlx::query(
            r#"
            UPDATE downloads
            SET status = ?1,
                updated_at = ?2
            WHERE status = ?3
            "#,
        )
        .bind(JobState::Paused.as_i64())
        .bind(&now)
        .bind(JobState::Running.as_i64())
        .execute(&self.pool)
        .await?;

        for id in &stranded {
            let _ = self
                .append_log(*id, "warn", "demoted to paused on restart (was running)")
                .await;
        }
        Ok(r.rows_affected())
    }

    /// Update the state of an existing job, mirroring the transition into
    /// `download_logs` so `status --logs` and a future UI can show history.
    /// Also stamps `LastAttemptAt` on a transition into `Running` and
    /// `CompletedAt` on a transition into `Completed`.
    pub async fn set_state(&self, id: JobId, state: JobState) -> Result<()> {
        let now = now_iso8601();
        match state {
            JobState::Running => {
                sqlx::query(
                    r#"
                    UPDATE downloads
                    SET status = ?1,
                        last_attempt_at = ?2,
                        updated_at = ?2
                    WHERE id = ?3
                    "#,
                )
                .bind(state.as_i64())
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
            JobState::Completed => {
                sqlx::query(
                    r#"
                    UPDATE downloads
                    SET status = ?1,
                        completed_at = ?2,
                        updated_at = ?2
                    WHERE id = ?3
                    "#,
                )
                .bind(state.as_i64())
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
            _ => {
                sqlx::query(
                    r#"
                    UPDATE downloads
                    SET status = ?1,
                        updated_at = ?2
                    WHERE id = ?3
                    "#,
                )
                .bind(state.as_i64())
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
        }

        let level = if matches!(state, JobState::Error) {
            "warn"
        } else {
            "info"
        };
        let _ = self
            .append_log(id, level, &format!("state -> {}", state.as_str()))
            .await;

        Ok(())
    }

    /// Records a job failure: sets state to `Error`, stores the human-readable
    /// cause in `ErrorMessage`, and bumps `RetryCount`. Distinct from
    /// `set_state` because the spec's `ErrorMessage`/`RetryCount` columns need
    /// a message, which plain state transitions don't carry.
    pub async fn set_error(&self, id: JobId, message: &str) -> Result<()> {
        let now = now_iso8601();
        sqlx::query(
            r#"
            UPDATE downloads
            SET status = ?1,
                error_message = ?2,
                retry_count = retry_count + 1,
                updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(JobState::Error.as_i64())
        .bind(message)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        let _ = self
            .append_log(id, "warn", &format!("state -> error: {}", message))
            .await;
        Ok(())
    }

    /// Records the outcome of verifying a completed job's file against its
    /// caller-supplied checksum (§3's "optional checksum the caller may
    /// attach"). Stored in the dedicated `checksum_verified` column, distinct
    /// from the job's `Complete` state: a mismatch is logged as a warning but
    /// never un-completes the download.
    pub async fn set_checksum_verified(&self, id: JobId, verified: bool) -> Result<()> {
        sqlx::query(r#"UPDATE downloads SET checksum_verified = ?1 WHERE id = ?2"#)
            .bind(verified as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Permanently remove a job row from the database.
    ///
    /// File cleanup is handled separately by higher layers.
    pub async fn remove_job(&self, id: JobId) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM downloads
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Current time as an ISO-8601 / RFC 3339 string (UTC, second precision),
/// matching the persistence contract's `CreatedAt`/`CompletedAt`/
/// `LastAttemptAt TEXT` columns.
fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
