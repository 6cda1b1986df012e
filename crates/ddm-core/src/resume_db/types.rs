//! Types used by the resume/job database.

/// Job identifier.
pub type JobId = i64;

/// High-level job state, persisted as `Downloads.Status` (an integer, see
/// `as_i64`/`from_i64`).
///
/// Mirrors the spec's seven-state `Download.status`: `Running` here is
/// `Downloading` and `Completed` is `Complete` — kept as the teacher named
/// them since they're internal identifiers, not wire text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Paused,
    Merging,
    Completed,
    Error,
    Cancelled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Paused => "paused",
            JobState::Merging => "merging",
            JobState::Completed => "completed",
            JobState::Error => "error",
            JobState::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "queued" => JobState::Queued,
            "running" => JobState::Running,
            "paused" => JobState::Paused,
            "merging" => JobState::Merging,
            "completed" => JobState::Completed,
            "cancelled" => JobState::Cancelled,
            "error" => JobState::Error,
            _ => JobState::Error,
        }
    }

    /// Numeric encoding used for the `Status INTEGER` column. Stable across
    /// releases: never renumber an existing variant, only append.
    pub fn as_i64(self) -> i64 {
        match self {
            JobState::Queued => 0,
            JobState::Running => 1,
            JobState::Paused => 2,
            JobState::Merging => 3,
            JobState::Completed => 4,
            JobState::Error => 5,
            JobState::Cancelled => 6,
        }
    }

    pub fn from_i64(n: i64) -> Self {
        match n {
            0 => JobState::Queued,
            1 => JobState::Running,
            2 => JobState::Paused,
            3 => JobState::Merging,
            4 => JobState::Completed,
            6 => JobState::Cancelled,
            _ => JobState::Error,
        }
    }
}

/// Minimal per-job settings container, stored as JSON in the DB
/// (`Downloads.settings_json`, an engine-internal column alongside the
/// concrete fields that also get their own `Downloads` columns below).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct JobSettings {
    /// Reserved for future per-job tuning (e.g., segment bounds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Per-download byte/sec cap, combined with the global cap as
    /// `min(nonzero caps)` by the rate limiter. `None` means "use the
    /// global cap only". Mirrored into `Downloads.SpeedLimit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_limit: Option<u64>,
    /// Extra request headers (e.g. cookies, auth tokens) sent on every
    /// request for this job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<std::collections::HashMap<String, String>>,
    /// Overrides the scheduler's default download directory for this job.
    /// Mirrored into `Downloads.SavePath` once the effective directory is
    /// resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<String>,
    /// Caller-supplied SHA-256 hex digest to verify the finished file against
    /// (lowercase hex). Verification is best-effort and does not fail the
    /// job on mismatch; the outcome is mirrored into `Downloads.ChecksumVerified`
    /// and logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// User-facing grouping label, mirrored into `Downloads.Category`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Free-text note supplied by the caller, mirrored into `Downloads.Description`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Media pipeline hint (e.g. `"hls"`, `"dash"`), mirrored into
    /// `Downloads.MediaType`. Set by `add_media_download` callers; the media
    /// pipeline itself is not implemented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Manifest URL for a media download, mirrored into `Downloads.ManifestUrl`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,
    /// Selected quality/rendition for a media download, mirrored into
    /// `Downloads.SelectedQuality`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_quality: Option<String>,
}

/// Summary view used by the CLI `status` command.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub id: JobId,
    pub url: String,
    pub state: JobState,
    pub final_filename: Option<String>,
    pub total_size: Option<i64>,
}

/// Full job record used by the scheduler / downloader, sourced from the
/// `Downloads` table.
#[derive(Debug, Clone)]
pub struct JobDetails {
    pub id: JobId,
    pub url: String,
    pub final_filename: Option<String>,
    pub temp_filename: Option<String>,
    pub save_path: Option<String>,
    pub category: Option<String>,
    pub total_size: Option<i64>,
    pub downloaded_size: i64,
    pub speed_limit: Option<i64>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// Number of segments this job is split into. Persisted in
    /// `Downloads.Connections`; kept as `segment_count` here since that's
    /// the name used throughout the scheduler/downloader.
    pub segment_count: i64,
    pub completed_bitmap: Vec<u8>,
    pub state: JobState,
    pub description: Option<String>,
    pub media_type: Option<String>,
    pub manifest_url: Option<String>,
    pub selected_quality: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i64,
    pub supports_range: Option<bool>,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub last_attempt_at: Option<String>,
    pub settings: JobSettings,
}

/// Per-segment status, mirrored into the `segments` table for external
/// observability. The bitmap in `Downloads.completed_bitmap` remains the
/// authoritative, fast-path resume representation; these rows are a
/// best-effort mirror of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    Pending,
    Downloading,
    Completed,
    Error,
}

impl SegmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentStatus::Pending => "pending",
            SegmentStatus::Downloading => "downloading",
            SegmentStatus::Completed => "completed",
            SegmentStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "downloading" => SegmentStatus::Downloading,
            "completed" => SegmentStatus::Completed,
            "error" => SegmentStatus::Error,
            _ => SegmentStatus::Pending,
        }
    }
}

/// A single persisted segment row, as exposed for inspection/RPC use.
#[derive(Debug, Clone)]
pub struct SegmentRecord {
    pub idx: i64,
    pub start_byte: i64,
    pub end_byte: i64,
    pub downloaded_bytes: i64,
    pub status: SegmentStatus,
    pub temp_file: Option<String>,
}

/// A download category: groups downloads by file type with a default save folder.
#[derive(Debug, Clone)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub extensions: Vec<String>,
    pub mime_types: Vec<String>,
    pub save_folder: Option<String>,
}

/// One append-only log line for a download.
#[derive(Debug, Clone)]
pub struct DownloadLogEntry {
    pub id: i64,
    pub job_id: JobId,
    pub ts: i64,
    pub level: String,
    pub message: String,
}

/// Metadata fields updated after HEAD / segment planning.
#[derive(Debug, Clone)]
pub struct JobMetadata {
    pub final_filename: Option<String>,
    pub temp_filename: Option<String>,
    pub save_path: Option<String>,
    pub total_size: Option<i64>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub segment_count: i64,
    pub completed_bitmap: Vec<u8>,
}
