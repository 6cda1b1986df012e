use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Retry/backoff tuning, overlaid onto `retry::RetryPolicy` defaults when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub backoff_multiplier: f64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_secs: 2.0,
            backoff_multiplier: 2.0,
            max_delay_secs: 300,
        }
    }
}

/// Queue scheduling window: only start new downloads within [start, stop) on the
/// given weekdays (0 = Sunday .. 6 = Saturday). `None`/empty fields mean "unrestricted".
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueueScheduleConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "HH:MM" 24-hour local time.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start: Option<String>,
    /// "HH:MM" 24-hour local time.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stop: Option<String>,
    /// Weekdays the schedule applies to, 0 = Sunday .. 6 = Saturday. Empty = every day.
    #[serde(default)]
    pub days: Vec<u8>,
}

/// Global configuration loaded from `~/.config/ddm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdmConfig {
    /// Maximum total concurrent HTTP connections across all jobs.
    pub max_total_connections: usize,
    /// Maximum concurrent HTTP connections per host.
    pub max_connections_per_host: usize,
    /// Minimum number of segments per job.
    pub min_segments: usize,
    /// Maximum number of segments per job.
    pub max_segments: usize,
    /// Retry/backoff tuning. `None` falls back to `retry::RetryPolicy::default()`.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Global leaky-bucket cap in bytes/sec across all downloads. `None` = unlimited.
    #[serde(default)]
    pub max_bytes_per_sec: Option<u64>,
    /// Per-handle curl receive buffer size in bytes. `None` uses curl's default.
    #[serde(default)]
    pub segment_buffer_bytes: Option<usize>,
    /// Queue scheduling window (time-of-day / weekday admission).
    #[serde(default)]
    pub queue_schedule: QueueScheduleConfig,
}

impl Default for DdmConfig {
    fn default() -> Self {
        Self {
            max_total_connections: 64,
            max_connections_per_host: 16,
            min_segments: 4,
            max_segments: 16,
            retry: Some(RetryConfig::default()),
            max_bytes_per_sec: None,
            segment_buffer_bytes: None,
            queue_schedule: QueueScheduleConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ddm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// Overlays recognized keys from the `Settings` table onto a loaded config.
///
/// The TOML file (`~/.config/ddm/config.toml`) remains the primary tunable
/// surface; this lets the `Settings` table (reachable via RPC/CLI without
/// touching the file) override a subset of fields at startup, per the
/// documented key set: `GlobalSpeedLimit` (kB/s, 0 = unlimited), `MaxRetries`,
/// `DefaultConnections`, and the four `QueueSchedule*` keys. Keys with no
/// corresponding engine-wide field (`DefaultSavePath`, `ConnectionTimeout`,
/// `MaxConcurrentDownloads`, `AutoShowDownloadWindow`) are CLI/session
/// concerns and are intentionally not applied here.
pub async fn apply_settings_overrides(
    cfg: &mut DdmConfig,
    db: &crate::resume_db::ResumeDb,
) -> Result<()> {
    if let Some(v) = db.get_setting("GlobalSpeedLimit").await? {
        if let Ok(kbps) = v.parse::<u64>() {
            cfg.max_bytes_per_sec = if kbps == 0 { None } else { Some(kbps * 1024) };
        }
    }
    if let Some(v) = db.get_setting("MaxRetries").await? {
        if let Ok(n) = v.parse::<u32>() {
            cfg.retry.get_or_insert_with(RetryConfig::default).max_attempts = n;
        }
    }
    if let Some(v) = db.get_setting("DefaultConnections").await? {
        if let Ok(n) = v.parse::<usize>() {
            cfg.max_connections_per_host = n;
        }
    }
    if let Some(v) = db.get_setting("QueueScheduleEnabled").await? {
        cfg.queue_schedule.enabled = !(v.eq_ignore_ascii_case("0") || v.eq_ignore_ascii_case("false"));
    }
    if let Some(v) = db.get_setting("QueueScheduleStart").await? {
        cfg.queue_schedule.start = Some(v);
    }
    if let Some(v) = db.get_setting("QueueScheduleStop").await? {
        cfg.queue_schedule.stop = Some(v);
    }
    if let Some(v) = db.get_setting("QueueScheduleDays").await? {
        cfg.queue_schedule.days = v
            .split(',')
            .filter_map(|abbrev| day_abbrev_to_index(abbrev.trim()))
            .collect();
    }
    Ok(())
}

/// Maps a day abbreviation (`Mon`..`Sun`) to the spec's `0 = Sunday .. 6 = Saturday` index.
fn day_abbrev_to_index(abbrev: &str) -> Option<u8> {
    match abbrev.to_ascii_lowercase().as_str() {
        "sun" => Some(0),
        "mon" => Some(1),
        "tue" => Some(2),
        "wed" => Some(3),
        "thu" => Some(4),
        "fri" => Some(5),
        "sat" => Some(6),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = DdmConfig::default();
        assert_eq!(cfg.max_total_connections, 64);
        assert_eq!(cfg.max_connections_per_host, 16);
        assert_eq!(cfg.min_segments, 4);
        assert_eq!(cfg.max_segments, 16);
        assert_eq!(cfg.retry.unwrap().max_attempts, 10);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = DdmConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: DdmConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.max_total_connections, cfg.max_total_connections);
        assert_eq!(parsed.max_connections_per_host, cfg.max_connections_per_host);
        assert_eq!(parsed.min_segments, cfg.min_segments);
        assert_eq!(parsed.max_segments, cfg.max_segments);
    }

    #[test]
    fn config_toml_minimal_fills_defaults_for_new_fields() {
        let toml = r#"
            max_total_connections = 8
            max_connections_per_host = 4
            min_segments = 2
            max_segments = 32
        "#;
        let cfg: DdmConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_total_connections, 8);
        assert!(cfg.retry.is_none());
        assert!(cfg.max_bytes_per_sec.is_none());
    }

    #[test]
    fn day_abbrev_parses_sunday_zero_convention() {
        assert_eq!(day_abbrev_to_index("Sun"), Some(0));
        assert_eq!(day_abbrev_to_index("sat"), Some(6));
        assert_eq!(day_abbrev_to_index("nope"), None);
    }

    #[tokio::test]
    async fn settings_overrides_apply_recognized_keys() {
        let db = crate::resume_db::ResumeDb::open_memory().await.unwrap();
        db.set_setting("GlobalSpeedLimit", "500").await.unwrap();
        db.set_setting("MaxRetries", "3").await.unwrap();
        db.set_setting("QueueScheduleEnabled", "true").await.unwrap();
        db.set_setting("QueueScheduleStart", "22:00").await.unwrap();
        db.set_setting("QueueScheduleDays", "Mon,Wed,Fri")
            .await
            .unwrap();

        let mut cfg = DdmConfig::default();
        apply_settings_overrides(&mut cfg, &db).await.unwrap();

        assert_eq!(cfg.max_bytes_per_sec, Some(500 * 1024));
        assert_eq!(cfg.retry.unwrap().max_attempts, 3);
        assert!(cfg.queue_schedule.enabled);
        assert_eq!(cfg.queue_schedule.start.as_deref(), Some("22:00"));
        assert_eq!(cfg.queue_schedule.days, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn settings_overrides_zero_speed_limit_means_unlimited() {
        let db = crate::resume_db::ResumeDb::open_memory().await.unwrap();
        db.set_setting("GlobalSpeedLimit", "0").await.unwrap();
        let mut cfg = DdmConfig::default();
        cfg.max_bytes_per_sec = Some(999);
        apply_settings_overrides(&mut cfg, &db).await.unwrap();
        assert!(cfg.max_bytes_per_sec.is_none());
    }
}
