//! Queue Scheduler: gates the concurrency-capped job loop behind a
//! time-window / weekday admission schedule.
//!
//! Generalizes `scheduler::parallel::run_jobs_parallel` (which already
//! enforces `maxConcurrent` and claims queued jobs oldest-id-first) with a
//! periodic ticker that only lets it run while "now" falls inside the
//! configured window.

use anyhow::Result;
use chrono::{NaiveTime, Timelike, Weekday};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DdmConfig, QueueScheduleConfig};
use crate::host_policy::HostPolicy;
use crate::resume_db::ResumeDb;

use super::budget::GlobalConnectionBudget;
use super::parallel::run_jobs_parallel;
use super::progress::ProgressStats;

/// How often the scheduler re-evaluates the admission window.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Chrono's `Weekday::num_days_from_sunday()` already matches the spec's
/// `0 = Sunday .. 6 = Saturday` convention used by `QueueScheduleConfig::days`.
fn weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// Pure predicate: does the schedule admit new downloads at `now` on `weekday`?
///
/// - Disabled schedules always admit.
/// - A non-empty `days` list restricts to those weekdays.
/// - `start`/`stop` define a `[start, stop)` window; if only one bound is set
///   the window is open-ended on the other side; if both are unset the
///   schedule is day-restricted only (or fully unrestricted).
/// - If `start > stop` the window wraps past midnight (e.g. 22:00-06:00 spans
///   the night), so `now >= start || now < stop` admits.
pub fn schedule_window_allows(cfg: &QueueScheduleConfig, now: NaiveTime, weekday: Weekday) -> bool {
    if !cfg.enabled {
        return true;
    }
    if !cfg.days.is_empty() && !cfg.days.contains(&weekday_index(weekday)) {
        return false;
    }

    match (parse_hhmm(cfg.start.as_deref()), parse_hhmm(cfg.stop.as_deref())) {
        (None, None) => true,
        (Some(start), None) => now >= start,
        (None, Some(stop)) => now < stop,
        (Some(start), Some(stop)) => {
            if start <= stop {
                now >= start && now < stop
            } else {
                now >= start || now < stop
            }
        }
    }
}

/// Same as [`schedule_window_allows`] but evaluated against the local wall
/// clock, for production use.
pub fn schedule_window_allows_now(cfg: &QueueScheduleConfig) -> bool {
    let now = chrono::Local::now();
    schedule_window_allows(cfg, now.time(), now.weekday())
}

fn parse_hhmm(s: Option<&str>) -> Option<NaiveTime> {
    let s = s?;
    let (h, m) = s.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}

/// Runs the periodic admission ticker forever: every [`TICK_INTERVAL`],
/// checks whether the schedule window currently admits new work, and if so
/// runs one full pass of [`run_jobs_parallel`] (which itself enforces
/// `max_concurrent` and drains whatever is queued before returning). Outside
/// the window, ticks are no-ops: jobs already `Running` are left to finish,
/// but no new ones are claimed.
///
/// Tick failures (a single `run_jobs_parallel` pass returning `Err`) are
/// logged and swallowed so one bad job doesn't kill the scheduler loop;
/// individual job failures are already recorded against the job itself by
/// `run_one_job_shared`.
#[allow(clippy::too_many_arguments)]
pub async fn run_queue_scheduler(
    db: &ResumeDb,
    cfg: &DdmConfig,
    download_dir: PathBuf,
    host_policy: &mut HostPolicy,
    progress_tx: Option<tokio::sync::mpsc::Sender<ProgressStats>>,
    global_budget: Arc<GlobalConnectionBudget>,
    max_concurrent: usize,
    job_control: Option<Arc<crate::control::JobControl>>,
) -> Result<()> {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    loop {
        ticker.tick().await;
        if !schedule_window_allows_now(&cfg.queue_schedule) {
            continue;
        }
        let res = run_jobs_parallel(
            db,
            cfg,
            download_dir.clone(),
            host_policy,
            false,
            false,
            progress_tx.clone(),
            Arc::clone(&global_budget),
            max_concurrent,
            job_control.clone(),
        )
        .await;
        if let Err(e) = res {
            tracing::warn!("queue scheduler tick failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn disabled_schedule_always_admits() {
        let cfg = QueueScheduleConfig::default();
        assert!(schedule_window_allows(&cfg, time(3, 0), Weekday::Mon));
    }

    #[test]
    fn unrestricted_window_admits_any_time() {
        let cfg = QueueScheduleConfig {
            enabled: true,
            start: None,
            stop: None,
            days: vec![],
        };
        assert!(schedule_window_allows(&cfg, time(3, 0), Weekday::Mon));
        assert!(schedule_window_allows(&cfg, time(23, 59), Weekday::Sun));
    }

    #[test]
    fn simple_daytime_window() {
        let cfg = QueueScheduleConfig {
            enabled: true,
            start: Some("09:00".into()),
            stop: Some("17:00".into()),
            days: vec![],
        };
        assert!(schedule_window_allows(&cfg, time(12, 0), Weekday::Wed));
        assert!(!schedule_window_allows(&cfg, time(8, 59), Weekday::Wed));
        assert!(!schedule_window_allows(&cfg, time(17, 0), Weekday::Wed));
    }

    #[test]
    fn midnight_wrapping_window() {
        let cfg = QueueScheduleConfig {
            enabled: true,
            start: Some("22:00".into()),
            stop: Some("06:00".into()),
            days: vec![],
        };
        assert!(schedule_window_allows(&cfg, time(23, 0), Weekday::Fri));
        assert!(schedule_window_allows(&cfg, time(2, 0), Weekday::Sat));
        assert!(!schedule_window_allows(&cfg, time(12, 0), Weekday::Fri));
    }

    #[test]
    fn open_ended_start_only() {
        let cfg = QueueScheduleConfig {
            enabled: true,
            start: Some("20:00".into()),
            stop: None,
            days: vec![],
        };
        assert!(schedule_window_allows(&cfg, time(23, 0), Weekday::Mon));
        assert!(!schedule_window_allows(&cfg, time(10, 0), Weekday::Mon));
    }

    #[test]
    fn weekday_restriction() {
        let cfg = QueueScheduleConfig {
            enabled: true,
            start: None,
            stop: None,
            days: vec![1, 2, 3, 4, 5], // Mon-Fri (0=Sun)
        };
        assert!(schedule_window_allows(&cfg, time(12, 0), Weekday::Wed));
        assert!(!schedule_window_allows(&cfg, time(12, 0), Weekday::Sun));
    }

    #[test]
    fn weekday_index_matches_sunday_zero_convention() {
        assert_eq!(weekday_index(Weekday::Sun), 0);
        assert_eq!(weekday_index(Weekday::Mon), 1);
        assert_eq!(weekday_index(Weekday::Sat), 6);
    }
}
