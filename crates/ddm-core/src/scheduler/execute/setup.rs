//! Setup for execute_download_phase: open storage, reserve budget, start progress loop.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;

use crate::config::DdmConfig;
use crate::downloader::SegmentStorage;
use crate::resume_db::ResumeDb;
use crate::retry::RetryPolicy;
use crate::segmenter;
use crate::storage;

use super::guard::BudgetGuard;
use super::progress_worker::run_progress_persistence_loop;
use crate::scheduler::budget::GlobalConnectionBudget;
use crate::scheduler::progress::ProgressStats;

/// Opens or creates each segment's own temp file (reconciling `resume_from` from
/// on-disk size for one already present), reserves connection budget, builds
/// retry policy and curl opts, starts progress persistence loop. Returns all
/// handles and values needed to run the download and then finish.
pub(super) fn setup_storage_and_progress<'a>(
    total_size_u: u64,
    segment_count_u: usize,
    segments: &[segmenter::Segment],
    bitmap: &segmenter::SegmentBitmap,
    cfg: &DdmConfig,
    db: &ResumeDb,
    job_id: i64,
    global_budget: Option<&'a GlobalConnectionBudget>,
    progress_tx: Option<&tokio::sync::mpsc::Sender<ProgressStats>>,
    job_speed_limit: Option<u64>,
) -> Result<(
    Vec<SegmentStorage>,
    usize,
    RetryPolicy,
    crate::downloader::CurlOptions,
    u64,
    Instant,
    tokio::task::JoinHandle<()>,
    tokio::sync::mpsc::Sender<Vec<u8>>,
    Arc<Vec<std::sync::atomic::AtomicU64>>,
    Option<BudgetGuard<'a>>,
)> {
    std::fs::create_dir_all(storage::segment_temp_dir())
        .context("create segment temp directory")?;
    let segment_storage: Vec<SegmentStorage> = segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            let seg_path = storage::segment_temp_path(job_id, i);
            if seg_path.exists() {
                let writer = storage::StorageWriter::open_existing(&seg_path)
                    .with_context(|| format!("open existing segment temp file: {}", seg_path.display()))?;
                let resume_from = writer.current_len()?.min(seg.len());
                Ok(SegmentStorage { writer, resume_from })
            } else {
                let builder = storage::StorageWriterBuilder::create(&seg_path)
                    .with_context(|| format!("create segment temp file: {}", seg_path.display()))?;
                Ok(SegmentStorage {
                    writer: builder.build(),
                    resume_from: 0,
                })
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let max_concurrent = (cfg.max_connections_per_host)
        .min(cfg.max_total_connections)
        .min(segment_count_u);
    let actual_concurrent = match global_budget {
        Some(b) => b.reserve(max_concurrent),
        None => max_concurrent,
    };
    let budget_guard = global_budget.map(|b| BudgetGuard {
        budget: b,
        reserved: actual_concurrent,
    });
    let retry_policy = cfg
        .retry
        .as_ref()
        .map(|r| RetryPolicy {
            max_attempts: r.max_attempts,
            base_delay: std::time::Duration::from_secs_f64(r.base_delay_secs),
            multiplier: r.backoff_multiplier,
            max_delay: std::time::Duration::from_secs(r.max_delay_secs),
        })
        .unwrap_or_else(RetryPolicy::default);

    crate::rate_limiter::global().set_global_cap(cfg.max_bytes_per_sec.unwrap_or(0));
    let curl_opts = crate::downloader::CurlOptions::per_handle(
        cfg.max_bytes_per_sec,
        actual_concurrent,
        cfg.segment_buffer_bytes,
    )
    .with_limiter(crate::rate_limiter::global(), job_speed_limit);
    let bytes_this_run: u64 = segments
        .iter()
        .enumerate()
        .filter(|(i, _)| !bitmap.is_completed(*i))
        .map(|(_, s)| s.end - s.start)
        .sum();
    let download_start = Instant::now();

    let in_flight_bytes: Arc<Vec<std::sync::atomic::AtomicU64>> = Arc::new(
        segment_storage
            .iter()
            .map(|s| std::sync::atomic::AtomicU64::new(s.resume_from))
            .collect(),
    );
    let (bitmap_tx, progress_rx) = tokio::sync::mpsc::channel::<Vec<u8>>(8);
    let progress_handle = tokio::spawn(run_progress_persistence_loop(
        progress_rx,
        db.clone(),
        job_id,
        segment_count_u,
        segments.to_vec(),
        total_size_u,
        progress_tx.cloned(),
        Arc::clone(&in_flight_bytes),
        download_start,
    ));

    Ok((
        segment_storage,
        actual_concurrent,
        retry_policy,
        curl_opts,
        bytes_this_run,
        download_start,
        progress_handle,
        bitmap_tx,
        in_flight_bytes,
        budget_guard,
    ))
}
