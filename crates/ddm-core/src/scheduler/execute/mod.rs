//! Execute the download phase of a single job: storage, segments, progress, finalize.

mod finish;
mod guard;
mod invoke;
mod progress_worker;
mod run_download;
mod setup;
mod single;

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::DdmConfig;
use crate::control::JobAborted;
use crate::host_policy::HostPolicy;
use crate::resume_db::{JobState, ResumeDb};
use crate::segmenter;

pub(super) use self::single::execute_single_download_phase;
use crate::scheduler::budget::GlobalConnectionBudget;
use crate::scheduler::progress::ProgressStats;

use self::invoke::run_download_blocking_async;
use self::setup::setup_storage_and_progress;

/// Runs the download phase: open/create storage, download incomplete segments,
/// persist progress, update metadata, and finalize if complete.
/// If `progress_tx` is `Some`, progress stats (bytes done, elapsed) are sent
/// when the bitmap is updated so the caller can show ETA/rate.
pub(super) async fn execute_download_phase(
    db: &ResumeDb,
    job_id: i64,
    job: &crate::resume_db::JobDetails,
    url: &str,
    headers: &HashMap<String, String>,
    needs_metadata: bool,
    temp_path: &Path,
    final_path: &Path,
    total_size_u: u64,
    segment_count_u: usize,
    segments: &[segmenter::Segment],
    bitmap: &mut segmenter::SegmentBitmap,
    cfg: &DdmConfig,
    host_policy: Option<&mut HostPolicy>,
    shared_policy: Option<Arc<tokio::sync::Mutex<HostPolicy>>>,
    progress_tx: Option<&tokio::sync::mpsc::Sender<ProgressStats>>,
    global_budget: Option<&GlobalConnectionBudget>,
    abort: Option<Arc<std::sync::atomic::AtomicBool>>,
) -> Result<()> {
    if needs_metadata {
        for i in 0..segment_count_u {
            let seg_path = crate::storage::segment_temp_path(job_id, i);
            if seg_path.exists() {
                tokio::fs::remove_file(&seg_path).await.with_context(|| {
                    format!(
                        "remove segment temp file for force-restart: {}",
                        seg_path.display()
                    )
                })?;
            }
        }
        tracing::debug!(job_id, "removed existing segment temp files for clean restart");
    }

    let (
        segment_storage,
        actual_concurrent,
        retry_policy,
        curl_opts,
        bytes_this_run,
        download_start,
        progress_handle,
        bitmap_tx,
        in_flight_bytes,
        _budget_guard,
    ): (_, _, _, _, _, Instant, tokio::task::JoinHandle<()>, _, _, _) = setup_storage_and_progress(
        total_size_u,
        segment_count_u,
        segments,
        bitmap,
        cfg,
        db,
        job_id,
        global_budget,
        progress_tx,
        job.settings.speed_limit,
    )?;

    let curl_opts = match abort {
        Some(a) => curl_opts.with_abort(a),
        None => curl_opts,
    };
    let download_result = run_download_blocking_async(
        url,
        headers,
        segments,
        &segment_storage,
        bitmap,
        actual_concurrent,
        &retry_policy,
        bitmap_tx,
        in_flight_bytes,
        curl_opts.clone(),
    )
    .await;

    let (bitmap_result, summary) = match download_result {
        Ok((bm, s)) => (bm, s),
        Err(e) => {
            if e.downcast_ref::<JobAborted>().is_some() {
                let _ = progress_handle.await;
                db.set_state(job_id, JobState::Paused).await?;
                tracing::info!("job {} paused by user", job_id);
                return Ok(());
            }
            return Err(e);
        }
    };

    *bitmap = bitmap_result;
    progress_handle.await.context("progress writer join")?;

    if summary.range_not_supported {
        tracing::warn!(
            job_id,
            "server stopped honoring Range mid-download; falling back to single-stream"
        );
        let _ = db.set_supports_range(job_id, false).await;
        drop(segment_storage);
        for i in 0..segment_count_u {
            let seg_path = crate::storage::segment_temp_path(job_id, i);
            if seg_path.exists() {
                tokio::fs::remove_file(&seg_path)
                    .await
                    .with_context(|| format!("remove segment temp file before single-stream fallback: {}", seg_path.display()))?;
            }
        }
        let meta = crate::resume_db::JobMetadata {
            final_filename: job.final_filename.clone(),
            temp_filename: job.temp_filename.clone(),
            save_path: job.save_path.clone(),
            total_size: job.total_size,
            etag: job.etag.clone(),
            last_modified: job.last_modified.clone(),
            segment_count: 0,
            completed_bitmap: Vec::new(),
        };
        db.update_metadata(job_id, &meta).await?;
        execute_single_download_phase(
            db,
            job_id,
            url,
            headers,
            temp_path,
            final_path,
            job.total_size.map(|n| n as u64),
            curl_opts,
            job.settings.checksum.as_deref(),
        )
        .await?;
        return Ok(());
    }

    let download_elapsed = download_start.elapsed();
    finish::finish_after_download(
        db,
        job_id,
        job,
        url,
        segment_count_u,
        bytes_this_run,
        download_elapsed,
        &summary,
        bitmap,
        &segment_storage,
        temp_path,
        final_path,
        host_policy,
        shared_policy.as_ref(),
    )
    .await?;

    Ok(())
}
