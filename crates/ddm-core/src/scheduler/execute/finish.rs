//! Post-download phase: record outcome, sync storage, update metadata, finalize.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use crate::downloader::{DownloadSummary, SegmentStorage};
use crate::resume_db::{JobMetadata, JobState, ResumeDb};
use crate::segmenter;
use crate::storage;
use crate::host_policy::HostPolicy;

/// After download completes (or is aborted with pause): record host policy outcome,
/// sync each segment's temp file, update DB metadata, and merge + finalize the
/// file + set state if all segments done.
#[allow(clippy::too_many_arguments)]
pub(super) async fn finish_after_download(
    db: &ResumeDb,
    job_id: i64,
    job: &crate::resume_db::JobDetails,
    url: &str,
    segment_count_u: usize,
    bytes_this_run: u64,
    download_elapsed: Duration,
    summary: &DownloadSummary,
    bitmap: &segmenter::SegmentBitmap,
    segment_storage: &[SegmentStorage],
    temp_path: &std::path::Path,
    final_path: &std::path::Path,
    host_policy: Option<&mut HostPolicy>,
    shared_policy: Option<&Arc<tokio::sync::Mutex<HostPolicy>>>,
) -> anyhow::Result<()> {
    if let Some(p) = host_policy {
        p.record_job_outcome(
            url,
            segment_count_u,
            bytes_this_run,
            download_elapsed,
            summary.throttle_events,
            summary.error_events,
        )
        .context("record job outcome for adaptive policy")?;
    } else if let Some(arc) = shared_policy {
        arc.lock()
            .await
            .record_job_outcome(
                url,
                segment_count_u,
                bytes_this_run,
                download_elapsed,
                summary.throttle_events,
                summary.error_events,
            )
            .context("record job outcome for adaptive policy")?;
    }

    for seg in segment_storage {
        seg.writer.sync()?;
    }

    let meta = JobMetadata {
        final_filename: job.final_filename.clone(),
        temp_filename: job.temp_filename.clone(),
        save_path: job.save_path.clone(),
        total_size: job.total_size,
        etag: job.etag.clone(),
        last_modified: job.last_modified.clone(),
        segment_count: job.segment_count,
        completed_bitmap: bitmap.to_bytes(segment_count_u),
    };
    db.update_metadata(job_id, &meta).await?;

    if bitmap.all_completed(segment_count_u) {
        db.set_state(job_id, JobState::Merging).await?;
        let merged = storage::merge_segments(job_id, segment_count_u, temp_path)
            .context("merge per-segment temp files")?;
        merged.finalize(final_path)?;
        db.set_state(job_id, JobState::Completed).await?;
        // Segment rows only exist while merge is in progress; once finalized
        // the bitmap (now all-set) is the only record worth keeping.
        let _ = db.clear_segments_for_download(job_id).await;
        let _ = db
            .append_log(job_id, "info", &format!("completed: {}", final_path.display()))
            .await;
        tracing::info!("job {} completed: {}", job_id, final_path.display());
        crate::checksum::verify_if_configured(
            db,
            job_id,
            job.settings.checksum.as_deref(),
            final_path,
        )
        .await;
    }

    Ok(())
}
