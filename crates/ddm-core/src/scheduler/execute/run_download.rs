//! Run the actual segment download in a blocking task.

use std::sync::Arc;

use crate::downloader::{self, CurlOptions, DownloadSummary, SegmentStorage};
use crate::retry::RetryPolicy;
use crate::segmenter;

/// Runs segment download on a blocking thread. Returns updated bitmap and summary.
#[allow(clippy::too_many_arguments)]
pub(super) fn run_download_blocking(
    url: &str,
    headers: &std::collections::HashMap<String, String>,
    segments: &[segmenter::Segment],
    segment_storage: &[SegmentStorage],
    bitmap: &mut segmenter::SegmentBitmap,
    max_concurrent: usize,
    policy: &RetryPolicy,
    summary: &mut DownloadSummary,
    bitmap_tx: Option<&tokio::sync::mpsc::Sender<Vec<u8>>>,
    in_flight: Option<Arc<Vec<std::sync::atomic::AtomicU64>>>,
    curl: CurlOptions,
) -> anyhow::Result<()> {
    let max_concurrent = max_concurrent.max(1);
    downloader::download_segments(
        url,
        headers,
        segments,
        segment_storage,
        bitmap,
        Some(max_concurrent),
        Some(policy),
        summary,
        bitmap_tx,
        in_flight,
        curl,
    )
}
