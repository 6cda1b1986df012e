//! Core segmented downloader engine.
//!
//! Consumes direct URL + headers, runs N concurrent HTTP Range GETs (bounded by
//! `max_concurrent` when set), writes each segment to storage at the correct
//! offset and updates the completion bitmap. Supports retry with backoff via
//! optional `RetryPolicy`, and paces every write through a shared `RateLimiter`.

mod run;
mod segment;
mod single;

use anyhow::Result;
use crate::rate_limiter::RateLimiter;
use crate::retry::{RetryPolicy, SegmentError};
use crate::segmenter::{Segment, SegmentBitmap};
use crate::storage::StorageWriter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

pub use single::download_single;

/// Result of a single segment download (used for retry classification).
pub type SegmentResult = Result<(), SegmentError>;

/// Whether a caller-supplied header should be forwarded to curl as-is.
/// `Referer`/`Origin` are dropped silently unless the value parses as an
/// absolute URI; every other header passes through untouched.
pub(crate) fn header_allowed(key: &str, value: &str) -> bool {
    if key.eq_ignore_ascii_case("referer") || key.eq_ignore_ascii_case("origin") {
        return url::Url::parse(value).is_ok();
    }
    true
}

/// Per-transfer curl tuning plus the rate-limiting hooks every worker goes
/// through. Cheap to clone (everything is a scalar or an `Arc`).
#[derive(Clone, Default)]
pub struct CurlOptions {
    /// Per-handle receive speed cap in bytes/sec, already divided across the
    /// handles sharing one job (a coarse, curl-native backstop; the
    /// `RateLimiter` below is what actually paces byte flow per §9).
    pub max_recv_speed: Option<u64>,
    /// Curl receive buffer size in bytes. `None` uses curl's default (~16 KiB).
    pub buffer_size: Option<usize>,
    /// Shared leaky-bucket limiter every chunk is paced through before it's
    /// written to disk. `None` disables limiting (tests, or an explicit
    /// opt-out) without needing a zero-cap limiter instance.
    pub limiter: Option<Arc<RateLimiter>>,
    /// This download's own byte/sec cap, combined with the limiter's global
    /// cap as `min(nonzero caps)`.
    pub per_download_cap: Option<u64>,
    /// Set to request cancellation; checked once per chunk so a long transfer
    /// can still be paused promptly instead of only between segments.
    pub abort: Option<Arc<AtomicBool>>,
}

impl CurlOptions {
    /// Splits `global_cap` evenly across `connections` handles (so N segments
    /// sharing one job's cap don't each individually burst to the full cap).
    /// `buffer_size` is curl's own receive-buffer hint, independent of the cap.
    pub fn per_handle(
        global_cap: Option<u64>,
        connections: usize,
        buffer_size: Option<usize>,
    ) -> Self {
        let max_recv_speed = global_cap.map(|c| (c / connections.max(1) as u64).max(1));
        Self {
            max_recv_speed,
            buffer_size,
            limiter: None,
            per_download_cap: None,
            abort: None,
        }
    }

    /// Attaches the shared rate limiter and this download's own cap.
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>, per_download_cap: Option<u64>) -> Self {
        self.limiter = Some(limiter);
        self.per_download_cap = per_download_cap;
        self
    }

    /// Attaches a cancellation flag checked once per received chunk.
    pub fn with_abort(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = Some(abort);
        self
    }
}

/// Summary of a download run for adaptive policy: throttle and error counts.
#[derive(Debug, Clone, Default)]
pub struct DownloadSummary {
    pub throttle_events: u32,
    pub error_events: u32,
    /// Set when any segment reported the server doesn't honor byte ranges
    /// (200 to a ranged GET, or mid-flight 416). The coordinator must clear
    /// segments and fall back to single-stream mode; this is not a failure.
    pub range_not_supported: bool,
}

/// A segment's own temp-file writer plus how many bytes of it are already on
/// disk. `resume_from` drives both the `Range` start offset and the local
/// write offset, so a segment that was interrupted mid-transfer resumes from
/// its own on-disk size instead of re-fetching bytes it already has.
#[derive(Clone)]
pub struct SegmentStorage {
    pub writer: StorageWriter,
    pub resume_from: u64,
}

/// Downloads all segments that are not yet completed. `segment_storage` must
/// have one entry per entry in `segments` (same index), each pointing at that
/// segment's own temp file. Writes land in that per-segment file at an offset
/// relative to the segment, not the whole resource; `bitmap` is updated as
/// segments complete. When `max_concurrent` is `Some(n)`, at most `n` segment
/// downloads run at once. When `None`, one thread per incomplete segment
/// (unbounded). Fills `summary_out` with throttle/error counts. If
/// `progress_tx` is `Some`, the current bitmap is sent after each completed
/// segment (coalesced every N completions) so the caller can persist progress.
#[allow(clippy::too_many_arguments)]
pub fn download_segments(
    url: &str,
    custom_headers: &HashMap<String, String>,
    segments: &[Segment],
    segment_storage: &[SegmentStorage],
    bitmap: &mut SegmentBitmap,
    max_concurrent: Option<usize>,
    retry_policy: Option<&RetryPolicy>,
    summary_out: &mut DownloadSummary,
    progress_tx: Option<&tokio::sync::mpsc::Sender<Vec<u8>>>,
    in_flight_bytes: Option<Arc<Vec<AtomicU64>>>,
    curl: CurlOptions,
) -> Result<()> {
    assert_eq!(
        segments.len(),
        segment_storage.len(),
        "segment_storage must have one entry per segment"
    );
    let incomplete: Vec<(usize, Segment, SegmentStorage)> = segments
        .iter()
        .enumerate()
        .filter(|(i, _)| !bitmap.is_completed(*i))
        .map(|(i, s)| (i, *s, segment_storage[i].clone()))
        .collect();

    if incomplete.is_empty() {
        return Ok(());
    }
    *summary_out = DownloadSummary::default();

    let url = url.to_string();
    let headers = custom_headers.clone();
    let segment_count = segments.len();
    let policy = retry_policy.copied();

    if let Some(max) = max_concurrent {
        run::run_concurrent(
            url,
            headers,
            incomplete,
            segment_count,
            max,
            policy,
            bitmap,
            summary_out,
            progress_tx,
            in_flight_bytes,
            curl,
        )
    } else {
        run::run_unbounded(
            url,
            headers,
            incomplete,
            segment_count,
            policy,
            bitmap,
            summary_out,
            progress_tx,
            in_flight_bytes,
            curl,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::plan_segments;

    #[test]
    fn parse_content_range_parses_valid_header() {
        let headers = vec![
            "HTTP/1.1 206 Partial Content".to_string(),
            "Content-Range: bytes 100-199/1000".to_string(),
        ];
        assert_eq!(segment::parse_content_range(&headers), Some((100, 199)));
        let headers_lower = vec!["content-range: bytes 0-99/*".to_string()];
        assert_eq!(segment::parse_content_range(&headers_lower), Some((0, 99)));
    }

    #[test]
    fn download_segments_updates_bitmap() {
        let segments = plan_segments(1000, 4);
        let mut bitmap = SegmentBitmap::new(4);
        assert!(!bitmap.all_completed(4));
        bitmap.set_completed(0);
        bitmap.set_completed(2);
        let incomplete: Vec<_> = segments
            .iter()
            .enumerate()
            .filter(|(i, _)| !bitmap.is_completed(*i))
            .collect();
        assert_eq!(incomplete.len(), 2);
        assert!(bitmap.is_completed(0));
        assert!(!bitmap.is_completed(1));
        assert!(bitmap.is_completed(2));
        assert!(!bitmap.is_completed(3));
    }

    #[test]
    fn header_allowed_filters_referer_and_origin() {
        assert!(header_allowed("Referer", "https://example.com/page"));
        assert!(!header_allowed("Referer", "not a url"));
        assert!(!header_allowed("Origin", ""));
        assert!(header_allowed("Origin", "https://example.com"));
        assert!(header_allowed("X-Custom", "anything goes"));
    }

    #[test]
    fn curl_options_per_handle_splits_global_cap() {
        let opts = CurlOptions::per_handle(Some(4000), 4, None);
        assert_eq!(opts.max_recv_speed, Some(1000));
        let opts = CurlOptions::per_handle(None, 4, None);
        assert_eq!(opts.max_recv_speed, None);
    }
}
