//! Single-segment HTTP Range GET and write to storage.

use crate::retry::SegmentError;
use crate::segmenter::Segment;
use crate::storage::StorageWriter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::CurlOptions;

/// Result of a single segment download (used for retry classification).
pub(super) type SegmentResult = Result<(), SegmentError>;

/// Downloads a single segment into its own temp file, writing at an offset
/// relative to the segment (not the whole resource). Returns `SegmentError`
/// so callers can classify and retry with backoff.
///
/// `resume_from` is the number of bytes already on disk for this segment
/// (reconciled from the file's on-disk size by the caller); the `Range`
/// request starts at `segment.start + resume_from` and writes continue from
/// that same local offset. If the segment is already fully on disk this
/// returns immediately without making a request.
///
/// `in_flight` is an optional `(counters, index)` pair; `counters[index]` is kept
/// up to date with bytes written for this segment so the progress worker can
/// report bytes currently in flight that haven't reached a persisted bitmap yet.
pub(super) fn download_one_segment(
    url: &str,
    custom_headers: &HashMap<String, String>,
    segment: &Segment,
    storage: &StorageWriter,
    resume_from: u64,
    in_flight: Option<(Arc<Vec<AtomicU64>>, usize)>,
    curl: CurlOptions,
) -> SegmentResult {
    let expected = segment.len();
    if resume_from >= expected {
        return Ok(());
    }

    let bytes_written = Arc::new(AtomicU64::new(resume_from));
    let bytes_written_in_cb = Arc::clone(&bytes_written);
    let storage_error: Arc<Mutex<Option<std::io::Error>>> = Arc::new(Mutex::new(None));
    let storage_error_cb = Arc::clone(&storage_error);
    let storage = storage.clone();
    // 1 once curl reports an abort originating from cancellation rather than storage.
    let cancelled: Arc<AtomicU8> = Arc::new(AtomicU8::new(0));
    let cancelled_cb = Arc::clone(&cancelled);

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(SegmentError::Curl)?;
    easy.follow_location(true).map_err(SegmentError::Curl)?;
    easy.connect_timeout(Duration::from_secs(30))
        .map_err(SegmentError::Curl)?;
    // Prefer low-speed timeout: abort if throughput drops below 1 KiB/s for 60s.
    // Keeps large segments on slow links from being killed by a hard wall-clock timeout.
    easy.low_speed_limit(1024)
        .map_err(SegmentError::Curl)?;
    easy.low_speed_time(Duration::from_secs(60))
        .map_err(SegmentError::Curl)?;
    // Safety net: hard timeout after 1 hour so a completely stuck transfer eventually fails.
    easy.timeout(Duration::from_secs(3600))
        .map_err(SegmentError::Curl)?;
    if let Some(speed) = curl.max_recv_speed {
        easy.max_recv_speed(speed).map_err(SegmentError::Curl)?;
    }
    if let Some(sz) = curl.buffer_size {
        easy.buffer_size(sz).map_err(SegmentError::Curl)?;
    }

    let range_str = format!(
        "{}-{}",
        segment.start + resume_from,
        segment.end.saturating_sub(1)
    );
    easy.range(&range_str).map_err(SegmentError::Curl)?;

    let mut list = curl::easy::List::new();
    for (k, v) in custom_headers {
        if k.eq_ignore_ascii_case("range") {
            continue;
        }
        if !super::header_allowed(k, v) {
            continue;
        }
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(SegmentError::Curl)?;
    }
    if !custom_headers.is_empty() {
        easy.http_headers(list).map_err(SegmentError::Curl)?;
    }

    let limiter = curl.limiter.clone();
    let per_download_cap = curl.per_download_cap;
    let abort = curl.abort.clone();

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(move |data| {
                if let Some(abort) = &abort {
                    if abort.load(Ordering::Relaxed) {
                        cancelled_cb.store(1, Ordering::Relaxed);
                        return Ok(0);
                    }
                }
                let chunk_len = data.len() as u64;
                if let Some(limiter) = &limiter {
                    limiter.request(chunk_len, per_download_cap);
                }
                let off = bytes_written_in_cb.fetch_add(chunk_len, Ordering::Relaxed);
                match storage.write_at(off, data) {
                    Ok(()) => {
                        if let Some((counters, index)) = &in_flight {
                            counters[*index].store(off + chunk_len, Ordering::Relaxed);
                        }
                        Ok(data.len())
                    }
                    Err(e) => {
                        let io_err = e.downcast::<std::io::Error>().unwrap_or_else(|e| {
                            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
                        });
                        let _ = storage_error_cb.lock().unwrap().replace(io_err);
                        Ok(0)
                    }
                }
            })
            .map_err(SegmentError::Curl)?;
        let perform_result = transfer.perform();
        if let Err(e) = perform_result {
            if e.is_write_error() {
                if let Some(io_err) = storage_error.lock().unwrap().take() {
                    return Err(SegmentError::Storage(io_err));
                }
                if cancelled.load(Ordering::Relaxed) != 0 {
                    return Err(SegmentError::Cancelled);
                }
            }
            return Err(SegmentError::Curl(e));
        }
    }

    let code = easy.response_code().map_err(SegmentError::Curl)? as u32;

    // A Range request answered with 200 means the server ignored `Range` entirely
    // and would stream the whole resource from byte 0 into this segment's offset,
    // corrupting the file. 416 mid-flight is the same signal: the server can no
    // longer satisfy byte ranges for this resource. Both are surfaced distinctly
    // so the coordinator falls back to single-stream mode instead of treating
    // this as an ordinary retryable HTTP error.
    if code == 200 || code == 416 {
        return Err(SegmentError::RangeNotSupported);
    }
    if code != 206 {
        return Err(SegmentError::Http(code));
    }

    let received = bytes_written.load(Ordering::Relaxed);
    if received != expected {
        return Err(SegmentError::PartialTransfer { expected, received });
    }

    Ok(())
}

/// Parses a `Content-Range: bytes <start>-<end>/<total>` header line (any case).
/// Kept for tests that document the wire format curl is expected to have
/// already validated via the status-code checks above.
pub(super) fn parse_content_range(headers: &[String]) -> Option<(u64, u64)> {
    for line in headers {
        let lower = line.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("content-range:") {
            let rest = rest.trim().strip_prefix("bytes ")?;
            let range_part = rest.split('/').next()?;
            let mut parts = range_part.split('-');
            let start: u64 = parts.next()?.trim().parse().ok()?;
            let end: u64 = parts.next()?.trim().parse().ok()?;
            return Some((start, end));
        }
    }
    None
}
