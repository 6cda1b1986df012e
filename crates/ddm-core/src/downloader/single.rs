//! Single-stream HTTP GET downloader (non-Range fallback, or resume via one
//! `Range: bytes=<existing>-` request).
//!
//! Writes the response body sequentially to storage starting at `resume_from`.

use anyhow::{Context, Result};
use crate::storage::StorageWriter;
use super::CurlOptions;
use std::collections::HashMap;
use std::str;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Downloads a URL with a single GET, writing sequentially to `storage`.
///
/// If `resume_from > 0`, requests `Range: bytes=<resume_from>-` to continue an
/// existing `.part` file. Response handling per spec: `416` with
/// `resume_from > 0` means the file was already complete; `206` appends at
/// `resume_from`; `200` means the server ignored our Range header, so the
/// temp file is truncated and the download restarts from byte 0. Returns the
/// total number of bytes now on disk.
pub fn download_single(
    url: &str,
    custom_headers: &HashMap<String, String>,
    storage: &StorageWriter,
    expected_len: Option<u64>,
    resume_from: u64,
    curl: CurlOptions,
) -> Result<u64> {
    let offset = Arc::new(AtomicU64::new(resume_from));
    let offset_cb = Arc::clone(&offset);
    let storage_for_cb = storage.clone();
    let detected_code: Arc<AtomicU32> = Arc::new(AtomicU32::new(0));
    let detected_code_header_cb = Arc::clone(&detected_code);
    let detected_code_write_cb = Arc::clone(&detected_code);
    let restart_checked: Arc<AtomicU8> = Arc::new(AtomicU8::new(0));
    let restart_checked_cb = Arc::clone(&restart_checked);

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    if let Some(speed) = curl.max_recv_speed {
        easy.max_recv_speed(speed).map_err(|e| anyhow::anyhow!("curl: {}", e))?;
    }
    if let Some(sz) = curl.buffer_size {
        easy.buffer_size(sz).map_err(|e| anyhow::anyhow!("curl: {}", e))?;
    }
    easy.connect_timeout(Duration::from_secs(30))?;
    easy.low_speed_limit(1024).map_err(|e| anyhow::anyhow!("curl: {}", e))?;
    easy.low_speed_time(Duration::from_secs(60))?;
    easy.timeout(Duration::from_secs(3600))?;

    let mut list = curl::easy::List::new();
    let caller_sets_range = custom_headers.keys().any(|k| k.eq_ignore_ascii_case("range"));
    if resume_from > 0 && !caller_sets_range {
        list.append(&format!("Range: bytes={}-", resume_from))?;
    }
    for (k, v) in custom_headers {
        if !super::header_allowed(k, v) {
            continue;
        }
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if resume_from > 0 || !custom_headers.is_empty() {
        easy.http_headers(list)?;
    }

    let limiter = curl.limiter.clone();
    let per_download_cap = curl.per_download_cap;
    let abort = curl.abort.clone();

    {
        let mut transfer = easy.transfer();
        transfer.header_function(move |data| {
            if let Ok(line) = str::from_utf8(data) {
                let line = line.trim();
                if let Some(rest) = line.strip_prefix("HTTP/") {
                    if let Some(code_str) = rest.split_whitespace().nth(1) {
                        if let Ok(code) = code_str.parse::<u32>() {
                            detected_code_header_cb.store(code, Ordering::Relaxed);
                        }
                    }
                }
            }
            true
        })?;
        transfer.write_function(move |data| {
            if let Some(abort) = &abort {
                if abort.load(Ordering::Relaxed) {
                    return Ok(0);
                }
            }
            if restart_checked_cb.swap(1, Ordering::Relaxed) == 0 {
                let code = detected_code_write_cb.load(Ordering::Relaxed);
                if resume_from > 0 && code == 200 {
                    // Server ignored Range: start over from byte 0.
                    let _ = storage_for_cb.truncate();
                    offset_cb.store(0, Ordering::Relaxed);
                }
            }
            let chunk_len = data.len() as u64;
            if let Some(limiter) = &limiter {
                limiter.request(chunk_len, per_download_cap);
            }
            let off = offset_cb.fetch_add(chunk_len, Ordering::Relaxed);
            match storage_for_cb.write_at(off, data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    tracing::warn!("single download write failed: {}", e);
                    Ok(0) // abort transfer
                }
            }
        })?;
        transfer.perform().context("GET request failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    if resume_from > 0 && code == 416 {
        return Ok(resume_from);
    }
    if code < 200 || code >= 300 {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }

    let written = offset.load(Ordering::Relaxed);
    if let Some(exp) = expected_len {
        if written != exp {
            anyhow::bail!("partial transfer: wrote {} of {}", written, exp);
        }
    }
    Ok(written)
}
