//! Classify HTTP status and curl errors into retry policy error kinds.

use crate::retry::error::SegmentError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
///
/// Retryable: 408, 429, 500, 502, 503, 504. Everything else (other 4xx/5xx)
/// is fatal for the current attempt.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        408 | 429 => ErrorKind::Throttled,
        500 | 502 | 503 | 504 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a segment error (curl, HTTP, storage, or protocol-level) into an ErrorKind.
///
/// `RangeNotSupported` and `Cancelled` are never retried here: both are handled
/// by the coordinator itself (fallback to single-stream, transition to Paused)
/// rather than by the backoff loop.
pub fn classify(e: &SegmentError) -> ErrorKind {
    match e {
        SegmentError::Curl(ce) => classify_curl_error(ce),
        SegmentError::Http(code) => classify_http_status(*code),
        SegmentError::PartialTransfer { .. } => ErrorKind::Connection,
        SegmentError::Storage(_) => ErrorKind::Other,
        SegmentError::RangeNotSupported => ErrorKind::Other,
        SegmentError::Cancelled => ErrorKind::Other,
    }
}
