//! Process-wide leaky-bucket rate limiter (byte/sec, global + per-download caps).
//!
//! `request` always grants the full amount asked for; it only delays the
//! caller so the aggregate byte rate stays under the effective cap. A limiter
//! that truncated a grant would desynchronize a segment's downloaded-byte
//! counter from what actually hit disk, which is the one invariant this
//! module exists to protect (see spec discussion of rate limiting and byte
//! accounting).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

/// Shared, thread-safe leaky-bucket scheduler. One instance is meant to be
/// shared process-wide; construct with `RateLimiter::new` for tests or use
/// `global()` for the shared singleton most callers want.
pub struct RateLimiter {
    global_cap_bytes_per_sec: AtomicU64,
    next_available: Mutex<Instant>,
}

impl RateLimiter {
    /// `global_cap_bytes_per_sec == 0` means unlimited.
    pub fn new(global_cap_bytes_per_sec: u64) -> Self {
        Self {
            global_cap_bytes_per_sec: AtomicU64::new(global_cap_bytes_per_sec),
            next_available: Mutex::new(Instant::now()),
        }
    }

    /// Change the global cap immediately. In-flight reservations already
    /// granted are not rescheduled.
    pub fn set_global_cap(&self, bytes_per_sec: u64) {
        self.global_cap_bytes_per_sec
            .store(bytes_per_sec, Ordering::Relaxed);
    }

    pub fn global_cap(&self) -> u64 {
        self.global_cap_bytes_per_sec.load(Ordering::Relaxed)
    }

    /// Reserve transfer time for `requested_bytes` under
    /// `min(nonzero global cap, nonzero per_download_cap)`. Blocks the
    /// calling thread until the reservation begins, then returns
    /// `requested_bytes` unchanged — the grant is never smaller than asked.
    pub fn request(&self, requested_bytes: u64, per_download_cap: Option<u64>) -> u64 {
        if requested_bytes == 0 {
            return 0;
        }
        let effective = effective_cap(self.global_cap(), per_download_cap.unwrap_or(0));
        if effective == 0 {
            return requested_bytes;
        }

        let reservation = Duration::from_secs_f64(requested_bytes as f64 / effective as f64);
        let start = {
            let mut next = self.next_available.lock().unwrap();
            let now = Instant::now();
            let start = if *next > now { *next } else { now };
            *next = start + reservation;
            start
        };

        let now = Instant::now();
        if start > now {
            std::thread::sleep(start - now);
        }
        requested_bytes
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(0)
    }
}

/// `0` in either cap means "no limit from this source"; the effective cap is
/// the smaller of the two nonzero caps, or unlimited if both are zero.
fn effective_cap(global: u64, per_download: u64) -> u64 {
    match (global, per_download) {
        (0, 0) => 0,
        (0, p) => p,
        (g, 0) => g,
        (g, p) => g.min(p),
    }
}

static GLOBAL: OnceLock<Arc<RateLimiter>> = OnceLock::new();

/// The process-wide limiter singleton, created unlimited on first access.
/// All segment and single-stream workers share this instance so a global
/// speed cap applies across every download, not per-connection.
pub fn global() -> Arc<RateLimiter> {
    GLOBAL
        .get_or_init(|| Arc::new(RateLimiter::default()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_when_both_caps_zero_returns_immediately() {
        let limiter = RateLimiter::new(0);
        let start = Instant::now();
        let granted = limiter.request(10_000_000, None);
        assert_eq!(granted, 10_000_000);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn grant_is_always_the_full_request_even_when_capped() {
        let limiter = RateLimiter::new(1000);
        let granted = limiter.request(500, None);
        assert_eq!(granted, 500);
    }

    #[test]
    fn effective_cap_is_min_of_nonzero_caps() {
        assert_eq!(effective_cap(0, 0), 0);
        assert_eq!(effective_cap(1000, 0), 1000);
        assert_eq!(effective_cap(0, 500), 500);
        assert_eq!(effective_cap(1000, 500), 500);
        assert_eq!(effective_cap(500, 1000), 500);
    }

    #[test]
    fn back_to_back_requests_are_paced_by_the_cap() {
        // cap = 1000 B/s; two 500-byte requests back to back should take
        // roughly 1 second total (the second must wait for the first's
        // reservation to elapse).
        let limiter = RateLimiter::new(1000);
        let start = Instant::now();
        limiter.request(500, None);
        let t1 = start.elapsed();
        limiter.request(500, None);
        let t2 = start.elapsed();
        assert!(t2 - t1 + Duration::from_millis(20) >= Duration::from_millis(500));
    }

    #[test]
    fn mutating_global_cap_is_immediate() {
        let limiter = RateLimiter::new(1000);
        assert_eq!(limiter.global_cap(), 1000);
        limiter.set_global_cap(0);
        assert_eq!(limiter.global_cap(), 0);
        let start = Instant::now();
        limiter.request(1_000_000, None);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn global_singleton_is_shared() {
        let a = global();
        let b = global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
