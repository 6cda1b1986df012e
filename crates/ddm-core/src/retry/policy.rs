use std::time::Duration;

/// High-level classification of an error for retry purposes.
///
/// This intentionally stays generic; callers can map HTTP status codes,
/// curl errors, or IO failures into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// Any other error (typically not retried).
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Lower bound on any computed backoff delay, so jitter can never make a
/// retry fire immediately back-to-back.
const MIN_DELAY: Duration = Duration::from_millis(100);

/// Exponential backoff policy with a multiplicative jitter, matching
/// `config::RetryConfig`'s tunables one-to-one.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff (delay before the first retry).
    pub base_delay: Duration,
    /// Multiplier applied per attempt: `base_delay * multiplier^(attempt-1)`.
    pub multiplier: f64,
    /// Upper bound on backoff delay, before jitter.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Compute the next backoff delay for a given attempt and error kind.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying. The delay is `base * multiplier^(attempt-1)`,
    /// jittered by +/-20% to avoid synchronized retry storms across
    /// segments/jobs hitting the same host, then capped at `max_delay` so the
    /// jitter can never push the final delay past it.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_) => {
                let exp = self.multiplier.powi(attempt.saturating_sub(1) as i32);
                let raw_secs = self.base_delay.as_secs_f64() * exp;
                let jittered_secs = raw_secs * jitter_factor();
                let capped_secs = jittered_secs.min(self.max_delay.as_secs_f64());
                let delay = Duration::from_secs_f64(capped_secs.max(0.0)).max(MIN_DELAY);
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}

/// Uniform random factor in `[0.8, 1.2]`.
fn jitter_factor() -> f64 {
    0.8 + rand::random::<f64>() * 0.4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_retry_for_other() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Other), RetryDecision::NoRetry);
    }

    #[test]
    fn exponential_backoff_grows_and_is_capped() {
        let mut p = RetryPolicy::default();
        // Allow many attempts so we can observe capping behaviour.
        p.max_attempts = 20;
        let d1 = match p.decide(1, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        let d2 = match p.decide(2, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        // With jitter the growth isn't strictly monotonic sample-to-sample, but
        // the *unjittered* base clearly grows; assert the jittered range overlaps
        // the expected order of magnitude instead of a strict `>=`.
        assert!(d2.as_secs_f64() > d1.as_secs_f64() * 0.5);

        // Very high attempt should cap at max_delay; jitter is applied before the
        // cap, so the final delay never exceeds it.
        let d_last = match p.decide(10, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        assert!(d_last.as_secs_f64() <= p.max_delay.as_secs_f64() + 0.01);
    }

    #[test]
    fn respects_max_attempts() {
        let mut p = RetryPolicy::default();
        p.max_attempts = 3;
        assert!(matches!(
            p.decide(1, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            p.decide(2, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(p.decide(3, ErrorKind::Throttled), RetryDecision::NoRetry);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        for _ in 0..1000 {
            let f = jitter_factor();
            assert!((0.8..=1.2).contains(&f));
        }
    }

    #[test]
    fn delay_never_below_minimum() {
        let p = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            multiplier: 1.0,
            max_delay: Duration::from_millis(1),
        };
        match p.decide(1, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => assert!(d >= MIN_DELAY),
            _ => panic!("expected retry"),
        }
    }
}
