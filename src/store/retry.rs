use std::thread;
use std::time::{Duration, Instant};

use crate::error::StoreError;

/// Attempts per operation, including the first one.
pub const MAX_ATTEMPTS: u32 = 4;

/// Backoff before the first retry; doubles on each later retry.
pub const BASE_BACKOFF: Duration = Duration::from_millis(25);

/// Bounded retry budget for one logical store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    /// Total time the operation may spend waiting on locks.
    pub timeout: Duration,
}

impl RetryPolicy {
    pub const fn new(timeout: Duration) -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_backoff: BASE_BACKOFF,
            timeout,
        }
    }

    /// Share of the timeout a single attempt may block inside the engine's
    /// own busy handler before reporting contention back to the retry loop.
    pub fn per_attempt_wait(&self) -> Duration {
        self.timeout / self.max_attempts.max(1)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.base_backoff.saturating_mul(1 << attempt.min(16));
        exp + jitter(self.base_backoff)
    }
}

/// Execute `f`, retrying with exponential backoff and jitter while it
/// reports [`StoreError::Contention`].
///
/// Gives up when `max_attempts` is reached or the next sleep would overrun
/// the policy timeout, returning a `Contention` error that records the real
/// attempt count and time spent. Any non-transient error is returned at once.
///
/// # Errors
///
/// Propagates the first non-transient error, or `Contention` once the budget is spent.
pub fn with_retry<T, F>(operation: &'static str, policy: &RetryPolicy, mut f: F) -> Result<T, StoreError>
where
    F: FnMut() -> Result<T, StoreError>,
{
    let started = Instant::now();
    let mut attempt = 0u32;
    loop {
        match f() {
            Ok(val) => return Ok(val),
            Err(e) if !e.is_transient() => return Err(e),
            Err(_) => {
                attempt += 1;
                let backoff = policy.backoff(attempt - 1);
                let waited = started.elapsed();
                if attempt >= policy.max_attempts || waited + backoff > policy.timeout {
                    tracing::warn!(
                        operation,
                        attempts = attempt,
                        waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                        "store still locked, giving up"
                    );
                    return Err(StoreError::Contention {
                        operation,
                        attempts: attempt,
                        waited,
                    });
                }
                tracing::debug!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "store busy, retrying"
                );
                thread::sleep(backoff);
            }
        }
    }
}

/// Pseudo-random jitter in `0..max` so writers that collided once do not
/// retry in lockstep.
fn jitter(max: Duration) -> Duration {
    use std::time::{SystemTime, UNIX_EPOCH};
    let max_micros = u64::try_from(max.as_micros()).unwrap_or(u64::MAX);
    if max_micros == 0 {
        return Duration::ZERO;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    Duration::from_micros(u64::from(nanos) % max_micros)
}
