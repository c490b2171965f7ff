//! Rate-limited warnings for repeated transport failures.
//!
//! A downed ingest endpoint produces one failure per flush. Logging each one
//! would flood the host application's logs, so callers count occurrences via
//! [`RateLimitedWarner::record`] and emit a summary at most once per interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default interval between summary warnings.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Counts suppressed events and reports them at a bounded rate.
///
/// The first call to [`warn_if_due`](Self::warn_if_due) after construction
/// emits immediately. [`flush`](Self::flush) reports any pending count
/// regardless of the interval.
#[derive(Debug)]
pub struct RateLimitedWarner {
    interval_ms: u64,
    last_warn: AtomicU64,
    pending: AtomicU64,
}

impl RateLimitedWarner {
    pub fn new(interval: Duration) -> Self {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        Self {
            interval_ms,
            last_warn: AtomicU64::new(now_millis().saturating_sub(interval_ms)),
            pending: AtomicU64::new(0),
        }
    }

    /// Count one suppressed event.
    pub fn record(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one event and report if the interval has elapsed.
    pub fn record_and_warn(&self, warn: impl FnMut(u64)) {
        self.record();
        self.warn_if_due(warn);
    }

    /// Report the pending count if the interval has elapsed.
    pub fn warn_if_due(&self, mut warn: impl FnMut(u64)) {
        let now = now_millis();
        let prev = self.last_warn.load(Ordering::Relaxed);
        if now.saturating_sub(prev) >= self.interval_ms {
            let count = self.pending.swap(0, Ordering::Relaxed);
            if count > 0 {
                warn(count);
            }
            self.last_warn.store(now, Ordering::Relaxed);
        }
    }

    /// Report the pending count immediately.
    pub fn flush(&self, mut warn: impl FnMut(u64)) {
        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            self.last_warn.store(now_millis(), Ordering::Relaxed);
        }
    }
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_first_warning_immediately() {
        let warner = RateLimitedWarner::default();
        let mut warnings = Vec::new();
        warner.record_and_warn(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
    }

    #[test]
    fn rate_limits_subsequent_warnings() {
        let warner = RateLimitedWarner::default();
        let mut warnings = Vec::new();
        warner.record_and_warn(|c| warnings.push(c));
        warner.record_and_warn(|c| warnings.push(c));
        warner.record_and_warn(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
    }

    #[test]
    fn flush_emits_suppressed_count() {
        let warner = RateLimitedWarner::default();
        let mut warnings = Vec::new();
        warner.record_and_warn(|c| warnings.push(c));
        warner.record();
        warner.record();
        warner.flush(|c| warnings.push(c));
        assert_eq!(warnings, vec![1, 2]);
    }

    #[test]
    fn zero_interval_never_suppresses() {
        let warner = RateLimitedWarner::new(Duration::ZERO);
        let mut warnings = Vec::new();
        warner.record_and_warn(|c| warnings.push(c));
        warner.record_and_warn(|c| warnings.push(c));
        assert_eq!(warnings, vec![1, 1]);
    }
}
