use crate::error::RateLimitExceeded;
use log::{ debug, warn };
use std::collections::VecDeque;
use std::sync::{ Mutex, MutexGuard };
use std::time::{ Duration, Instant };

pub const DEFAULT_MAX_REQUESTS: usize = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window log limiter for outbound completion requests.
///
/// Every attempt is recorded, including rejected ones, so a burst of 11
/// calls leaves 11 entries in the history and the 11th is refused. The
/// history is pruned to the trailing window on each attempt. One limiter
/// is meant to be shared by `Arc` across every client in the process.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests + 1)),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn try_acquire(&self) -> Result<(), RateLimitExceeded> {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&self, now: Instant) -> Result<(), RateLimitExceeded> {
        let mut timestamps = self.history();
        timestamps.push_back(now);
        // Entries exactly `window` old are still inside the window.
        let window = self.window;
        timestamps.retain(|ts| now.saturating_duration_since(*ts) <= window);

        if timestamps.len() <= self.max_requests {
            debug!("Rate limiter admitted request ({}/{})", timestamps.len(), self.max_requests);
            return Ok(());
        }

        let retry_after = self.retry_after(&timestamps, now);
        warn!(
            "Rate limit exceeded: {} requests in the last {}s (max {})",
            timestamps.len(),
            window.as_secs(),
            self.max_requests
        );
        Err(RateLimitExceeded { retry_after })
    }

    /// Time until the next attempt would be admitted, assuming nothing else
    /// is recorded meanwhile. That attempt needs all but `max_requests - 1`
    /// of the retained entries to be strictly older than the window.
    fn retry_after(&self, timestamps: &VecDeque<Instant>, now: Instant) -> Duration {
        let mut sorted: Vec<Instant> = timestamps.iter().copied().collect();
        sorted.sort_unstable();
        sorted
            .len()
            .checked_sub(self.max_requests)
            .and_then(|idx| sorted.get(idx))
            .map(|blocking| {
                (*blocking + self.window).saturating_duration_since(now) + Duration::from_nanos(1)
            })
            .unwrap_or(self.window)
    }

    /// Number of attempts currently retained, as of the last pruning.
    pub fn in_window(&self) -> usize {
        self.history().len()
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        // The history stays consistent even if a holder panicked.
        self.timestamps.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_ten_calls_at_same_instant_succeed_and_eleventh_fails() {
        let limiter = RateLimiter::default();
        let now = Instant::now();
        for _ in 0..10 {
            assert!(limiter.try_acquire_at(now).is_ok());
        }
        let err = limiter.try_acquire_at(now).unwrap_err();
        assert_eq!(err.retry_after, DEFAULT_WINDOW + Duration::from_nanos(1));
    }

    #[test]
    fn test_rejected_call_still_counts() {
        let limiter = RateLimiter::default();
        let now = Instant::now();
        for _ in 0..11 {
            let _ = limiter.try_acquire_at(now);
        }
        assert_eq!(limiter.in_window(), 11);
        assert!(limiter.try_acquire_at(now + Duration::from_secs(1)).is_err());
        assert_eq!(limiter.in_window(), 12);
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::default();
        let start = Instant::now();
        for _ in 0..10 {
            limiter.try_acquire_at(start).unwrap();
        }
        assert!(limiter.try_acquire_at(start + Duration::from_secs(30)).is_err());

        // At start+61s the first burst has aged out; the rejected call at +30s remains.
        assert!(limiter.try_acquire_at(start + Duration::from_secs(61)).is_ok());
        assert_eq!(limiter.in_window(), 2);
    }

    #[test]
    fn test_entry_exactly_one_window_old_is_retained() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        limiter.try_acquire_at(start).unwrap();
        assert!(limiter.try_acquire_at(start + Duration::from_secs(60)).is_err());

        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.try_acquire_at(start).unwrap();
        assert!(limiter.try_acquire_at(start + Duration::from_millis(60_001)).is_ok());
    }

    #[test]
    fn test_retry_after_counts_rejected_attempts() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        limiter.try_acquire_at(start).unwrap();
        limiter.try_acquire_at(start + Duration::from_secs(20)).unwrap();
        let err = limiter.try_acquire_at(start + Duration::from_secs(45)).unwrap_err();
        // The +20s entry has to leave the window, not just the oldest one.
        assert_eq!(err.retry_after, Duration::from_secs(35) + Duration::from_nanos(1));
    }

    #[test]
    fn test_waiting_retry_after_is_enough() {
        let start = Instant::now();
        let staggered = || {
            let limiter = RateLimiter::default();
            for i in 0..10 {
                limiter.try_acquire_at(start + Duration::from_secs(i)).unwrap();
            }
            limiter
        };
        let rejected_at = start + Duration::from_secs(10);

        let limiter = staggered();
        let err = limiter.try_acquire_at(rejected_at).unwrap_err();
        assert_eq!(err.retry_after, Duration::from_secs(51) + Duration::from_nanos(1));
        assert!(limiter.try_acquire_at(rejected_at + err.retry_after).is_ok());

        let limiter = staggered();
        let err = limiter.try_acquire_at(rejected_at).unwrap_err();
        let too_early = rejected_at + err.retry_after - Duration::from_nanos(1);
        assert!(limiter.try_acquire_at(too_early).is_err());
    }

    #[test]
    fn test_waiting_retry_after_is_enough_after_burst() {
        let limiter = RateLimiter::default();
        let now = Instant::now();
        for _ in 0..10 {
            limiter.try_acquire_at(now).unwrap();
        }
        let err = limiter.try_acquire_at(now).unwrap_err();
        assert!(limiter.try_acquire_at(now + err.retry_after).is_ok());
    }

    #[test]
    fn test_zero_quota_reports_full_window() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        let err = limiter.try_acquire_at(Instant::now()).unwrap_err();
        assert_eq!(err.retry_after, Duration::from_secs(60));
    }

    #[test]
    fn test_successes_never_exceed_quota_in_any_window() {
        let limiter = RateLimiter::default();
        let start = Instant::now();
        let mut admitted = Vec::new();
        // Irregular arrivals, several per second, over five minutes.
        let mut offset_ms = 0u64;
        for i in 0..600u64 {
            offset_ms += (i * 7919) % 1_300;
            let at = start + Duration::from_millis(offset_ms);
            if limiter.try_acquire_at(at).is_ok() {
                admitted.push(at);
            }
        }
        assert!(!admitted.is_empty());
        for (i, end) in admitted.iter().enumerate() {
            let in_window = admitted[..=i]
                .iter()
                .filter(|ts| end.saturating_duration_since(**ts) <= DEFAULT_WINDOW)
                .count();
            assert!(in_window <= DEFAULT_MAX_REQUESTS, "{} admitted within one window", in_window);
        }
    }

    #[test]
    fn test_shared_across_threads() {
        let limiter = Arc::new(RateLimiter::default());
        let now = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..5).filter(|_| limiter.try_acquire_at(now).is_ok()).count()
                })
            })
            .collect();
        let admitted: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .sum();
        assert_eq!(admitted, DEFAULT_MAX_REQUESTS);
        assert_eq!(limiter.in_window(), 20);
    }
}
