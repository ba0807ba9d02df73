//! Per-provider rate limiter
//!
//! Sliding 60-second request window plus a rolling daily token budget and a
//! consecutive-throttle ceiling. Each provider client exclusively owns one
//! limiter; independent providers never contend on a shared lock.
//!
//! Window slots are claimed atomically via [`RateLimiter::try_acquire`]
//! before the network call goes out, so concurrent tasks in a batch cannot
//! oversubscribe the window. A throttled or failed request releases its slot
//! (a rejected request did not spend provider quota).

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// After this many consecutive provider throttles the limiter reports
/// ineligible until a success resets the counter.
pub const MAX_CONSECUTIVE_THROTTLES: u32 = 3;

const WINDOW: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
struct LimiterState {
    /// Request timestamps inside the sliding window, oldest first
    timestamps: Vec<Instant>,
    /// Start of the current rolling day, anchored at first use
    day_start: Option<Instant>,
    tokens_today: u64,
    consecutive_throttles: u32,
    warned_zero_rpm: bool,
}

/// Sliding-window request limiter with a daily token budget
#[derive(Debug)]
pub struct RateLimiter {
    requests_per_minute: u32,
    /// 0 = unlimited
    tokens_per_day: u64,
    window: Duration,
    day: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a limiter with the standard 60s window and 24h day
    pub fn new(requests_per_minute: u32, tokens_per_day: u64) -> Self {
        Self::with_periods(requests_per_minute, tokens_per_day, WINDOW, DAY)
    }

    /// Create a limiter with custom periods (shortened in tests)
    pub fn with_periods(
        requests_per_minute: u32,
        tokens_per_day: u64,
        window: Duration,
        day: Duration,
    ) -> Self {
        Self {
            requests_per_minute,
            tokens_per_day,
            window,
            day,
            state: Mutex::new(LimiterState {
                timestamps: Vec::new(),
                day_start: None,
                tokens_today: 0,
                consecutive_throttles: 0,
                warned_zero_rpm: false,
            }),
        }
    }

    /// Read-only eligibility check (used by router ranking)
    pub fn can_request(&self) -> bool {
        let mut state = self.state.lock();
        self.eligible(&mut state, Instant::now())
    }

    /// Atomically check eligibility and claim a window slot.
    ///
    /// Returns false without mutating anything when ineligible. A claimed
    /// slot must be resolved by exactly one of [`Self::record_success`],
    /// [`Self::record_throttle`], or [`Self::record_error`].
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock();
        if !self.eligible(&mut state, now) {
            return false;
        }
        state.timestamps.push(now);
        true
    }

    /// Record a completed request: keep the claimed slot, charge tokens to
    /// the daily budget, and reset the throttle counter.
    pub fn record_success(&self, tokens: u64) {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.roll_day(&mut state, now);
        if state.day_start.is_none() {
            state.day_start = Some(now);
        }
        state.tokens_today = state.tokens_today.saturating_add(tokens);
        state.consecutive_throttles = 0;
    }

    /// Record a provider throttle response: release the claimed slot (the
    /// request did not count against quota) and bump the throttle counter.
    pub fn record_throttle(&self) {
        let mut state = self.state.lock();
        state.timestamps.pop();
        state.consecutive_throttles += 1;
    }

    /// Record a non-quota failure: release the claimed slot, nothing else.
    pub fn record_error(&self) {
        let mut state = self.state.lock();
        state.timestamps.pop();
    }

    /// Time until the oldest window entry expires. Diagnostics only - the
    /// dispatcher never blocks on this, it just tries another provider.
    pub fn time_until_eligible(&self) -> Duration {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.prune(&mut state, now);
        if (state.timestamps.len() as u32) < self.requests_per_minute {
            return Duration::ZERO;
        }
        match state.timestamps.first() {
            Some(&oldest) => self.window.saturating_sub(now.duration_since(oldest)),
            None => Duration::ZERO,
        }
    }

    /// Live entries currently in the window (after pruning)
    pub fn window_len(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.prune(&mut state, now);
        state.timestamps.len()
    }

    /// Tokens charged against the current rolling day
    pub fn tokens_today(&self) -> u64 {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.roll_day(&mut state, now);
        state.tokens_today
    }

    fn eligible(&self, state: &mut LimiterState, now: Instant) -> bool {
        if self.requests_per_minute == 0 {
            if !state.warned_zero_rpm {
                warn!("requests_per_minute is 0; limiter permanently ineligible");
                state.warned_zero_rpm = true;
            }
            return false;
        }

        self.prune(state, now);
        self.roll_day(state, now);

        if state.timestamps.len() as u32 >= self.requests_per_minute {
            return false;
        }
        if self.tokens_per_day > 0 && state.tokens_today >= self.tokens_per_day {
            return false;
        }
        state.consecutive_throttles < MAX_CONSECUTIVE_THROTTLES
    }

    fn prune(&self, state: &mut LimiterState, now: Instant) {
        let window = self.window;
        state
            .timestamps
            .retain(|&t| now.duration_since(t) < window);
    }

    /// Lazy daily reset, computed on access instead of a background timer
    fn roll_day(&self, state: &mut LimiterState, now: Instant) {
        if let Some(start) = state.day_start {
            if now.duration_since(start) >= self.day {
                state.day_start = Some(now);
                state.tokens_today = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquire_and_succeed(limiter: &RateLimiter, tokens: u64) -> bool {
        if !limiter.try_acquire() {
            return false;
        }
        limiter.record_success(tokens);
        true
    }

    #[test]
    fn test_window_never_exceeds_rpm() {
        let limiter = RateLimiter::new(5, 0);

        for _ in 0..20 {
            acquire_and_succeed(&limiter, 10);
            assert!(limiter.window_len() <= 5);
        }
        assert_eq!(limiter.window_len(), 5);
        assert!(!limiter.can_request());
    }

    #[test]
    fn test_window_entries_expire() {
        let limiter =
            RateLimiter::with_periods(2, 0, Duration::from_millis(50), Duration::from_secs(60));

        assert!(acquire_and_succeed(&limiter, 1));
        assert!(acquire_and_succeed(&limiter, 1));
        assert!(!limiter.can_request());

        std::thread::sleep(Duration::from_millis(80));
        assert!(limiter.can_request());
        assert_eq!(limiter.window_len(), 0);
    }

    #[test]
    fn test_daily_budget_boundary() {
        let limiter =
            RateLimiter::with_periods(100, 50, Duration::from_secs(60), Duration::from_millis(40));

        assert!(acquire_and_succeed(&limiter, 50));
        // Budget exhausted for the rest of the day
        assert!(!limiter.can_request());

        std::thread::sleep(Duration::from_millis(60));
        // Rolling boundary passed: counter reset to zero
        assert!(limiter.can_request());
        assert_eq!(limiter.tokens_today(), 0);
    }

    #[test]
    fn test_zero_tokens_per_day_is_unlimited() {
        let limiter = RateLimiter::new(100, 0);
        assert!(acquire_and_succeed(&limiter, 1_000_000));
        assert!(limiter.can_request());
    }

    #[test]
    fn test_throttle_spends_no_quota() {
        let limiter = RateLimiter::new(5, 1000);

        assert!(limiter.try_acquire());
        limiter.record_throttle();

        assert_eq!(limiter.window_len(), 0);
        assert_eq!(limiter.tokens_today(), 0);
    }

    #[test]
    fn test_consecutive_throttle_ceiling() {
        let limiter = RateLimiter::new(100, 0);

        for _ in 0..MAX_CONSECUTIVE_THROTTLES {
            assert!(limiter.try_acquire());
            limiter.record_throttle();
        }
        assert!(!limiter.can_request());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_success_resets_throttle_counter() {
        let limiter = RateLimiter::new(100, 0);

        limiter.try_acquire();
        limiter.record_throttle();
        limiter.try_acquire();
        limiter.record_throttle();

        assert!(limiter.try_acquire());
        limiter.record_success(5);
        assert!(limiter.can_request());

        // The counter started over, so the ceiling is a fresh 3 away
        for _ in 0..MAX_CONSECUTIVE_THROTTLES {
            assert!(limiter.try_acquire());
            limiter.record_throttle();
        }
        assert!(!limiter.can_request());
    }

    #[test]
    fn test_error_releases_slot_untouched() {
        let limiter = RateLimiter::new(1, 0);

        assert!(limiter.try_acquire());
        limiter.record_error();

        // Slot released; limiter otherwise untouched
        assert!(limiter.can_request());
        assert_eq!(limiter.tokens_today(), 0);
    }

    #[test]
    fn test_zero_rpm_always_ineligible() {
        let limiter = RateLimiter::new(0, 0);
        assert!(!limiter.can_request());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_time_until_eligible() {
        let limiter = RateLimiter::new(100, 0);
        assert_eq!(limiter.time_until_eligible(), Duration::ZERO);

        let full = RateLimiter::new(1, 0);
        assert!(full.try_acquire());
        full.record_success(1);
        let wait = full.time_until_eligible();
        assert!(wait > Duration::ZERO && wait <= Duration::from_secs(60));
    }

    #[test]
    fn test_concurrent_acquire_cannot_oversubscribe() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(3, 0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            handles.push(std::thread::spawn(move || limiter.try_acquire()));
        }
        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|granted| *granted)
            .count();
        assert_eq!(granted, 3);
    }
}
