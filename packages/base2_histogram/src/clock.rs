use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicU64};
use std::time::{Duration, Instant};

/// A monotonic source of time for step-based reporting windows.
///
/// The absolute value is meaningless - only the difference between two readings matters.
/// Readings must never decrease.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Debug + Send + Sync + 'static {
    /// Milliseconds elapsed since an arbitrary fixed origin.
    fn now_millis(&self) -> u64;
}

/// Real clock backed by [`std::time::Instant`], with the origin at clock creation.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock that starts counting from zero now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        // u64 milliseconds cover more than 500 million years of uptime.
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test (or an external scheduler) can keep one
/// handle and advance time while the histogram owns another.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use base2_histogram::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let handle = clock.clone();
///
/// handle.advance(Duration::from_secs(1));
///
/// assert_eq!(clock.now_millis(), 1000);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

/// Ordering only needs to make our own writes visible to readers of the same atomic.
const MANUAL_CLOCK_ORDERING: atomic::Ordering = atomic::Ordering::Relaxed;

impl ManualClock {
    /// Creates a clock that reads zero until advanced.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward. Sub-millisecond parts of `duration` are ignored.
    pub fn advance(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(millis, MANUAL_CLOCK_ORDERING);
    }

    /// Jumps to an absolute reading. Ignored if it would move time backwards.
    pub fn set_millis(&self, millis: u64) {
        self.millis.fetch_max(millis, MANUAL_CLOCK_ORDERING);
    }
}

impl Clock for ManualClock {
    #[cfg_attr(test, mutants::skip)] // Trivial accessor.
    fn now_millis(&self) -> u64 {
        self.millis.load(MANUAL_CLOCK_ORDERING)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(MonotonicClock: Send, Sync, Clock);
    assert_impl_all!(ManualClock: Send, Sync, Clock);

    #[test]
    fn manual_clock_starts_at_zero() {
        assert_eq!(ManualClock::new().now_millis(), 0);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();

        clock.advance(Duration::from_millis(250));
        other.advance(Duration::from_millis(250));

        assert_eq!(clock.now_millis(), 500);
        assert_eq!(other.now_millis(), 500);
    }

    #[test]
    fn manual_clock_never_goes_backwards() {
        let clock = ManualClock::new();

        clock.set_millis(1000);
        clock.set_millis(10);

        assert_eq!(clock.now_millis(), 1000);
    }

    #[test]
    fn manual_clock_ignores_sub_millisecond_parts() {
        let clock = ManualClock::new();

        clock.advance(Duration::from_micros(1999));

        assert_eq!(clock.now_millis(), 1);
    }

    #[test]
    fn monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();

        let first = clock.now_millis();
        let second = clock.now_millis();

        assert!(second >= first);
        assert!(first < 60_000);
    }
}
