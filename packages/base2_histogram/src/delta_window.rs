use std::num::NonZero;
use std::sync::Mutex;
use std::sync::atomic::{self, AtomicU64};
use std::time::Duration;

use num_traits::AsPrimitive;
use tracing::debug;

use crate::{Clock, ERR_POISONED_LOCK, HistogramCore, HistogramSnapshot, Scale, TimeUnit};

/// An exponential histogram that reports fixed-length, non-overlapping time windows.
///
/// Time is divided into steps of equal length, aligned to multiples of the step on the
/// clock's timeline. Observations are collected into the step that is currently open, which
/// is never visible to readers. Snapshots always describe the most recent step that has fully
/// elapsed - if no observations were made during it, the snapshot is empty.
///
/// The rollover from one step to the next happens lazily, on the first access (recording
/// or reading) after the step boundary has passed.
///
/// Create instances via [`ExponentialHistogram::builder()`][1].
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use base2_histogram::{ExponentialHistogram, ManualClock};
///
/// let clock = ManualClock::new();
///
/// let histogram = ExponentialHistogram::builder()
///     .clock(clock.clone())
///     .step(Duration::from_secs(60))
///     .build_delta()
///     .unwrap();
///
/// histogram.record_double(42.0);
///
/// // The step that contains the observation has not elapsed yet.
/// assert!(histogram.latest_snapshot().is_empty());
///
/// clock.advance(Duration::from_secs(60));
/// assert_eq!(histogram.latest_snapshot().count(), 1);
///
/// // Nothing was recorded in the following step.
/// clock.advance(Duration::from_secs(60));
/// assert!(histogram.latest_snapshot().is_empty());
/// ```
///
/// [1]: crate::ExponentialHistogram::builder
#[derive(Debug)]
pub struct DeltaWindow {
    /// Collects the observations of the step that is currently open.
    core: HistogramCore,

    clock: Box<dyn Clock>,
    step_millis: NonZero<u64>,

    /// Number of the step the core is collecting for, as `now_millis / step_millis`.
    ///
    /// Only updated while holding the `latest` lock. Reading it without the lock is merely
    /// a shortcut to skip the lock when no rollover is due.
    current_step: AtomicU64,

    /// Contents of the most recent fully elapsed step.
    latest: Mutex<HistogramSnapshot>,
}

impl DeltaWindow {
    pub(crate) fn new(
        core: HistogramCore,
        clock: Box<dyn Clock>,
        step_millis: NonZero<u64>,
    ) -> Self {
        let current_step = step_of(clock.now_millis(), step_millis);
        let latest = HistogramSnapshot::empty(core.max_scale(), core.zero_threshold());

        Self {
            core,
            clock,
            step_millis,
            current_step: AtomicU64::new(current_step),
            latest: Mutex::new(latest),
        }
    }

    /// Records one observation in the native unit of the histogram.
    ///
    /// Values at or below the zero threshold are counted in the zero bucket.
    /// Negative, NaN and infinite values are ignored.
    pub fn record_double(&self, value: f64) {
        self.roll_over_if_needed();
        self.core.record_double(value);
    }

    /// Records an integer observation.
    ///
    /// If the histogram was built with a [`TimeUnit`], `value` is a number of nanoseconds
    /// that is converted to that unit. Otherwise it is recorded as-is.
    pub fn record_long(&self, value: i64) {
        self.roll_over_if_needed();
        self.core.record_long(value);
    }

    /// Records the length of a time span, converted to the histogram's [`TimeUnit`].
    pub fn record_duration(&self, duration: Duration) {
        self.roll_over_if_needed();
        self.core.record_duration(duration);
    }

    /// Records an observation of any primitive numeric type.
    pub fn record(&self, value: impl AsPrimitive<f64>) {
        self.roll_over_if_needed();
        self.core.record(value);
    }

    /// Returns the contents of the most recent fully elapsed step.
    ///
    /// Observations made during the step that is still open are not included.
    #[must_use]
    pub fn latest_snapshot(&self) -> HistogramSnapshot {
        self.roll_over_if_needed();
        self.latest.lock().expect(ERR_POISONED_LOCK).clone()
    }

    /// Equivalent to [`latest_snapshot()`][1], named for symmetry with the cumulative window.
    ///
    /// [1]: DeltaWindow::latest_snapshot
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn take_snapshot(&self) -> HistogramSnapshot {
        self.latest_snapshot()
    }

    /// Returns the partial contents of the step that is still open.
    #[must_use]
    pub fn current_values_snapshot(&self) -> HistogramSnapshot {
        self.roll_over_if_needed();
        self.core.current_values_snapshot()
    }

    /// Discards the open step and the latest elapsed step, and returns to `max_scale()`.
    pub fn reset(&self) {
        let mut latest = self.latest.lock().expect(ERR_POISONED_LOCK);

        self.core.reset();

        *latest = HistogramSnapshot::empty(self.core.max_scale(), self.core.zero_threshold());
    }

    /// The scale that new observations are currently indexed at.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn scale(&self) -> Scale {
        self.core.scale()
    }

    /// The finest scale the histogram will ever use.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn max_scale(&self) -> Scale {
        self.core.max_scale()
    }

    /// Upper limit on the number of buckets between the smallest and largest observation.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn max_buckets(&self) -> usize {
        self.core.max_buckets()
    }

    /// Observations at or below this value are counted in the zero bucket.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn zero_threshold(&self) -> f64 {
        self.core.zero_threshold()
    }

    /// The unit that `record_long()` and `record_duration()` convert nanoseconds into.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn time_unit(&self) -> Option<TimeUnit> {
        self.core.time_unit()
    }

    /// The length of one reporting window.
    #[must_use]
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_millis.get())
    }

    fn roll_over_if_needed(&self) {
        let now_step = step_of(self.clock.now_millis(), self.step_millis);

        if now_step <= self.current_step.load(atomic::Ordering::Acquire) {
            return;
        }

        let mut latest = self.latest.lock().expect(ERR_POISONED_LOCK);

        // Someone else may have rolled over while we were waiting for the lock.
        let current_step = self.current_step.load(atomic::Ordering::Acquire);

        if now_step <= current_step {
            return;
        }

        let elapsed_steps = now_step.wrapping_sub(current_step);
        let completed = self.core.take_and_reset();

        // Data collected before the most recent elapsed step is stale - the step in between
        // had no activity and that (empty) step is what we report.
        *latest = if elapsed_steps == 1 {
            completed
        } else {
            HistogramSnapshot::empty(self.core.max_scale(), self.core.zero_threshold())
        };

        self.current_step.store(now_step, atomic::Ordering::Release);

        debug!(
            elapsed_steps,
            count = latest.count(),
            scale = latest.scale(),
            "delta window rolled over"
        );
    }
}

fn step_of(millis: u64, step_millis: NonZero<u64>) -> u64 {
    #[expect(
        clippy::integer_division,
        reason = "we want the number of the whole step the timestamp falls into"
    )]
    let step = millis / step_millis;

    step
}
