use std::sync::Mutex;
use std::time::Duration;

use num_traits::AsPrimitive;

use crate::{ERR_POISONED_LOCK, HistogramCore, HistogramSnapshot, Scale, TimeUnit};

/// An exponential histogram that accumulates observations until explicitly reset.
///
/// Suitable for exporters that publish running totals. Taking a snapshot never discards data,
/// so the count reported by successive [`take_snapshot()`][1] calls only grows until
/// [`reset()`][2] is called.
///
/// Create instances via [`ExponentialHistogram::builder()`][3].
///
/// # Example
///
/// ```
/// use base2_histogram::ExponentialHistogram;
///
/// let histogram = ExponentialHistogram::builder()
///     .max_scale(10)
///     .max_buckets(16)
///     .build_cumulative()
///     .unwrap();
///
/// histogram.record_double(1.0001);
/// histogram.record_double(512.0);
///
/// let snapshot = histogram.take_snapshot();
/// assert_eq!(snapshot.count(), 2);
/// assert_eq!(snapshot.scale(), 0);
/// ```
///
/// [1]: CumulativeWindow::take_snapshot
/// [2]: CumulativeWindow::reset
/// [3]: crate::ExponentialHistogram::builder
#[derive(Debug)]
pub struct CumulativeWindow {
    core: HistogramCore,

    /// The snapshot captured by the most recent `take_snapshot()`.
    latest: Mutex<HistogramSnapshot>,
}

impl CumulativeWindow {
    pub(crate) fn new(core: HistogramCore) -> Self {
        let latest = HistogramSnapshot::empty(core.max_scale(), core.zero_threshold());

        Self {
            core,
            latest: Mutex::new(latest),
        }
    }

    /// Records one observation in the native unit of the histogram.
    ///
    /// Values at or below the zero threshold are counted in the zero bucket.
    /// Negative, NaN and infinite values are ignored.
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn record_double(&self, value: f64) {
        self.core.record_double(value);
    }

    /// Records an integer observation.
    ///
    /// If the histogram was built with a [`TimeUnit`], `value` is a number of nanoseconds
    /// that is converted to that unit. Otherwise it is recorded as-is.
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn record_long(&self, value: i64) {
        self.core.record_long(value);
    }

    /// Records the length of a time span, converted to the histogram's [`TimeUnit`].
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn record_duration(&self, duration: Duration) {
        self.core.record_duration(duration);
    }

    /// Records an observation of any primitive numeric type.
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn record(&self, value: impl AsPrimitive<f64>) {
        self.core.record(value);
    }

    /// Captures the current state as the new latest snapshot and returns it.
    ///
    /// Does not clear any data.
    #[must_use]
    pub fn take_snapshot(&self) -> HistogramSnapshot {
        let mut latest = self.latest.lock().expect(ERR_POISONED_LOCK);

        *latest = self.core.current_values_snapshot();

        latest.clone()
    }

    /// Returns the snapshot captured by the most recent [`take_snapshot()`][1] call.
    ///
    /// Before the first capture, this is an empty snapshot.
    ///
    /// [1]: CumulativeWindow::take_snapshot
    #[must_use]
    pub fn latest_snapshot(&self) -> HistogramSnapshot {
        self.latest.lock().expect(ERR_POISONED_LOCK).clone()
    }

    /// Returns the live state without capturing it as the latest snapshot.
    #[must_use]
    pub fn current_values_snapshot(&self) -> HistogramSnapshot {
        self.core.current_values_snapshot()
    }

    /// Discards all observations, including the latest snapshot, and returns to `max_scale()`.
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
}
