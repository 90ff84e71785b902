use std::time::Duration;

use num_traits::AsPrimitive;

use crate::{CumulativeWindow, DeltaWindow, HistogramBuilder, HistogramSnapshot, Scale, TimeUnit};

/// Whether a histogram reports running totals or fixed-length time windows.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Temporality {
    /// Observations accumulate until the histogram is explicitly reset.
    Cumulative,

    /// Each snapshot covers only the most recent fully elapsed time step.
    Delta,
}

/// An adaptive base-2 exponential histogram of either [`Temporality`].
///
/// Use this when the temporality is a runtime choice (e.g. dictated by the backend that data
/// is exported to). If it is known up front, you can build a [`CumulativeWindow`] or
/// [`DeltaWindow`] directly instead.
///
/// # Example
///
/// ```
/// use base2_histogram::{ExponentialHistogram, Temporality};
///
/// let histogram = ExponentialHistogram::builder()
///     .max_scale(10)
///     .max_buckets(16)
///     .build(Temporality::Cumulative)
///     .unwrap();
///
/// histogram.record_double(1.0001);
/// histogram.record_double(512.0);
/// histogram.record_double(65537.0);
///
/// let snapshot = histogram.take_snapshot();
///
/// assert_eq!(snapshot.count(), 3);
/// assert_eq!(snapshot.scale(), -1);
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum ExponentialHistogram {
    /// See [`CumulativeWindow`].
    Cumulative(CumulativeWindow),

    /// See [`DeltaWindow`].
    Delta(DeltaWindow),
}

impl ExponentialHistogram {
    /// Creates a new histogram builder with the default builder configuration.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Gets replaced with itself by different name, bad mutation.
    pub fn builder() -> HistogramBuilder {
        HistogramBuilder::new()
    }

    /// The temporality the histogram was built with.
    #[must_use]
    pub fn temporality(&self) -> Temporality {
        match self {
            Self::Cumulative(_) => Temporality::Cumulative,
            Self::Delta(_) => Temporality::Delta,
        }
    }

    /// Records one observation in the native unit of the histogram.
    pub fn record_double(&self, value: f64) {
        match self {
            Self::Cumulative(window) => window.record_double(value),
            Self::Delta(window) => window.record_double(value),
        }
    }

    /// Records an integer observation, in nanoseconds if the histogram has a time unit.
    pub fn record_long(&self, value: i64) {
        match self {
            Self::Cumulative(window) => window.record_long(value),
            Self::Delta(window) => window.record_long(value),
        }
    }

    /// Records the length of a time span.
    pub fn record_duration(&self, duration: Duration) {
        match self {
            Self::Cumulative(window) => window.record_duration(duration),
            Self::Delta(window) => window.record_duration(duration),
        }
    }

    /// Records an observation of any primitive numeric type.
    pub fn record(&self, value: impl AsPrimitive<f64>) {
        match self {
            Self::Cumulative(window) => window.record(value),
            Self::Delta(window) => window.record(value),
        }
    }

    /// Captures a snapshot for export.
    ///
    /// For a cumulative histogram, this is the current state. For a delta histogram, this is
    /// the most recent fully elapsed step.
    #[must_use]
    pub fn take_snapshot(&self) -> HistogramSnapshot {
        match self {
            Self::Cumulative(window) => window.take_snapshot(),
            Self::Delta(window) => window.take_snapshot(),
        }
    }

    /// Returns the most recently captured snapshot.
    #[must_use]
    pub fn latest_snapshot(&self) -> HistogramSnapshot {
        match self {
            Self::Cumulative(window) => window.latest_snapshot(),
            Self::Delta(window) => window.latest_snapshot(),
        }
    }

    /// Returns the live state that is still being recorded into.
    #[must_use]
    pub fn current_values_snapshot(&self) -> HistogramSnapshot {
        match self {
            Self::Cumulative(window) => window.current_values_snapshot(),
            Self::Delta(window) => window.current_values_snapshot(),
        }
    }

    /// Discards all observations.
    pub fn reset(&self) {
        match self {
            Self::Cumulative(window) => window.reset(),
            Self::Delta(window) => window.reset(),
        }
    }

    /// The scale that new observations are currently indexed at.
    #[must_use]
    pub fn scale(&self) -> Scale {
        match self {
            Self::Cumulative(window) => window.scale(),
            Self::Delta(window) => window.scale(),
        }
    }

    /// The finest scale the histogram will ever use.
    #[must_use]
    pub fn max_scale(&self) -> Scale {
        match self {
            Self::Cumulative(window) => window.max_scale(),
            Self::Delta(window) => window.max_scale(),
        }
    }

    /// The unit that `record_long()` and `record_duration()` convert nanoseconds into.
    #[must_use]
    pub fn time_unit(&self) -> Option<TimeUnit> {
        match self {
            Self::Cumulative(window) => window.time_unit(),
            Self::Delta(window) => window.time_unit(),
        }
    }
}
