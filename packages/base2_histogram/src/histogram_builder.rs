use std::num::NonZero;
use std::time::Duration;

use crate::{
    Clock, CumulativeWindow, DEFAULT_MAX_BUCKETS, DEFAULT_MAX_SCALE, DEFAULT_STEP,
    DEFAULT_ZERO_THRESHOLD, DeltaWindow, Error, ExponentialHistogram, HistogramCore,
    MAX_SUPPORTED_SCALE, MIN_MAX_BUCKETS, MIN_SUPPORTED_SCALE, MonotonicClock, Result, Scale,
    Temporality, TimeUnit,
};

/// Creates instances of [`CumulativeWindow`], [`DeltaWindow`] or [`ExponentialHistogram`].
///
/// All parameters are optional:
/// * `max_scale` - finest resolution, used until the data forces a coarser one. Default 20.
/// * `max_buckets` - limit on the populated bucket range. Default 160.
/// * `zero_threshold` - observations at or below this are counted as zero. Given in
///   nanoseconds if a `time_unit` is set. Default 0.0.
/// * `time_unit` - if set, integer and `Duration` observations are converted from
///   nanoseconds to this unit. Default none.
/// * `step` and `clock` - only used by delta windows. Default one minute of real time.
///
/// Use `ExponentialHistogram::builder()` to create a new instance of this builder.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use base2_histogram::{ExponentialHistogram, Temporality, TimeUnit};
///
/// let histogram = ExponentialHistogram::builder()
///     .max_scale(10)
///     .max_buckets(16)
///     .time_unit(TimeUnit::Milliseconds)
///     .step(Duration::from_secs(10))
///     .build(Temporality::Delta)
///     .unwrap();
///
/// assert_eq!(histogram.temporality(), Temporality::Delta);
/// assert_eq!(histogram.max_scale(), 10);
/// ```
#[derive(Debug)]
pub struct HistogramBuilder {
    max_scale: Scale,
    max_buckets: usize,
    zero_threshold: f64,
    time_unit: Option<TimeUnit>,

    step: Duration,

    /// If not set, delta windows use a new `MonotonicClock`.
    clock: Option<Box<dyn Clock>>,
}

impl HistogramBuilder {
    pub(crate) fn new() -> Self {
        Self {
            max_scale: DEFAULT_MAX_SCALE,
            max_buckets: DEFAULT_MAX_BUCKETS,
            zero_threshold: DEFAULT_ZERO_THRESHOLD,
            time_unit: None,
            step: DEFAULT_STEP,
            clock: None,
        }
    }

    /// Sets the finest scale the histogram may use.
    ///
    /// Must be in `[MIN_SUPPORTED_SCALE, MAX_SUPPORTED_SCALE]`.
    #[must_use]
    pub fn max_scale(self, max_scale: Scale) -> Self {
        Self { max_scale, ..self }
    }

    /// Sets the maximum number of buckets between the smallest and the largest observation.
    ///
    /// Must be at least `MIN_MAX_BUCKETS`.
    #[must_use]
    pub fn max_buckets(self, max_buckets: usize) -> Self {
        Self {
            max_buckets,
            ..self
        }
    }

    /// Sets the value at or below which observations are counted in the zero bucket.
    ///
    /// If a time unit is set, the threshold is given in nanoseconds like the integer
    /// observations and converted to that unit. Negative thresholds are treated as zero.
    /// NaN is rejected at build time.
    #[must_use]
    pub fn zero_threshold(self, zero_threshold: f64) -> Self {
        Self {
            zero_threshold,
            ..self
        }
    }

    /// Sets the unit that integer and `Duration` observations are converted into.
    #[must_use]
    pub fn time_unit(self, time_unit: TimeUnit) -> Self {
        Self {
            time_unit: Some(time_unit),
            ..self
        }
    }

    /// Sets the length of one delta window. Sub-millisecond parts are ignored.
    ///
    /// Must be at least one millisecond when building a delta window.
    #[must_use]
    pub fn step(self, step: Duration) -> Self {
        Self { step, ..self }
    }

    /// Sets the clock that delta windows use to detect step boundaries.
    #[must_use]
    pub fn clock(self, clock: impl Clock) -> Self {
        Self {
            clock: Some(Box::new(clock)),
            ..self
        }
    }

    /// Builds a histogram that accumulates until explicitly reset.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of its valid range.
    pub fn build_cumulative(self) -> Result<CumulativeWindow> {
        Ok(CumulativeWindow::new(self.core()?))
    }

    /// Builds a histogram that reports fixed-length time windows.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of its valid range.
    pub fn build_delta(self) -> Result<DeltaWindow> {
        let step_millis = NonZero::new(u64::try_from(self.step.as_millis()).unwrap_or(u64::MAX))
            .ok_or(Error::ZeroStep)?;

        let core = self.core()?;

        let clock = self.clock.unwrap_or_else(|| Box::new(MonotonicClock::new()));

        Ok(DeltaWindow::new(core, clock, step_millis))
    }

    /// Builds a histogram with the given temporality.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of its valid range.
    pub fn build(self, temporality: Temporality) -> Result<ExponentialHistogram> {
        match temporality {
            Temporality::Cumulative => {
                self.build_cumulative().map(ExponentialHistogram::Cumulative)
            }
            Temporality::Delta => self.build_delta().map(ExponentialHistogram::Delta),
        }
    }

    fn core(&self) -> Result<HistogramCore> {
        if !(MIN_SUPPORTED_SCALE..=MAX_SUPPORTED_SCALE).contains(&self.max_scale) {
            return Err(Error::MaxScaleOutOfRange {
                max_scale: self.max_scale,
                min: MIN_SUPPORTED_SCALE,
                max: MAX_SUPPORTED_SCALE,
            });
        }

        if self.max_buckets < MIN_MAX_BUCKETS {
            return Err(Error::TooFewBuckets {
                max_buckets: self.max_buckets,
                min: MIN_MAX_BUCKETS,
            });
        }

        if self.zero_threshold.is_nan() {
            return Err(Error::InvalidZeroThreshold);
        }

        let zero_threshold = match self.time_unit {
            Some(unit) => unit.from_nanos(self.zero_threshold),
            None => self.zero_threshold,
        };

        Ok(HistogramCore::new(
            self.max_scale,
            self.max_buckets,
            zero_threshold.max(0.0),
            self.time_unit,
        ))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::float_cmp, reason = "exact values are constructed by the tests")]

    use super::*;
    use crate::ManualClock;

    #[test]
    fn defaults() {
        let histogram = HistogramBuilder::new().build_cumulative().unwrap();

        assert_eq!(histogram.max_scale(), 20);
        assert_eq!(histogram.max_buckets(), 160);
        assert_eq!(histogram.zero_threshold(), 0.0);
        assert_eq!(histogram.time_unit(), None);
        assert_eq!(histogram.scale(), 20);
    }

    #[test]
    fn delta_defaults_to_one_minute_step() {
        let histogram = HistogramBuilder::new().build_delta().unwrap();

        assert_eq!(histogram.step(), Duration::from_secs(60));
    }

    #[test]
    fn applies_configuration() {
        let histogram = HistogramBuilder::new()
            .max_scale(-3)
            .max_buckets(2)
            .zero_threshold(500_000_000.0)
            .time_unit(TimeUnit::Seconds)
            .clock(ManualClock::new())
            .step(Duration::from_millis(1))
            .build_delta()
            .unwrap();

        assert_eq!(histogram.max_scale(), -3);
        assert_eq!(histogram.max_buckets(), 2);
        assert_eq!(histogram.zero_threshold(), 0.5);
        assert_eq!(histogram.time_unit(), Some(TimeUnit::Seconds));
        assert_eq!(histogram.step(), Duration::from_millis(1));
    }

    #[test]
    fn scale_limits_are_inclusive() {
        assert!(
            HistogramBuilder::new()
                .max_scale(MIN_SUPPORTED_SCALE)
                .build_cumulative()
                .is_ok()
        );
        assert!(
            HistogramBuilder::new()
                .max_scale(MAX_SUPPORTED_SCALE)
                .build_cumulative()
                .is_ok()
        );
    }

    #[test]
    fn rejects_out_of_range_scale() {
        let result = HistogramBuilder::new().max_scale(21).build_cumulative();
        assert!(matches!(
            result,
            Err(Error::MaxScaleOutOfRange { max_scale: 21, .. })
        ));

        let result = HistogramBuilder::new().max_scale(-11).build_cumulative();
        assert!(matches!(
            result,
            Err(Error::MaxScaleOutOfRange { max_scale: -11, .. })
        ));
    }

    #[test]
    fn rejects_too_few_buckets() {
        let result = HistogramBuilder::new().max_buckets(1).build_cumulative();

        assert!(matches!(
            result,
            Err(Error::TooFewBuckets { max_buckets: 1, .. })
        ));
    }

    #[test]
    fn rejects_nan_threshold() {
        let result = HistogramBuilder::new()
            .zero_threshold(f64::NAN)
            .build_cumulative();

        assert!(matches!(result, Err(Error::InvalidZeroThreshold)));
    }

    #[test]
    fn negative_threshold_becomes_zero() {
        let histogram = HistogramBuilder::new()
            .zero_threshold(-1.0)
            .build_cumulative()
            .unwrap();

        assert_eq!(histogram.zero_threshold(), 0.0);
    }

    #[test]
    fn threshold_is_in_nanoseconds_with_time_unit() {
        let histogram = HistogramBuilder::new()
            .max_scale(10)
            .max_buckets(16)
            .zero_threshold(1_000_000.0)
            .time_unit(TimeUnit::Milliseconds)
            .build_cumulative()
            .unwrap();

        assert_eq!(histogram.zero_threshold(), 1.0);

        histogram.record_duration(Duration::from_millis(1));
        histogram.record_duration(Duration::from_millis(2));

        let snapshot = histogram.take_snapshot();
        assert_eq!(snapshot.zero_count(), 1);
        assert_eq!(snapshot.zero_threshold(), 1.0);
        assert_eq!(snapshot.scale(), 10);
        // 2 ms is exactly 2^1, the last bucket of the first octave above 1.
        assert_eq!(snapshot.offset(), 1023);
        assert_eq!(snapshot.bucket_counts(), &[1]);
    }

    #[test]
    fn threshold_without_time_unit_is_verbatim() {
        let histogram = HistogramBuilder::new()
            .zero_threshold(1_000_000.0)
            .build_cumulative()
            .unwrap();

        assert_eq!(histogram.zero_threshold(), 1_000_000.0);
    }

    #[test]
    fn rejects_sub_millisecond_step() {
        let result = HistogramBuilder::new()
            .step(Duration::from_micros(999))
            .build_delta();

        assert!(matches!(result, Err(Error::ZeroStep)));
    }

    #[test]
    fn build_honors_temporality() {
        let cumulative = HistogramBuilder::new()
            .build(Temporality::Cumulative)
            .unwrap();
        let delta = HistogramBuilder::new().build(Temporality::Delta).unwrap();

        assert_eq!(cumulative.temporality(), Temporality::Cumulative);
        assert_eq!(delta.temporality(), Temporality::Delta);
    }
}
