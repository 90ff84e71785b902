use std::sync::{Arc, Mutex};
use std::time::Duration;

use num_traits::AsPrimitive;
use tracing::{debug, trace};

use crate::bucket_counts::{BucketCounts, shift_index};
use crate::{ERR_POISONED_LOCK, HistogramSnapshot, IndexProvider, Scale, TimeUnit};

/// The adaptive exponential histogram shared by both reporting windows.
///
/// Positive observations are counted in exponentially sized buckets at the current scale.
/// When a new observation would stretch the populated bucket range beyond `max_buckets`,
/// the histogram first lowers its scale (merging neighboring buckets) just enough for the
/// new observation to fit. The scale therefore only ever decreases, until `reset()` or
/// `take_and_reset()` picks a fresh scale for the next batch of data.
///
/// All mutable state lives behind one mutex so that a snapshot never observes a partially
/// applied observation or a half-merged bucket array.
#[derive(Debug)]
pub(crate) struct HistogramCore {
    max_scale: Scale,
    max_buckets: usize,
    zero_threshold: f64,

    /// If set, `record_long()` treats its input as nanoseconds and converts to this unit.
    time_unit: Option<TimeUnit>,

    state: Mutex<CoreState>,
}

#[derive(Debug)]
struct CoreState {
    /// Always the provider for the current scale.
    provider: Arc<IndexProvider>,

    buckets: BucketCounts,

    zero_count: u64,

    /// All accepted observations, including the zero bucket.
    count: u64,
    sum: f64,
    max: f64,
}

impl CoreState {
    fn scale(&self) -> Scale {
        self.provider.scale()
    }
}

impl HistogramCore {
    pub(crate) fn new(
        max_scale: Scale,
        max_buckets: usize,
        zero_threshold: f64,
        time_unit: Option<TimeUnit>,
    ) -> Self {
        Self {
            max_scale,
            max_buckets,
            zero_threshold,
            time_unit,
            state: Mutex::new(CoreState {
                provider: IndexProvider::for_scale(max_scale),
                buckets: BucketCounts::new(max_buckets),
                zero_count: 0,
                count: 0,
                sum: 0.0,
                max: 0.0,
            }),
        }
    }

    pub(crate) fn max_scale(&self) -> Scale {
        self.max_scale
    }

    pub(crate) fn max_buckets(&self) -> usize {
        self.max_buckets
    }

    pub(crate) fn zero_threshold(&self) -> f64 {
        self.zero_threshold
    }

    pub(crate) fn time_unit(&self) -> Option<TimeUnit> {
        self.time_unit
    }

    /// The scale the next observation will be indexed at.
    pub(crate) fn scale(&self) -> Scale {
        self.state.lock().expect(ERR_POISONED_LOCK).scale()
    }

    /// Records one observation.
    ///
    /// Negative, NaN and infinite values are dropped without affecting any total.
    pub(crate) fn record_double(&self, value: f64) {
        if value.is_nan() || value.is_infinite() || value < 0.0 {
            trace!(value, "dropping observation that cannot be bucketed");
            return;
        }

        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

        state.count = state.count.wrapping_add(1);
        state.sum += value;

        if value > state.max {
            state.max = value;
        }

        if value <= self.zero_threshold {
            state.zero_count = state.zero_count.wrapping_add(1);
            return;
        }

        let index = state.provider.index_for_value(value);

        if state.buckets.try_increment(index, 1) {
            return;
        }

        let delta = state.buckets.downscale_needed_for(index);
        Self::downscale(&mut state, delta);

        // Shifting the old index gives the same bucket as indexing the value at the new scale.
        let inserted = state.buckets.try_increment(shift_index(index, delta), 1);

        debug_assert!(
            inserted,
            "downscaling by {delta} must make room for index {index}"
        );
        debug_assert_eq!(
            state.buckets.total().wrapping_add(state.zero_count),
            state.count,
            "no observation may be lost or duplicated by a downscale"
        );
    }

    /// Records an integer observation.
    ///
    /// If the histogram has a time unit, `value` is in nanoseconds and is converted to that
    /// unit first. Otherwise it is recorded as-is.
    pub(crate) fn record_long(&self, value: i64) {
        #[expect(
            clippy::cast_precision_loss,
            reason = "observations beyond 2^53 are fine to round, bucket widths are far larger"
        )]
        let value = value as f64;

        match self.time_unit {
            Some(unit) => self.record_double(unit.from_nanos(value)),
            None => self.record_double(value),
        }
    }

    pub(crate) fn record_duration(&self, duration: Duration) {
        self.record_long(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX));
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub(crate) fn record(&self, value: impl AsPrimitive<f64>) {
        self.record_double(value.as_());
    }

    /// Clears all data and returns to `max_scale`.
    pub(crate) fn reset(&self) {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);
        Self::clear_locked(&mut state, self.max_scale);
    }

    /// A copy of the current state. Does not modify anything.
    pub(crate) fn current_values_snapshot(&self) -> HistogramSnapshot {
        let state = self.state.lock().expect(ERR_POISONED_LOCK);
        self.snapshot_locked(&state)
    }

    /// Copies the current state and resets, as one atomic step.
    ///
    /// Unlike `reset()`, the next data set starts at the highest scale the taken data would
    /// have fit in, so a steady stream of similar values does not downscale all over again.
    ///
    /// Observations recorded concurrently end up either in the returned snapshot or in the
    /// fresh data set, never in both and never in neither.
    pub(crate) fn take_and_reset(&self) -> HistogramSnapshot {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

        let snapshot = self.snapshot_locked(&state);
        let next_scale = self.scale_after_reset(&state);
        Self::clear_locked(&mut state, next_scale);

        snapshot
    }

    fn snapshot_locked(&self, state: &CoreState) -> HistogramSnapshot {
        HistogramSnapshot::new(
            state.scale(),
            state.zero_count,
            self.zero_threshold,
            state.count,
            state.sum,
            state.max,
            state.buckets.offset(),
            state.buckets.counts().into(),
        )
    }

    fn downscale(state: &mut CoreState, delta: u32) {
        if delta == 0 {
            return;
        }

        let old_scale = state.scale();
        let new_scale = old_scale.saturating_sub(Scale::try_from(delta).unwrap_or(Scale::MAX));

        state.buckets.downscale(delta);
        state.provider = IndexProvider::for_scale(new_scale);

        debug!(old_scale, new_scale, delta, "downscaled histogram");
    }

    fn clear_locked(state: &mut CoreState, new_scale: Scale) {
        let old_scale = state.scale();

        state.buckets.clear();
        state.zero_count = 0;
        state.count = 0;
        state.sum = 0.0;
        state.max = 0.0;

        if new_scale != old_scale {
            state.provider = IndexProvider::for_scale(new_scale);

            debug!(old_scale, new_scale, "histogram scale changed on reset");
        }
    }

    /// The highest scale at which the data about to be taken would still have fit.
    ///
    /// Data spread over `span` buckets covers `span << k` buckets after raising the scale by
    /// `k`, so we raise by the largest `k` that stays within `max_buckets`. Without any spread
    /// to go by, we start over from the finest resolution.
    fn scale_after_reset(&self, state: &CoreState) -> Scale {
        let span = state.buckets.span();

        if span <= 1 {
            return self.max_scale;
        }

        let headroom = self
            .max_buckets
            .checked_div(span)
            .and_then(usize::checked_ilog2)
            .unwrap_or(0);

        state
            .scale()
            .saturating_add(Scale::try_from(headroom).unwrap_or(Scale::MAX))
            .min(self.max_scale)
    }
}
