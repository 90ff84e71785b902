use std::cmp;
use std::fmt::{self, Display, Write};
use std::num::NonZero;

use crate::{BucketIndex, IndexProvider, Scale};

/// An immutable point-in-time copy of the state of an exponential histogram.
///
/// Snapshots are produced on demand by the histogram windows and never change afterwards,
/// so they can be handed to an exporter on another thread without any synchronization.
///
/// The bucket counts are dense: `bucket_counts()[i]` is the count of bucket index
/// `offset() + i`, covering the value range `(base^(offset + i), base^(offset + i + 1)]`
/// where `base = 2^(2^-scale)`. Observations at or below the zero threshold are not in any
/// bucket - they are tallied in `zero_count()`.
///
/// For human-readable output, use the `Display` trait implementation.
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramSnapshot {
    scale: Scale,

    zero_count: u64,
    zero_threshold: f64,

    /// All accepted observations, including those in the zero bucket.
    count: u64,
    sum: f64,

    // 0.0 if there are no observations.
    max: f64,

    // 0 if there are no populated buckets.
    offset: BucketIndex,
    bucket_counts: Box<[u64]>,
}

impl HistogramSnapshot {
    #[expect(
        clippy::too_many_arguments,
        reason = "plain data carrier, only constructed by the histogram core"
    )]
    pub(crate) fn new(
        scale: Scale,
        zero_count: u64,
        zero_threshold: f64,
        count: u64,
        sum: f64,
        max: f64,
        offset: BucketIndex,
        bucket_counts: Box<[u64]>,
    ) -> Self {
        Self {
            scale,
            zero_count,
            zero_threshold,
            count,
            sum,
            max,
            offset,
            bucket_counts,
        }
    }

    /// A snapshot of a histogram that has not observed anything.
    ///
    /// # Example
    ///
    /// ```
    /// use base2_histogram::HistogramSnapshot;
    ///
    /// let snapshot = HistogramSnapshot::empty(10, 0.0);
    ///
    /// assert!(snapshot.is_empty());
    /// assert_eq!(snapshot.scale(), 10);
    /// assert_eq!(snapshot.offset(), 0);
    /// ```
    #[must_use]
    pub fn empty(scale: Scale, zero_threshold: f64) -> Self {
        Self::new(scale, 0, zero_threshold, 0, 0.0, 0.0, 0, Box::default())
    }

    /// Creates a snapshot with arbitrary data for testing exporters.
    ///
    /// Only available with the `test-util` feature. No consistency between the
    /// fields is enforced.
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn fake(
        scale: Scale,
        zero_count: u64,
        offset: BucketIndex,
        bucket_counts: Vec<u64>,
        sum: f64,
    ) -> Self {
        let count = bucket_counts
            .iter()
            .fold(zero_count, |total, count| total.wrapping_add(*count));

        Self::new(
            scale,
            zero_count,
            0.0,
            count,
            sum,
            0.0,
            offset,
            bucket_counts.into_boxed_slice(),
        )
    }

    /// The resolution the buckets were recorded at.
    #[must_use]
    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Number of observations at or below the zero threshold.
    #[must_use]
    pub fn zero_count(&self) -> u64 {
        self.zero_count
    }

    /// Observations at or below this value are counted in `zero_count()`.
    #[must_use]
    pub fn zero_threshold(&self) -> f64 {
        self.zero_threshold
    }

    /// Total number of accepted observations, including the zero bucket.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of all accepted observations.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Largest accepted observation, or 0.0 if there are none.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// The bucket index of the first entry in `bucket_counts()`.
    #[must_use]
    pub fn offset(&self) -> BucketIndex {
        self.offset
    }

    /// Dense counts of consecutive buckets, starting at bucket index `offset()`.
    #[must_use]
    pub fn bucket_counts(&self) -> &[u64] {
        &self.bucket_counts
    }

    /// Whether the snapshot contains no observations at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sum of the counts of all buckets, excluding the zero bucket.
    #[must_use]
    pub fn bucket_total(&self) -> u64 {
        self.bucket_counts
            .iter()
            .fold(0_u64, |total, count| total.wrapping_add(*count))
    }

    /// Iterates over the buckets as `(index, count)` pairs, in ascending index order.
    pub fn indexed_buckets(&self) -> impl Iterator<Item = (BucketIndex, u64)> {
        (self.offset..).zip(self.bucket_counts.iter().copied())
    }

    /// Iterates over the buckets as `(upper_bound, count)` pairs, in ascending order.
    ///
    /// Each bucket counts the observations greater than the previous bucket's upper bound
    /// and less than or equal to its own.
    pub fn buckets(&self) -> impl Iterator<Item = (f64, u64)> {
        let provider = IndexProvider::for_scale(self.scale);

        self.indexed_buckets().map(move |(index, count)| {
            (provider.lower_boundary(index.saturating_add(1)), count)
        })
    }
}

/// We auto-scale histogram bars when rendering the snapshot. This is the number of characters
/// that we use to represent the maximum bucket value in the histogram.
///
/// Due to aliasing effects (have to assign at least 1 item per character), the width may
/// exceed this for histograms with very small bucket values.
const HISTOGRAM_BAR_WIDTH_CHARS: u64 = 50;

const HISTOGRAM_BAR_CHAR: char = '∎';

impl Display for HistogramSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            // If there is no recorded data, we just report a flat zero no questions asked.
            writeln!(f, "0 (scale {})", self.scale)?;
            return Ok(());
        }

        writeln!(
            f,
            "{}; sum {}; max {}; scale {}",
            self.count, self.sum, self.max, self.scale
        )?;

        let rows = rows(self);

        // Padding is derived from the widest rendered bound and count.
        let widest_bound = rows.iter().map(|row| row.0.len()).max().unwrap_or(0);
        let widest_count = rows.iter().map(|row| row.1.len()).max().unwrap_or(0);

        let bar_scale = BarScale::new(rows.iter().map(|row| row.2));

        for (bound, count_str, count) in &rows {
            write!(
                f,
                "value <= {bound:>widest_bound$} [ {count_str:>widest_count$} ]: "
            )?;
            bar_scale.write_bar(*count, f)?;
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Pre-rendered `(upper bound, count, raw count)` for every line of the rendered histogram,
/// starting with the zero bucket.
fn rows(snapshot: &HistogramSnapshot) -> Vec<(String, String, u64)> {
    let mut rows = Vec::with_capacity(snapshot.bucket_counts.len().saturating_add(1));

    let mut push = |bound: f64, count: u64| {
        let mut bound_str = String::new();
        write!(&mut bound_str, "{bound:.6}")
            .expect("we expect writing a float to String to be infallible");

        rows.push((bound_str, count.to_string(), count));
    };

    push(snapshot.zero_threshold, snapshot.zero_count);

    for (upper_bound, count) in snapshot.buckets() {
        push(upper_bound, count);
    }

    rows
}

/// Auto-scaling logic of the histogram bars, identifying the step size for rendering.
#[derive(Debug)]
struct BarScale {
    /// The number of observations that each character in the bar represents.
    count_per_char: NonZero<u64>,
}

impl BarScale {
    fn new(counts: impl Iterator<Item = u64>) -> Self {
        let max_count = counts.max().unwrap_or(0);

        #[expect(
            clippy::integer_division,
            reason = "we accept the loss of precision here - the bar might not always reach 100% of desired width or even overshoot it"
        )]
        let count_per_char = NonZero::new(cmp::max(max_count / HISTOGRAM_BAR_WIDTH_CHARS, 1))
            .expect("guarded by max()");

        Self { count_per_char }
    }

    fn write_bar(&self, count: u64, f: &mut impl Write) -> fmt::Result {
        let width = count
            .checked_div(self.count_per_char.get())
            .expect("division by zero impossible - divisor is NonZero");

        for _ in 0..width {
            f.write_char(HISTOGRAM_BAR_CHAR)?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::float_cmp, reason = "exact values are constructed by the tests")]
    #![allow(clippy::indexing_slicing, reason = "panic is fine in tests")]

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(HistogramSnapshot: Send, Sync, Clone);

    #[test]
    fn empty_snapshot_has_no_data() {
        let snapshot = HistogramSnapshot::empty(-3, 0.5);

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.scale(), -3);
        assert_eq!(snapshot.zero_threshold(), 0.5);
        assert_eq!(snapshot.zero_count(), 0);
        assert_eq!(snapshot.count(), 0);
        assert_eq!(snapshot.sum(), 0.0);
        assert_eq!(snapshot.max(), 0.0);
        assert_eq!(snapshot.offset(), 0);
        assert!(snapshot.bucket_counts().is_empty());
        assert_eq!(snapshot.buckets().count(), 0);
    }

    #[test]
    fn fake_derives_count_from_buckets() {
        let snapshot = HistogramSnapshot::fake(0, 2, 3, vec![1, 0, 4], 100.0);

        assert_eq!(snapshot.count(), 7);
        assert_eq!(snapshot.bucket_total(), 5);
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn indexed_buckets_start_at_offset() {
        let snapshot = HistogramSnapshot::fake(0, 0, -2, vec![1, 0, 4], 0.0);

        let buckets = snapshot.indexed_buckets().collect::<Vec<_>>();

        assert_eq!(buckets, vec![(-2, 1), (-1, 0), (0, 4)]);
    }

    #[test]
    fn bucket_upper_bounds_at_scale_zero() {
        let snapshot = HistogramSnapshot::fake(0, 0, 0, vec![1, 2, 3], 0.0);

        let buckets = snapshot.buckets().collect::<Vec<_>>();

        // Bucket i at scale 0 covers (2^i, 2^(i+1)].
        assert_eq!(buckets, vec![(2.0, 1), (4.0, 2), (8.0, 3)]);
    }

    #[test]
    fn bucket_upper_bounds_at_negative_scale() {
        let snapshot = HistogramSnapshot::fake(-1, 0, 0, vec![1, 1], 0.0);

        let buckets = snapshot.buckets().collect::<Vec<_>>();

        // Bucket i at scale -1 covers (4^i, 4^(i+1)].
        assert_eq!(buckets, vec![(4.0, 1), (16.0, 1)]);
    }

    #[test]
    fn display_empty() {
        let snapshot = HistogramSnapshot::empty(10, 0.0);

        assert_eq!(snapshot.to_string(), "0 (scale 10)\n");
    }

    #[test]
    fn display_renders_every_bucket() {
        let snapshot = HistogramSnapshot::fake(0, 1, 0, vec![3, 0, 100], 512.0);

        let rendered = snapshot.to_string();
        let lines = rendered.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("104; sum 512"));
        assert!(lines[1].contains("[   1 ]"));
        assert!(lines[2].contains("2.000000"));
        assert!(lines[2].contains("[   3 ]"));
        assert!(lines[4].contains("8.000000"));
        assert!(lines[4].contains("[ 100 ]"));

        // 100 is the maximum, so with 50 chars of width each char represents 2 observations.
        assert_eq!(lines[4].matches(HISTOGRAM_BAR_CHAR).count(), 50);
        assert_eq!(lines[2].matches(HISTOGRAM_BAR_CHAR).count(), 1);
        assert_eq!(lines[3].matches(HISTOGRAM_BAR_CHAR).count(), 0);
    }

    #[test]
    fn snapshots_compare_by_value() {
        let a = HistogramSnapshot::fake(2, 0, 5, vec![1, 2], 3.0);
        let b = a.clone();

        assert_eq!(a, b);
        assert_ne!(a, HistogramSnapshot::empty(2, 0.0));
    }
}
