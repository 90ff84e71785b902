use std::iter;

use crate::BucketIndex;

/// Dense per-bucket counts for a contiguous range of bucket indexes.
///
/// `counts[0]` holds the count of bucket `offset`, `counts[1]` of bucket `offset + 1` and so on.
/// The range only ever covers `[min populated index, max populated index]` - gaps in between
/// are stored as zero. The range never grows beyond `max_buckets` entries; an insertion that
/// would require more is refused and the owner is expected to downscale first.
#[derive(Debug)]
pub(crate) struct BucketCounts {
    offset: BucketIndex,
    counts: Vec<u64>,
    max_buckets: usize,
}

impl BucketCounts {
    pub(crate) fn new(max_buckets: usize) -> Self {
        Self {
            offset: 0,
            counts: Vec::with_capacity(max_buckets),
            max_buckets,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Smallest populated index, or 0 if empty.
    pub(crate) fn offset(&self) -> BucketIndex {
        self.offset
    }

    /// Counts for `[offset, offset + len)`, in index order.
    pub(crate) fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of buckets between the smallest and largest populated index, inclusive.
    pub(crate) fn span(&self) -> usize {
        self.counts.len()
    }

    pub(crate) fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0_u64, |total, count| total.wrapping_add(*count))
    }

    fn end_index(&self) -> i64 {
        i64::from(self.offset)
            .wrapping_add(i64::try_from(self.counts.len()).unwrap_or(i64::MAX))
            .wrapping_sub(1)
    }

    /// Adds `count` to the bucket at `index`.
    ///
    /// Returns `false` without changing anything if covering `index` would take the
    /// populated range beyond `max_buckets`.
    pub(crate) fn try_increment(&mut self, index: BucketIndex, count: u64) -> bool {
        if self.counts.is_empty() {
            self.offset = index;
            self.counts.push(count);
            return true;
        }

        if span_of(
            i64::from(index).min(i64::from(self.offset)),
            i64::from(index).max(self.end_index()),
        ) > self.max_buckets_i64()
        {
            return false;
        }

        if index < self.offset {
            let missing = usize::try_from(i64::from(self.offset).wrapping_sub(i64::from(index)))
                .expect("guarded by max_buckets check above");

            self.counts.splice(0..0, iter::repeat_n(0, missing));
            self.offset = index;
        } else if i64::from(index) > self.end_index() {
            let new_len = usize::try_from(
                i64::from(index)
                    .wrapping_sub(i64::from(self.offset))
                    .wrapping_add(1),
            )
            .expect("guarded by max_buckets check above");

            self.counts.resize(new_len, 0);
        }

        let position = usize::try_from(i64::from(index).wrapping_sub(i64::from(self.offset)))
            .expect("index is within the populated range after the resize above");

        let slot = self
            .counts
            .get_mut(position)
            .expect("index is within the populated range after the resize above");

        *slot = slot.wrapping_add(count);

        true
    }

    /// The smallest number of times the indexes must be halved (merging pairs of adjacent
    /// buckets each time) so that both the existing range and `index` fit into `max_buckets`.
    pub(crate) fn downscale_needed_for(&self, index: BucketIndex) -> u32 {
        if self.counts.is_empty() {
            return 0;
        }

        let mut low = i64::from(index).min(i64::from(self.offset));
        let mut high = i64::from(index).max(self.end_index());

        let mut delta = 0;

        // Converges because with max_buckets >= 2 every range eventually collapses to {-1, 0}
        // or a single index.
        while span_of(low, high) > self.max_buckets_i64() {
            low >>= 1;
            high >>= 1;
            delta += 1;
        }

        delta
    }

    /// Merges buckets so that every index `i` becomes `i >> delta`.
    pub(crate) fn downscale(&mut self, delta: u32) {
        if delta == 0 || self.counts.is_empty() {
            return;
        }

        let new_offset = shift_index(self.offset, delta);
        let new_end = shift_index(
            BucketIndex::try_from(self.end_index()).unwrap_or(BucketIndex::MAX),
            delta,
        );

        let new_len = usize::try_from(span_of(i64::from(new_offset), i64::from(new_end)))
            .expect("a downscaled range is never larger than the original range");

        let mut merged = Vec::with_capacity(self.max_buckets);
        merged.resize(new_len, 0_u64);

        let mut index = self.offset;

        for &count in &self.counts {
            let position = usize::try_from(
                i64::from(shift_index(index, delta)).wrapping_sub(i64::from(new_offset)),
            )
            .expect("every shifted index lies within the shifted range");

            let slot = merged
                .get_mut(position)
                .expect("every shifted index lies within the shifted range");

            *slot = slot.wrapping_add(count);

            index = index.wrapping_add(1);
        }

        self.offset = new_offset;
        self.counts = merged;
    }

    /// Removes all counts, keeping the allocation for reuse.
    pub(crate) fn clear(&mut self) {
        self.counts.clear();
        self.offset = 0;
    }

    fn max_buckets_i64(&self) -> i64 {
        i64::try_from(self.max_buckets).unwrap_or(i64::MAX)
    }
}

/// Number of indexes in `[low, high]`.
fn span_of(low: i64, high: i64) -> i64 {
    high.wrapping_sub(low).wrapping_add(1)
}

/// Maps an index to the index of the bucket that contains it after halving resolution
/// `delta` times.
pub(crate) fn shift_index(index: BucketIndex, delta: u32) -> BucketIndex {
    index
        .checked_shr(delta)
        .unwrap_or(if index < 0 { -1 } else { 0 })
}
