use std::sync::{Arc, LazyLock, Mutex};

use foldhash::HashMap;

use crate::{
    BucketIndex, ERR_POISONED_LOCK, EXPONENT_BIAS, EXPONENT_MASK, MIN_SUBNORMAL_EXPONENT, Scale,
    SIGNIFICAND_MASK, SIGNIFICAND_WIDTH,
};

/// Maps positive values to bucket indexes at one fixed [`Scale`].
///
/// The mapping is `index(v) = ceil(log2(v) * 2^scale) - 1`, evaluated so that values exactly on
/// a power-of-two boundary always land in the bucket the closed-form formula assigns them to.
/// Only the significand goes through a floating point logarithm; the binary exponent is
/// extracted from the bit pattern and contributes exactly.
///
/// Instances are immutable and shared. Use [`IndexProvider::for_scale()`] to obtain the
/// cached instance for a scale - repeated requests for the same scale return the same `Arc`.
///
/// # Example
///
/// ```
/// use base2_histogram::IndexProvider;
///
/// let provider = IndexProvider::for_scale(0);
///
/// assert_eq!(provider.index_for_value(1.0), -1);
/// assert_eq!(provider.index_for_value(1.5), 0);
/// assert_eq!(provider.index_for_value(2.0), 0);
/// ```
#[derive(Debug)]
pub struct IndexProvider {
    scale: Scale,

    /// `2^scale`, used by the logarithm path and for boundary calculations.
    scale_factor: f64,
}

static PROVIDER_CACHE: LazyLock<Mutex<HashMap<Scale, Arc<IndexProvider>>>> =
    LazyLock::new(|| Mutex::new(HashMap::default()));

impl IndexProvider {
    fn new(scale: Scale) -> Self {
        Self {
            scale,
            scale_factor: 2.0_f64.powi(scale),
        }
    }

    /// Returns the shared provider for `scale`, creating it on first use.
    ///
    /// Equal scales always yield the same instance, so callers may compare providers
    /// with [`Arc::ptr_eq()`].
    #[must_use]
    pub fn for_scale(scale: Scale) -> Arc<Self> {
        let mut cache = PROVIDER_CACHE.lock().expect(ERR_POISONED_LOCK);

        Arc::clone(
            cache
                .entry(scale)
                .or_insert_with(|| Arc::new(Self::new(scale))),
        )
    }

    /// The scale this provider maps values at.
    #[must_use]
    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Returns the bucket index of `value`.
    ///
    /// The value must be positive and finite. Callers filter out zero, negative, NaN and
    /// infinite values before asking for an index; for such inputs the result is unspecified
    /// (though it never panics).
    ///
    /// Results outside the `BucketIndex` range are clamped to its minimum or maximum.
    #[must_use]
    pub fn index_for_value(&self, value: f64) -> BucketIndex {
        debug_assert!(
            value.is_finite() && value > 0.0,
            "index requested for a value that cannot be bucketed: {value}"
        );

        let parts = Decomposed::from_value(value);

        if self.scale <= 0 {
            // For an exact power of two 2^E the formula yields E - 1, otherwise floor(log2(v)).
            // Arithmetic shift right is floor division by 2^-scale, also for negative inputs.
            let exponent = if parts.is_power_of_two {
                parts.exponent.wrapping_sub(1)
            } else {
                parts.exponent
            };

            let shift = self.scale.unsigned_abs().min(i64::BITS - 1);

            return saturate_index(exponent >> shift);
        }

        // Positive scales are bounded by configuration, so this shift does not overflow.
        let exponent_part = parts.exponent.wrapping_shl(self.scale.unsigned_abs());

        if parts.is_power_of_two {
            return saturate_index(exponent_part.wrapping_sub(1));
        }

        // log2 of a significand in (1, 2) lies in (0, 1), so after scaling the ceiling must
        // be in [1, 2^scale]. We clamp to that range so floating point error at the edges
        // can never push a value into a neighboring power-of-two range.
        let subbuckets = self.scale_factor;
        let within_exponent = (parts.significand.log2() * subbuckets)
            .ceil()
            .clamp(1.0, subbuckets);

        #[expect(
            clippy::cast_possible_truncation,
            reason = "clamped to [1, 2^scale] above, with scale bounded by configuration"
        )]
        let within_exponent = within_exponent as i64;

        saturate_index(exponent_part.wrapping_add(within_exponent).wrapping_sub(1))
    }

    /// Returns the lower boundary (exclusive) of the bucket with the given index.
    ///
    /// Bucket `index` covers `(lower_boundary(index), lower_boundary(index + 1)]`.
    /// Boundaries beyond the `f64` range are reported as `0.0` or `f64::INFINITY`.
    #[must_use]
    pub fn lower_boundary(&self, index: BucketIndex) -> f64 {
        (f64::from(index) / self.scale_factor).exp2()
    }
}

/// The parts of a positive finite `f64` that the index mapping needs.
#[derive(Debug)]
struct Decomposed {
    /// Unbiased binary exponent, so that `value = 2^exponent * significand`.
    exponent: i64,

    /// Normalized significand in `[1, 2)`.
    significand: f64,

    is_power_of_two: bool,
}

impl Decomposed {
    fn from_value(value: f64) -> Self {
        let bits = value.to_bits();
        let raw_exponent = (bits & EXPONENT_MASK) >> SIGNIFICAND_WIDTH;
        let fraction = bits & SIGNIFICAND_MASK;

        if raw_exponent == 0 {
            // Subnormal: value = fraction * 2^-1074, with no implicit leading bit.
            // We renormalize so the highest set bit becomes the implicit one.
            let highest_bit = (u64::BITS - 1).saturating_sub(fraction.leading_zeros());
            let shift = SIGNIFICAND_WIDTH.saturating_sub(highest_bit);

            return Self {
                exponent: MIN_SUBNORMAL_EXPONENT.wrapping_add(i64::from(highest_bit)),
                significand: significand_from_fraction(
                    fraction.wrapping_shl(shift) & SIGNIFICAND_MASK,
                ),
                is_power_of_two: fraction.is_power_of_two(),
            };
        }

        #[expect(
            clippy::cast_possible_wrap,
            reason = "masked to 11 bits, always fits"
        )]
        let exponent = (raw_exponent as i64).wrapping_sub(EXPONENT_BIAS);

        Self {
            exponent,
            significand: significand_from_fraction(fraction),
            is_power_of_two: fraction == 0,
        }
    }
}

/// Builds the `f64` in `[1, 2)` that has the given fraction bits.
fn significand_from_fraction(fraction: u64) -> f64 {
    #[expect(
        clippy::cast_sign_loss,
        reason = "the bias is a small positive constant"
    )]
    let biased_zero_exponent = (EXPONENT_BIAS as u64) << SIGNIFICAND_WIDTH;

    f64::from_bits(biased_zero_exponent | fraction)
}

fn saturate_index(index: i64) -> BucketIndex {
    BucketIndex::try_from(index).unwrap_or(if index < 0 {
        BucketIndex::MIN
    } else {
        BucketIndex::MAX
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(IndexProvider: Send, Sync);

    /// Exact `2^exponent`, including the subnormal range where `powi()` underflows.
    fn power_of_two(exponent: i32) -> f64 {
        if exponent >= -1022 {
            f64::from_bits(u64::try_from(exponent + 1023).unwrap() << 52)
        } else {
            f64::from_bits(1_u64 << (exponent + 1074))
        }
    }

    /// Closed-form index of `2^exponent`, written with Euclidean division instead of shifts.
    fn power_of_two_index(exponent: i64, scale: Scale) -> i64 {
        if scale >= 0 {
            exponent * (1_i64 << scale) - 1
        } else {
            (exponent - 1).div_euclid(1_i64 << scale.unsigned_abs())
        }
    }

    #[test]
    fn scale_zero_examples() {
        let provider = IndexProvider::for_scale(0);

        assert_eq!(provider.index_for_value(1.0), -1);
        assert_eq!(provider.index_for_value(1.5), 0);
        assert_eq!(provider.index_for_value(2.0), 0);
        assert_eq!(provider.index_for_value(2.5), 1);
        assert_eq!(provider.index_for_value(0.5), -2);
    }

    #[test]
    fn negative_scale_examples() {
        let provider = IndexProvider::for_scale(-1);

        assert_eq!(provider.index_for_value(4.0), 0);
        assert_eq!(provider.index_for_value(4.1), 1);
        assert_eq!(provider.index_for_value(1.0), -1);
        assert_eq!(provider.index_for_value(16.0), 1);
        assert_eq!(provider.index_for_value(16.5), 2);
    }

    #[test]
    fn positive_scale_examples() {
        let provider = IndexProvider::for_scale(10);

        assert_eq!(provider.index_for_value(1.0001), 0);
        assert_eq!(provider.index_for_value(1.0008), 1);
        assert_eq!(provider.index_for_value(1.0076), 11);
        assert_eq!(provider.index_for_value(1.008), 11);
        assert_eq!(provider.index_for_value(2.0), 1023);
        assert_eq!(provider.index_for_value(0.05), -4426);
        assert_eq!(provider.index_for_value(0.09), -3558);
    }

    #[test]
    fn every_power_of_two_matches_closed_form() {
        for scale in -2..=10 {
            let provider = IndexProvider::for_scale(scale);

            for exponent in -1074_i32..=1023 {
                let value = power_of_two(exponent);
                assert!(value > 0.0);

                let expected = power_of_two_index(i64::from(exponent), scale);
                assert_eq!(
                    i64::from(provider.index_for_value(value)),
                    expected,
                    "2^{exponent} at scale {scale}"
                );
            }
        }
    }

    #[test]
    fn extreme_values_match_closed_form() {
        for scale in -2..=10 {
            let provider = IndexProvider::for_scale(scale);

            // MIN_POSITIVE is the smallest normal value, 2^-1022.
            assert_eq!(
                i64::from(provider.index_for_value(f64::MIN_POSITIVE)),
                power_of_two_index(-1022, scale)
            );

            // The smallest subnormal value, 2^-1074.
            assert_eq!(
                i64::from(provider.index_for_value(f64::from_bits(1))),
                power_of_two_index(-1074, scale)
            );

            // f64::MAX is just below 2^1024, so it lands in the last bucket before 2^1024.
            assert_eq!(
                i64::from(provider.index_for_value(f64::MAX)),
                power_of_two_index(1024, scale)
            );
        }
    }

    #[test]
    fn subnormal_non_power_of_two() {
        let provider = IndexProvider::for_scale(0);

        // 3 * 2^-1074 lies in (2^-1073, 2^-1072].
        assert_eq!(provider.index_for_value(f64::from_bits(3)), -1073);
    }

    #[test]
    fn index_is_monotonic_in_value() {
        for scale in [-3, 0, 3, 10, 20] {
            let provider = IndexProvider::for_scale(scale);

            let mut previous = BucketIndex::MIN;
            let mut value = 1e-9;

            while value < 1e12 {
                let index = provider.index_for_value(value);
                assert!(index >= previous, "{value} at scale {scale}");
                previous = index;
                value *= 1.013;
            }
        }
    }

    #[test]
    fn lower_scale_index_is_shifted_higher_scale_index() {
        let mut value = 1e-6;

        while value < 1e9 {
            for scale in -3..=6 {
                let fine = IndexProvider::for_scale(scale).index_for_value(value);
                let coarse = IndexProvider::for_scale(scale - 1).index_for_value(value);

                assert_eq!(fine >> 1, coarse, "{value} at scale {scale}");
            }

            value *= 1.37;
        }
    }

    #[test]
    fn cache_returns_same_instance_for_same_scale() {
        let a = IndexProvider::for_scale(7);
        let b = IndexProvider::for_scale(7);
        let c = IndexProvider::for_scale(6);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a.scale(), 7);
        assert_eq!(c.scale(), 6);
    }

    #[test]
    fn lower_boundary_brackets_value() {
        for scale in [-2, 0, 4, 10] {
            let provider = IndexProvider::for_scale(scale);

            for value in [0.003, 1.0001, 3.7, 512.5, 65537.0] {
                let index = provider.index_for_value(value);

                let lower = provider.lower_boundary(index);
                let upper = provider.lower_boundary(index + 1);

                // Tolerate one ulp-ish of error from exp2 at the edges.
                assert!(lower <= value * (1.0 + 1e-12), "{value} at scale {scale}");
                assert!(upper >= value * (1.0 - 1e-12), "{value} at scale {scale}");
            }
        }
    }

    #[test]
    fn lower_boundary_of_power_of_two_buckets() {
        let provider = IndexProvider::for_scale(0);

        assert!((provider.lower_boundary(0) - 1.0).abs() < f64::EPSILON);
        assert!((provider.lower_boundary(3) - 8.0).abs() < f64::EPSILON);
        assert!((provider.lower_boundary(-1) - 0.5).abs() < f64::EPSILON);
    }
}
