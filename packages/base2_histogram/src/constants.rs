use std::time::Duration;

use crate::Scale;

// A poisoned lock means some thread panicked in the middle of updating histogram state.
pub(crate) const ERR_POISONED_LOCK: &str = "encountered poisoned lock - histogram state may be \
    internally inconsistent and cannot be safely read or updated";

/// The finest resolution we accept as `max_scale`.
///
/// At scale 20 the full range of finite `f64` values maps to bucket indexes that still fit
/// comfortably into a `BucketIndex`.
pub const MAX_SUPPORTED_SCALE: Scale = 20;

/// The coarsest resolution we accept as `max_scale`.
///
/// At this scale every normal `f64` maps to one of two buckets.
pub const MIN_SUPPORTED_SCALE: Scale = -10;

/// The smallest `max_buckets` that allows rescaling to converge for any input.
pub const MIN_MAX_BUCKETS: usize = 2;

pub(crate) const DEFAULT_MAX_SCALE: Scale = 20;
pub(crate) const DEFAULT_MAX_BUCKETS: usize = 160;
pub(crate) const DEFAULT_ZERO_THRESHOLD: f64 = 0.0;
pub(crate) const DEFAULT_STEP: Duration = Duration::from_secs(60);

/// Width of the `f64` significand in bits, excluding the implicit leading bit.
pub(crate) const SIGNIFICAND_WIDTH: u32 = 52;
pub(crate) const SIGNIFICAND_MASK: u64 = (1 << SIGNIFICAND_WIDTH) - 1;
pub(crate) const EXPONENT_MASK: u64 = 0x7FF << SIGNIFICAND_WIDTH;
pub(crate) const EXPONENT_BIAS: i64 = 1023;

/// Unbiased exponent of the smallest positive subnormal `f64` (`2^-1074`).
pub(crate) const MIN_SUBNORMAL_EXPONENT: i64 = -1074;
