/// Resolution of an exponential histogram.
///
/// Bucket boundaries are powers of the base `2^(2^-scale)`. A larger scale means narrower
/// buckets, so finer resolution at the cost of more buckets for the same range of values.
pub type Scale = i32;

/// Identifies one exponential bucket at a given [`Scale`].
///
/// Bucket `i` covers the value range `(base^i, base^(i+1)]`.
pub type BucketIndex = i32;
