use thiserror::Error;

use crate::Scale;

/// Errors that can occur when configuring a histogram.
///
/// Recording observations never fails - only construction validates its inputs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The maximum scale is outside the range the index mapping supports.
    #[error("max_scale {max_scale} is out of range: must be in [{min}, {max}]")]
    MaxScaleOutOfRange {
        /// The rejected value.
        max_scale: Scale,

        /// Smallest accepted value.
        min: Scale,

        /// Largest accepted value.
        max: Scale,
    },

    /// The bucket limit is too small for rescaling to ever fit all values.
    #[error("max_buckets {max_buckets} is too small: must be at least {min}")]
    TooFewBuckets {
        /// The rejected value.
        max_buckets: usize,

        /// Smallest accepted value.
        min: usize,
    },

    /// The zero threshold is not a number.
    #[error("zero_threshold must not be NaN")]
    InvalidZeroThreshold,

    /// Delta windows need a step that actually advances.
    #[error("delta window step must be at least one millisecond")]
    ZeroStep,
}

/// A specialized `Result` type for histogram configuration, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
