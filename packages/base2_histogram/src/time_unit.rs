use std::fmt::{self, Display};

/// The unit a duration-recording histogram stores its values in.
///
/// Durations are always supplied in nanoseconds (see `record_long()` on the histogram types)
/// and divided down to this unit before they are bucketed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum TimeUnit {
    /// Values are stored as nanoseconds (no conversion).
    Nanoseconds,
    /// Values are stored as microseconds.
    Microseconds,
    /// Values are stored as milliseconds.
    Milliseconds,
    /// Values are stored as seconds.
    Seconds,
    /// Values are stored as minutes.
    Minutes,
    /// Values are stored as hours.
    Hours,
    /// Values are stored as days.
    Days,
}

impl TimeUnit {
    fn nanos_per_unit(self) -> f64 {
        match self {
            Self::Nanoseconds => 1.0,
            Self::Microseconds => 1e3,
            Self::Milliseconds => 1e6,
            Self::Seconds => 1e9,
            Self::Minutes => 60e9,
            Self::Hours => 3_600e9,
            Self::Days => 86_400e9,
        }
    }

    /// Converts a nanosecond amount into this unit.
    #[must_use]
    pub fn from_nanos(self, nanos: f64) -> f64 {
        match self {
            Self::Nanoseconds => nanos,
            _ => nanos / self.nanos_per_unit(),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "us",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "min",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }
}

/// Formats the unit as its short suffix, e.g. `ms`.
impl Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::float_cmp, reason = "conversions of round numbers are exact")]

    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(TimeUnit::Nanoseconds.from_nanos(1234.0), 1234.0);
        assert_eq!(TimeUnit::Microseconds.from_nanos(2_000.0), 2.0);
        assert_eq!(TimeUnit::Milliseconds.from_nanos(2_000_000.0), 2.0);
        assert_eq!(TimeUnit::Seconds.from_nanos(50_000_000.0), 0.05);
        assert_eq!(TimeUnit::Minutes.from_nanos(120e9), 2.0);
        assert_eq!(TimeUnit::Hours.from_nanos(7_200e9), 2.0);
        assert_eq!(TimeUnit::Days.from_nanos(86_400e9), 1.0);
    }

    #[test]
    fn display_uses_suffix() {
        assert_eq!(TimeUnit::Milliseconds.to_string(), "ms");
        assert_eq!(TimeUnit::Seconds.to_string(), "s");
    }
}
