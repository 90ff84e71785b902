#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adaptive base-2 exponential histograms.
//!
//! An exponential histogram summarizes an unbounded stream of non-negative observations
//! (latencies, sizes, ...) in a bounded number of exponentially sized buckets. At scale `s`,
//! bucket `i` covers the values in `(base^i, base^(i+1)]` where `base = 2^(2^-s)`, so each
//! bucket is wider than the previous one by a constant factor.
//!
//! The histograms in this crate pick their scale automatically. They start at the finest
//! configured resolution and, whenever the observed values would need more than the
//! configured number of buckets, merge neighboring buckets and continue at a coarser scale.
//! Memory use is therefore fixed no matter how widely the values are spread.
//!
//! # Temporality
//!
//! Two reporting styles are available:
//!
//! * [`CumulativeWindow`] accumulates observations until explicitly reset. Every snapshot
//!   includes everything recorded since the start (or the last reset).
//! * [`DeltaWindow`] divides time into fixed-length steps and only ever reports the most
//!   recent step that has fully elapsed. The step currently being filled is never visible.
//!
//! [`ExponentialHistogram`] wraps either one if the choice is made at runtime.
//!
//! # Example
//!
//! ```
//! use base2_histogram::ExponentialHistogram;
//!
//! let histogram = ExponentialHistogram::builder()
//!     .max_scale(10)
//!     .max_buckets(16)
//!     .build_cumulative()
//!     .unwrap();
//!
//! histogram.record_double(1.0001);
//! assert_eq!(histogram.scale(), 10);
//!
//! // 512 is too far from 1.0001 to fit into 16 buckets at scale 10.
//! histogram.record_double(512.0);
//! assert_eq!(histogram.scale(), 0);
//!
//! let snapshot = histogram.take_snapshot();
//!
//! for (upper_bound, count) in snapshot.buckets() {
//!     println!("<= {upper_bound}: {count}");
//! }
//!
//! // Or just let the snapshot render itself.
//! println!("{snapshot}");
//! ```
//!
//! # Durations
//!
//! If a [`TimeUnit`] is configured, `record_long()` accepts nanoseconds and
//! `record_duration()` accepts a [`Duration`][std::time::Duration], both converted to that
//! unit before recording. The zero threshold is configured in nanoseconds as well. All
//! reported values, the zero threshold included, are in that unit.
//!
//! # Thread safety
//!
//! All histogram types are `Send + Sync` and can be shared between threads, e.g. via `Arc`.
//! Recording and snapshotting may happen concurrently. Every snapshot reflects a consistent
//! state: each observation is either fully included or not at all.

mod bucket_counts;
mod clock;
mod constants;
mod cumulative_window;
mod data_types;
mod delta_window;
mod error;
mod exponential_histogram;
mod histogram_builder;
mod histogram_core;
mod histogram_snapshot;
mod index_provider;
mod time_unit;

pub use clock::*;
pub use constants::*;
pub use cumulative_window::*;
pub use data_types::*;
pub use delta_window::*;
pub use error::*;
pub use exponential_histogram::*;
pub use histogram_builder::*;
pub(crate) use histogram_core::*;
pub use histogram_snapshot::*;
pub use index_provider::*;
pub use time_unit::*;
