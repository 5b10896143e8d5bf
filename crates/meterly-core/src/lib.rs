//! meterly core: metric primitives, labelled metric vectors, the registry,
//! and the text exposition encoder.
//!
//! This crate carries no transport or runtime dependencies so the same
//! registry can back an HTTP endpoint, a test harness, or a CLI dump.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Metric mutation happens on request paths, so every fallible operation
//! surfaces as `MeterlyError`/`Result` instead of taking the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod encode;
pub mod error;
pub mod metrics;
pub mod registry;

/// Shared result type.
pub use error::{ErrorCode, MeterlyError, Result};
pub use metrics::{
    exponential_buckets, linear_buckets, Counter, CounterVec, Gauge, GaugeVec, Histogram,
    HistogramOpts, HistogramSnapshot, HistogramVec, Opts, DEFAULT_BUCKETS,
};
pub use registry::{Collector, MetricFamily, MetricKind, Registry, Sample, SampleValue};
