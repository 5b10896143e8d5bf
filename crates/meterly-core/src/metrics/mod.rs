//! Metric primitives and labelled metric vectors.
//!
//! Cells (`Counter`, `Gauge`, `Histogram`) are cheap cloneable handles over
//! shared, internally synchronized state. Vectors (`CounterVec`, ...) own one
//! family descriptor and lazily create a cell per label combination.

mod atomic;
pub mod counter;
pub mod desc;
pub mod gauge;
pub mod histogram;
pub mod vec;

pub use counter::{Counter, CounterVec};
pub use desc::{is_valid_metric_name, Desc, HistogramOpts, Opts};
pub use gauge::{Gauge, GaugeVec};
pub use histogram::{
    exponential_buckets, linear_buckets, validate_buckets, Histogram, HistogramSnapshot,
    HistogramVec, DEFAULT_BUCKETS,
};
pub use vec::MetricVec;
