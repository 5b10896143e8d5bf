//! Server-side observability: the metric families the service exports.

pub mod metrics;

pub use metrics::{ServiceMetrics, REQUEST_LABELS};
