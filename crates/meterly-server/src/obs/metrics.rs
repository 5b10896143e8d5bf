//! Metric families exported by the server.
//!
//! Families are declared once at startup against an explicit `Registry`;
//! a duplicate name there is a startup error.

use meterly_core::error::Result;
use meterly_core::{CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};

use crate::config::MetricsSection;

/// Labels carried by both request families. `handler` is curried per
/// endpoint; `code` and `method` are filled by the middleware.
pub const REQUEST_LABELS: [&str; 3] = ["handler", "code", "method"];

#[derive(Clone)]
pub struct ServiceMetrics {
    /// Written by the background sampler only.
    pub online_users: Gauge,
    pub requests_total: CounterVec,
    pub request_duration: HistogramVec, // seconds
}

impl ServiceMetrics {
    pub fn register(registry: &Registry, cfg: &MetricsSection) -> Result<Self> {
        let ns = &cfg.namespace;

        let online_users = GaugeVec::new(
            Opts::new(format!("{ns}_online_users"), "Online users (sampled)")
                .const_label("source", "sampler"),
            &[],
        )?;
        registry.register(online_users.clone())?;

        let requests_total = CounterVec::new(
            Opts::new(
                format!("{ns}_http_requests_total"),
                "Total number of HTTP requests handled by an instrumented endpoint",
            ),
            &REQUEST_LABELS,
        )?;
        registry.register(requests_total.clone())?;

        let mut opts = HistogramOpts::new(
            format!("{ns}_http_request_duration_seconds"),
            "Wall-clock duration of HTTP requests handled by an instrumented endpoint",
        );
        if let Some(buckets) = &cfg.buckets {
            opts = opts.buckets(buckets.clone());
        }
        let request_duration = HistogramVec::new(opts, &REQUEST_LABELS)?;
        registry.register(request_duration.clone())?;

        Ok(Self {
            online_users: online_users.with_label_values(&[])?,
            requests_total,
            request_duration,
        })
    }
}
