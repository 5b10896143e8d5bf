//! Fixed-bucket histograms.
//!
//! Each cell keeps cumulative bucket counts, the running sum, and the total
//! count behind a single `parking_lot::Mutex`, so an observation is applied as
//! a whole and a snapshot never sees a half-counted value.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{MeterlyError, Result};
use crate::registry::{MetricKind, SampleValue};

use super::desc::{Desc, HistogramOpts};
use super::vec::{Metric, MetricVec};

/// Default latency buckets, in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// `count` buckets starting at `start`, each `width` wide.
pub fn linear_buckets(start: f64, width: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(MeterlyError::InvalidBuckets("count must be positive".into()));
    }
    if !width.is_finite() || width <= 0.0 {
        return Err(MeterlyError::InvalidBuckets(format!(
            "width must be positive, got {width}"
        )));
    }
    Ok((0..count).map(|i| start + width * i as f64).collect())
}

/// `count` buckets starting at `start`, each `factor` times the previous.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(MeterlyError::InvalidBuckets("count must be positive".into()));
    }
    if !start.is_finite() || start <= 0.0 {
        return Err(MeterlyError::InvalidBuckets(format!(
            "start must be positive, got {start}"
        )));
    }
    if !factor.is_finite() || factor <= 1.0 {
        return Err(MeterlyError::InvalidBuckets(format!(
            "factor must be greater than 1, got {factor}"
        )));
    }
    let mut next = start;
    Ok((0..count)
        .map(|_| {
            let b = next;
            next *= factor;
            b
        })
        .collect())
}

/// Strips a trailing `+Inf` (always implicit) and checks the rest is finite and
/// strictly increasing.
pub fn validate_buckets(buckets: &[f64]) -> Result<Vec<f64>> {
    let mut out = buckets.to_vec();
    if out.last() == Some(&f64::INFINITY) {
        out.pop();
    }
    if let Some(bad) = out.iter().find(|b| !b.is_finite()) {
        return Err(MeterlyError::InvalidBuckets(format!(
            "bucket bounds must be finite, got {bad}"
        )));
    }
    if out.windows(2).any(|w| w[0] >= w[1]) {
        return Err(MeterlyError::InvalidBuckets(
            "bucket bounds must be strictly increasing".into(),
        ));
    }
    Ok(out)
}

#[derive(Debug)]
struct HistogramState {
    /// Cumulative: `buckets[i]` counts observations `<= upper_bounds[i]`.
    buckets: Vec<u64>,
    sum: f64,
    count: u64,
}

#[derive(Debug)]
struct HistogramCore {
    upper_bounds: Arc<[f64]>,
    state: Mutex<HistogramState>,
}

/// Point-in-time copy of one histogram cell.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// (upper bound, cumulative count), excluding `+Inf`.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    /// Also the `+Inf` bucket count.
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct Histogram {
    core: Arc<HistogramCore>,
}

impl Histogram {
    pub(crate) fn with_bounds(upper_bounds: Arc<[f64]>) -> Self {
        let n = upper_bounds.len();
        Self {
            core: Arc::new(HistogramCore {
                upper_bounds,
                state: Mutex::new(HistogramState {
                    buckets: vec![0; n],
                    sum: 0.0,
                    count: 0,
                }),
            }),
        }
    }

    /// Standalone histogram (not part of a family).
    pub fn new(buckets: &[f64]) -> Result<Self> {
        let bounds = validate_buckets(buckets)?;
        Ok(Self::with_bounds(bounds.into()))
    }

    pub fn observe(&self, v: f64) {
        if v.is_nan() {
            tracing::warn!("histogram observation is NaN; dropped");
            return;
        }
        let bounds = &self.core.upper_bounds;
        let mut st = self.core.state.lock();
        // Cumulative Buckets: increment every bucket whose bound is >= value
        for (i, &b) in bounds.iter().enumerate() {
            if v <= b {
                st.buckets[i] += 1;
            }
        }
        st.count += 1;
        st.sum += v;
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let st = self.core.state.lock();
        HistogramSnapshot {
            buckets: self
                .core
                .upper_bounds
                .iter()
                .copied()
                .zip(st.buckets.iter().copied())
                .collect(),
            sum: st.sum,
            count: st.count,
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.core.state.lock().count
    }

    pub fn sample_sum(&self) -> f64 {
        self.core.state.lock().sum
    }
}

impl Metric for Histogram {
    fn sample_value(&self) -> SampleValue {
        SampleValue::Histogram(self.snapshot())
    }
}

pub type HistogramVec = MetricVec<Histogram>;

impl MetricVec<Histogram> {
    pub fn new(opts: HistogramOpts, label_names: &[&str]) -> Result<Self> {
        let bounds: Arc<[f64]> = opts.validated_buckets()?.into();
        let desc = Desc::new(opts.common, label_names)?;
        if desc.has_label("le") {
            return Err(MeterlyError::InvalidDescriptor(format!(
                "{}: histogram cannot use reserved label \"le\"",
                desc.name
            )));
        }
        Ok(Self::from_parts(desc, MetricKind::Histogram, move || {
            Histogram::with_bounds(Arc::clone(&bounds))
        }))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn observe_fills_cumulative_buckets() {
        let h = Histogram::new(&[1.0, 2.0, 5.0]).unwrap();
        for v in [0.5, 1.0, 1.5, 3.0, 7.0] {
            h.observe(v);
        }
        let s = h.snapshot();
        assert_eq!(s.buckets, vec![(1.0, 2), (2.0, 3), (5.0, 4)]);
        assert_eq!(s.count, 5);
        assert_eq!(s.sum, 13.0);
    }

    #[test]
    fn nan_is_dropped() {
        let h = Histogram::new(&[1.0]).unwrap();
        h.observe(f64::NAN);
        assert_eq!(h.sample_count(), 0);
        assert_eq!(h.sample_sum(), 0.0);
    }

    #[test]
    fn bucket_validation() {
        assert_eq!(
            validate_buckets(&[1.0, 2.0, f64::INFINITY]).unwrap(),
            vec![1.0, 2.0]
        );
        assert!(validate_buckets(&[2.0, 1.0]).is_err());
        assert!(validate_buckets(&[1.0, 1.0]).is_err());
        assert!(validate_buckets(&[f64::NAN]).is_err());
        assert!(validate_buckets(&[]).unwrap().is_empty());
    }

    #[test]
    fn bucket_helpers() {
        assert_eq!(linear_buckets(1.0, 2.0, 3).unwrap(), vec![1.0, 3.0, 5.0]);
        assert_eq!(
            exponential_buckets(0.5, 2.0, 4).unwrap(),
            vec![0.5, 1.0, 2.0, 4.0]
        );
        assert!(linear_buckets(0.0, 0.0, 3).is_err());
        assert!(exponential_buckets(0.0, 2.0, 3).is_err());
        assert!(exponential_buckets(1.0, 1.0, 3).is_err());
        assert!(exponential_buckets(1.0, 2.0, 0).is_err());
    }

    #[test]
    fn le_label_is_reserved() {
        let err = HistogramVec::new(HistogramOpts::new("lat", "latency"), &["le"]).unwrap_err();
        assert_eq!(err.code().as_str(), "INVALID_DESCRIPTOR");
    }
}
