use std::sync::Arc;

use crate::error::{MeterlyError, Result};
use crate::registry::{MetricKind, SampleValue};

use super::atomic::AtomicF64;
use super::desc::{Desc, Opts};
use super::vec::{Metric, MetricVec};

/// Monotonically non-decreasing value.
///
/// Negative and NaN increments are rejected; the stored value is never
/// touched by a rejected call.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicF64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.add(1.0);
    }

    /// Increment by a finite, non-negative amount.
    pub fn inc_by(&self, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(MeterlyError::InvalidIncrement(amount));
        }
        self.value.add(amount);
        Ok(())
    }

    pub fn get(&self) -> f64 {
        self.value.get()
    }
}

impl Metric for Counter {
    fn sample_value(&self) -> SampleValue {
        SampleValue::Counter(self.get())
    }
}

pub type CounterVec = MetricVec<Counter>;

impl MetricVec<Counter> {
    pub fn new(opts: Opts, label_names: &[&str]) -> Result<Self> {
        let desc = Desc::new(opts, label_names)?;
        Ok(Self::from_parts(desc, MetricKind::Counter, Counter::new))
    }
}
