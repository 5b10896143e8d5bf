use std::sync::Arc;

use crate::error::Result;
use crate::registry::{MetricKind, SampleValue};

use super::atomic::AtomicF64;
use super::desc::{Desc, Opts};
use super::vec::{Metric, MetricVec};

/// Freely settable value. Concurrent `set` calls are last-write-wins.
#[derive(Debug, Clone, Default)]
pub struct Gauge {
    value: Arc<AtomicF64>,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, v: f64) {
        self.value.set(v);
    }

    pub fn inc(&self) {
        self.value.add(1.0);
    }

    pub fn dec(&self) {
        self.value.add(-1.0);
    }

    pub fn add(&self, delta: f64) {
        self.value.add(delta);
    }

    pub fn get(&self) -> f64 {
        self.value.get()
    }
}

impl Metric for Gauge {
    fn sample_value(&self) -> SampleValue {
        SampleValue::Gauge(self.get())
    }
}

pub type GaugeVec = MetricVec<Gauge>;

impl MetricVec<Gauge> {
    pub fn new(opts: Opts, label_names: &[&str]) -> Result<Self> {
        let desc = Desc::new(opts, label_names)?;
        Ok(Self::from_parts(desc, MetricKind::Gauge, Gauge::new))
    }
}
