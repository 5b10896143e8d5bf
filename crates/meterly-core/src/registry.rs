//! Metric registry: owns named families and snapshots them for exposition.
//!
//! The registry is an explicit value (share it with `Arc`), never a process
//! global, so every test can build its own.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{MeterlyError, Result};
use crate::metrics::HistogramSnapshot;

/// Something the registry can snapshot into a `MetricFamily`.
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;
    fn collect(&self) -> MetricFamily;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Counter(f64),
    Gauge(f64),
    Histogram(HistogramSnapshot),
}

/// One series: its full label set (constant labels first) and current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<(String, String)>,
    pub value: SampleValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

#[derive(Default)]
pub struct Registry {
    families: RwLock<BTreeMap<String, Arc<dyn Collector>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a family. Name collisions are a startup configuration error.
    pub fn register<C: Collector + 'static>(&self, collector: C) -> Result<()> {
        let name = collector.name().to_string();
        let mut families = self.families.write();
        if families.contains_key(&name) {
            return Err(MeterlyError::AlreadyRegistered(name));
        }
        tracing::debug!(metric = %name, "metric family registered");
        families.insert(name, Arc::new(collector));
        Ok(())
    }

    /// Registered family names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.families.read().keys().cloned().collect()
    }

    /// Lazily snapshot every family, ordered by name.
    ///
    /// The registry lock is held only while cloning the collector handles;
    /// each family is read as the iterator reaches it.
    pub fn collect(&self) -> impl Iterator<Item = MetricFamily> {
        let collectors: Vec<Arc<dyn Collector>> = self.families.read().values().cloned().collect();
        collectors.into_iter().map(|c| c.collect())
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.collect().collect()
    }
}
