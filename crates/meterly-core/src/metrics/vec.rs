//! Labelled metric families with lazy per-label-set cells and label currying.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{MeterlyError, Result};
use crate::registry::{Collector, MetricFamily, MetricKind, Sample, SampleValue};

use super::desc::Desc;

/// A cell type that can live inside a `MetricVec`.
pub trait Metric: Clone + Send + Sync + 'static {
    fn sample_value(&self) -> SampleValue;
}

struct VecCore<M> {
    desc: Desc,
    kind: MetricKind,
    new_metric: Box<dyn Fn() -> M + Send + Sync>,
    cells: DashMap<Vec<String>, M>,
}

/// A metric family keyed by label values.
///
/// Clones (and curried views) share the same cells. Label values are stored
/// in declared label order, curried ones included.
pub struct MetricVec<M> {
    core: Arc<VecCore<M>>,
    /// (label index, bound value), sorted by index.
    curried: Vec<(usize, String)>,
}

impl<M> Clone for MetricVec<M> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            curried: self.curried.clone(),
        }
    }
}

impl<M> fmt::Debug for MetricVec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricVec")
            .field("desc", &self.core.desc)
            .field("curried", &self.curried)
            .field("cells", &self.core.cells.len())
            .finish()
    }
}

impl<M: Metric> MetricVec<M> {
    pub(crate) fn from_parts(
        desc: Desc,
        kind: MetricKind,
        new_metric: impl Fn() -> M + Send + Sync + 'static,
    ) -> Self {
        Self {
            core: Arc::new(VecCore {
                desc,
                kind,
                new_metric: Box::new(new_metric),
                cells: DashMap::new(),
            }),
            curried: Vec::new(),
        }
    }

    pub fn desc(&self) -> &Desc {
        &self.core.desc
    }

    /// Label names that still need a value, in declared order.
    pub fn remaining_label_names(&self) -> Vec<&str> {
        self.core
            .desc
            .label_names
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.curried.iter().any(|(ci, _)| ci == i))
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Cell for the given values of the remaining labels, created on first use.
    pub fn with_label_values(&self, values: &[&str]) -> Result<M> {
        let remaining = self.core.desc.label_names.len() - self.curried.len();
        if values.len() != remaining {
            return Err(MeterlyError::InconsistentLabels(format!(
                "{}: expected {remaining} label values, got {}",
                self.core.desc.name,
                values.len()
            )));
        }

        let mut free = values.iter();
        let mut bound = self.curried.iter().peekable();
        let key: Vec<String> = (0..self.core.desc.label_names.len())
            .map(|i| match bound.peek() {
                Some((ci, v)) if *ci == i => {
                    bound.next();
                    v.clone()
                }
                _ => free.next().map(|s| s.to_string()).unwrap_or_default(),
            })
            .collect();

        Ok(self.get_or_create(key))
    }

    /// Cell for the remaining labels given by name, in any order.
    pub fn with_labels(&self, labels: &[(&str, &str)]) -> Result<M> {
        let remaining = self.remaining_label_names();
        if labels.len() != remaining.len() {
            return Err(MeterlyError::InconsistentLabels(format!(
                "{}: expected labels {remaining:?}, got {} pairs",
                self.core.desc.name,
                labels.len()
            )));
        }
        let mut values = Vec::with_capacity(remaining.len());
        for name in &remaining {
            let value = labels
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| *v)
                .ok_or_else(|| {
                    MeterlyError::InconsistentLabels(format!(
                        "{}: missing label {name}",
                        self.core.desc.name
                    ))
                })?;
            values.push(value);
        }
        self.with_label_values(&values)
    }

    /// Bind label values, returning a narrower view over the same family.
    pub fn curry_with(&self, labels: &[(&str, &str)]) -> Result<Self> {
        let mut curried = self.curried.clone();
        for (name, value) in labels {
            let idx = self
                .core
                .desc
                .label_names
                .iter()
                .position(|l| l == name)
                .ok_or_else(|| {
                    MeterlyError::InconsistentLabels(format!(
                        "{}: cannot curry unknown label {name}",
                        self.core.desc.name
                    ))
                })?;
            if curried.iter().any(|(ci, _)| *ci == idx) {
                return Err(MeterlyError::InconsistentLabels(format!(
                    "{}: label {name} is already curried",
                    self.core.desc.name
                )));
            }
            curried.push((idx, value.to_string()));
        }
        curried.sort_by_key(|(i, _)| *i);

        Ok(Self {
            core: Arc::clone(&self.core),
            curried,
        })
    }

    fn get_or_create(&self, key: Vec<String>) -> M {
        if let Some(m) = self.core.cells.get(&key) {
            return m.value().clone();
        }
        self.core
            .cells
            .entry(key)
            .or_insert_with(|| (self.core.new_metric)())
            .value()
            .clone()
    }
}

impl<M: Metric> Collector for MetricVec<M> {
    fn name(&self) -> &str {
        &self.core.desc.name
    }

    fn collect(&self) -> MetricFamily {
        let desc = &self.core.desc;

        let mut cells: Vec<(Vec<String>, SampleValue)> = self
            .core
            .cells
            .iter()
            .map(|r| (r.key().clone(), r.value().sample_value()))
            .collect();
        cells.sort_by(|a, b| a.0.cmp(&b.0));

        let samples = cells
            .into_iter()
            .map(|(values, value)| {
                let labels = desc
                    .const_labels
                    .iter()
                    .cloned()
                    .chain(desc.label_names.iter().cloned().zip(values))
                    .collect();
                Sample { labels, value }
            })
            .collect();

        MetricFamily {
            name: desc.name.clone(),
            help: desc.help.clone(),
            kind: self.core.kind,
            samples,
        }
    }
}
