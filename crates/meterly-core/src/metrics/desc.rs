//! Metric family descriptors and construction options.

use crate::error::{MeterlyError, Result};

use super::histogram::{validate_buckets, DEFAULT_BUCKETS};

/// Options shared by every metric kind.
#[derive(Debug, Clone)]
pub struct Opts {
    pub name: String,
    pub help: String,
    pub const_labels: Vec<(String, String)>,
}

impl Opts {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            const_labels: Vec::new(),
        }
    }

    /// Attach a label that every series of the family carries.
    pub fn const_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.const_labels.push((name.into(), value.into()));
        self
    }
}

/// Histogram options: common opts plus bucket upper bounds.
#[derive(Debug, Clone)]
pub struct HistogramOpts {
    pub common: Opts,
    pub buckets: Vec<f64>,
}

impl HistogramOpts {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            common: Opts::new(name, help),
            buckets: DEFAULT_BUCKETS.to_vec(),
        }
    }

    pub fn const_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.common = self.common.const_label(name, value);
        self
    }

    pub fn buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = buckets;
        self
    }

    pub(crate) fn validated_buckets(&self) -> Result<Vec<f64>> {
        validate_buckets(&self.buckets)
    }
}

/// Validated, immutable description of one metric family.
#[derive(Debug, Clone)]
pub struct Desc {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
    pub const_labels: Vec<(String, String)>,
}

impl Desc {
    pub fn new(opts: Opts, label_names: &[&str]) -> Result<Self> {
        if !is_valid_metric_name(&opts.name) {
            return Err(MeterlyError::InvalidDescriptor(format!(
                "invalid metric name: {:?}",
                opts.name
            )));
        }
        if opts.help.trim().is_empty() {
            return Err(MeterlyError::InvalidDescriptor(format!(
                "{}: help must not be empty",
                opts.name
            )));
        }

        let mut seen: Vec<&str> = Vec::new();
        let all_names = opts
            .const_labels
            .iter()
            .map(|(k, _)| k.as_str())
            .chain(label_names.iter().copied());
        for label in all_names {
            if !is_valid_label_name(label) {
                return Err(MeterlyError::InvalidDescriptor(format!(
                    "{}: invalid label name: {label:?}",
                    opts.name
                )));
            }
            if seen.contains(&label) {
                return Err(MeterlyError::InvalidDescriptor(format!(
                    "{}: duplicate label name: {label}",
                    opts.name
                )));
            }
            seen.push(label);
        }

        Ok(Self {
            name: opts.name,
            help: opts.help,
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
            const_labels: opts.const_labels,
        })
    }

    /// Whether `name` is a variable or constant label of this family.
    pub(crate) fn has_label(&self, name: &str) -> bool {
        self.label_names.iter().any(|l| l == name)
            || self.const_labels.iter().any(|(k, _)| k == name)
    }
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
