//! Prometheus text exposition format (version 0.0.4).

use std::fmt::Write;

use crate::error::{MeterlyError, Result};
use crate::registry::{MetricFamily, Registry, SampleValue};

/// Content type served with the text format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        v.to_string()
    }
}

fn label_str(labels: &[(String, String)], extra: Option<(&str, &str)>) -> String {
    let mut parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect();
    if let Some((k, v)) = extra {
        parts.push(format!("{}=\"{}\"", k, escape_label(v)));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(","))
    }
}

fn encode_family(fam: &MetricFamily, out: &mut String) -> std::fmt::Result {
    writeln!(out, "# HELP {} {}", fam.name, escape_help(&fam.help))?;
    writeln!(out, "# TYPE {} {}", fam.name, fam.kind.as_str())?;

    for s in &fam.samples {
        match &s.value {
            SampleValue::Counter(v) | SampleValue::Gauge(v) => {
                writeln!(out, "{}{} {}", fam.name, label_str(&s.labels, None), fmt_value(*v))?;
            }
            SampleValue::Histogram(h) => {
                for (le, count) in &h.buckets {
                    let le = fmt_value(*le);
                    writeln!(
                        out,
                        "{}_bucket{} {}",
                        fam.name,
                        label_str(&s.labels, Some(("le", &le))),
                        count
                    )?;
                }
                writeln!(
                    out,
                    "{}_bucket{} {}",
                    fam.name,
                    label_str(&s.labels, Some(("le", "+Inf"))),
                    h.count
                )?;
                let labels = label_str(&s.labels, None);
                writeln!(out, "{}_sum{} {}", fam.name, labels, fmt_value(h.sum))?;
                writeln!(out, "{}_count{} {}", fam.name, labels, h.count)?;
            }
        }
    }
    Ok(())
}

/// Encode families into `out`.
pub fn encode_text<I>(families: I, out: &mut String) -> Result<()>
where
    I: IntoIterator<Item = MetricFamily>,
{
    for fam in families {
        encode_family(&fam, out)
            .map_err(|e| MeterlyError::Internal(format!("encode {} failed: {e}", fam.name)))?;
    }
    Ok(())
}

/// Collect and encode the whole registry.
pub fn render(registry: &Registry) -> Result<String> {
    let mut out = String::new();
    encode_text(registry.collect(), &mut out)?;
    Ok(out)
}
