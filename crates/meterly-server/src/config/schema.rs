use std::collections::HashSet;
use std::net::SocketAddr;

use serde::Deserialize;

use meterly_core::error::{MeterlyError, Result};
use meterly_core::metrics::{is_valid_metric_name, validate_buckets};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub sampler: SamplerSection,

    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MeterlyError::UnsupportedVersion);
        }

        self.server.validate()?;
        self.metrics.validate()?;
        self.sampler.validate()?;

        let mut paths: HashSet<&str> = HashSet::new();
        paths.insert(self.metrics.path.as_str());
        paths.insert(HEALTHZ_PATH);
        let mut handlers: HashSet<&str> = HashSet::new();

        for ep in &self.endpoints {
            ep.validate()?;
            if !paths.insert(ep.path.as_str()) {
                return Err(MeterlyError::BadConfig(format!(
                    "endpoints: path {} is already in use",
                    ep.path
                )));
            }
            if !handlers.insert(ep.handler.as_str()) {
                return Err(MeterlyError::BadConfig(format!(
                    "endpoints: handler label {} is used twice",
                    ep.handler
                )));
            }
        }

        Ok(())
    }
}

/// Liveness route; reserved so endpoints cannot shadow it.
pub const HEALTHZ_PATH: &str = "/healthz";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            MeterlyError::BadConfig(format!("server.listen must be a valid SocketAddr: {e}"))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8181".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Prefix for every metric family name.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Duration histogram buckets in seconds; library defaults when absent.
    #[serde(default)]
    pub buckets: Option<Vec<f64>>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            namespace: default_namespace(),
            buckets: None,
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        validate_path("metrics.path", &self.path)?;
        if self.path == HEALTHZ_PATH {
            return Err(MeterlyError::BadConfig(format!(
                "metrics.path must not be {HEALTHZ_PATH}"
            )));
        }
        if !is_valid_metric_name(&self.namespace) {
            return Err(MeterlyError::BadConfig(format!(
                "metrics.namespace must match [a-zA-Z_:][a-zA-Z0-9_:]*, got {:?}",
                self.namespace
            )));
        }
        if let Some(b) = &self.buckets {
            validate_buckets(b)
                .map_err(|e| MeterlyError::BadConfig(format!("metrics.buckets: {e}")))?;
        }
        Ok(())
    }
}

fn default_metrics_path() -> String {
    "/metrics".into()
}
fn default_namespace() -> String {
    "meterly".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerSection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Inclusive lower bound of the sampled value.
    #[serde(default)]
    pub min: u64,

    /// Exclusive upper bound of the sampled value.
    #[serde(default = "default_sampler_max")]
    pub max: u64,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            min: 0,
            max: default_sampler_max(),
        }
    }
}

impl SamplerSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=60_000).contains(&self.interval_ms) {
            return Err(MeterlyError::BadConfig(
                "sampler.interval_ms must be between 1 and 60000".into(),
            ));
        }
        if self.min >= self.max {
            return Err(MeterlyError::BadConfig(
                "sampler.min must be less than sampler.max".into(),
            ));
        }
        Ok(())
    }
}

fn default_interval_ms() -> u64 {
    100
}
fn default_sampler_max() -> u64 {
    1_000_000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub path: String,

    /// Value of the `handler` label for this endpoint.
    pub handler: String,

    /// Demo latency upper bound (exclusive); 0 responds immediately.
    #[serde(default)]
    pub max_delay_ms: u64,
}

impl EndpointConfig {
    pub fn validate(&self) -> Result<()> {
        validate_path("endpoints.path", &self.path)?;
        if self.handler.trim().is_empty() {
            return Err(MeterlyError::BadConfig(format!(
                "endpoints: handler label for {} must not be empty",
                self.path
            )));
        }
        if self.max_delay_ms > 600_000 {
            return Err(MeterlyError::BadConfig(format!(
                "endpoints: max_delay_ms for {} must be at most 600000",
                self.path
            )));
        }
        Ok(())
    }
}

fn validate_path(field: &str, path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(MeterlyError::BadConfig(format!(
            "{field} must start with '/', got {path:?}"
        )));
    }
    // routes are literal; reject anything the router would parse as a capture
    if path.contains(&[':', '*', '{', '}'][..]) {
        return Err(MeterlyError::BadConfig(format!(
            "{field} must be a literal path (no ':', '*', '{{', '}}'), got {path:?}"
        )));
    }
    Ok(())
}
