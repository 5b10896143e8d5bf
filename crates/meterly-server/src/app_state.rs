//! Shared application state for the meterly server.
//!
//! Owns the registry, the service metric families, and the instrumented
//! endpoints. Construction returns `Result` so misconfiguration (duplicate
//! metric names, bad labels) stops startup before anything is served.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use meterly_core::error::Result;
use meterly_core::Registry;

use crate::config::ServerConfig;
use crate::instrument::{instrument_handler, Endpoint};
use crate::obs::ServiceMetrics;
use crate::sampler::{Sampler, UniformSource};
use crate::services::DelayedNoContent;

/// An instrumented endpoint and the route it is served on.
#[derive(Clone)]
pub struct MountedEndpoint {
    pub path: String,
    pub handler: String,
    pub endpoint: Arc<dyn Endpoint>,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    registry: Arc<Registry>,
    metrics: ServiceMetrics,
    endpoints: Vec<MountedEndpoint>,
}

impl AppState {
    /// Build state with a fresh registry and one demo endpoint per config entry.
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let metrics = ServiceMetrics::register(&registry, &cfg.metrics)?;

        let mut endpoints = Vec::with_capacity(cfg.endpoints.len());
        for ep in &cfg.endpoints {
            let demo = DelayedNoContent::new(ep.max_delay_ms);
            endpoints.push(mount(&ep.path, &ep.handler, demo, &metrics)?);
            tracing::info!(path = %ep.path, handler = %ep.handler, "endpoint instrumented");
        }

        Ok(Self::from_parts(cfg, registry, metrics, endpoints))
    }

    /// Assemble state from prebuilt parts (custom endpoints, shared registry).
    pub fn from_parts(
        cfg: ServerConfig,
        registry: Arc<Registry>,
        metrics: ServiceMetrics,
        endpoints: Vec<MountedEndpoint>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                metrics,
                endpoints,
            }),
        }
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.inner.metrics
    }

    pub fn endpoints(&self) -> &[MountedEndpoint] {
        &self.inner.endpoints
    }

    /// Start the online-users sampler; it stops when `shutdown` flips to true.
    pub fn spawn_sampler(&self, shutdown: watch::Receiver<bool>) -> Result<JoinHandle<()>> {
        let s = &self.inner.cfg.sampler;
        let source = UniformSource::new(s.min, s.max)?;
        let sampler = Sampler::new(
            self.inner.metrics.online_users.clone(),
            source,
            Duration::from_millis(s.interval_ms),
        );
        Ok(sampler.spawn(shutdown))
    }
}

/// Instrument `endpoint` under `handler` and pair it with its route.
pub fn mount<E: Endpoint + 'static>(
    path: &str,
    handler: &str,
    endpoint: E,
    metrics: &ServiceMetrics,
) -> Result<MountedEndpoint> {
    let instrumented = instrument_handler(handler, endpoint, metrics)?;
    Ok(MountedEndpoint {
        path: path.to_string(),
        handler: handler.to_string(),
        endpoint: Arc::new(instrumented),
    })
}
