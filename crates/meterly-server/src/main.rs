//! meterly server
//!
//! - `/metrics`  : Prometheus text exposition of the process registry
//! - `/healthz`  : liveness
//! - one instrumented demo route per `endpoints` entry in the config
//!
//! Config path: `$METERLY_CONFIG`, default `meterly.yaml`.

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use meterly_core::error::{MeterlyError, Result};
use meterly_server::{app_state, config, router};

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::var("METERLY_CONFIG").unwrap_or_else(|_| "meterly.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.server.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sampler = state.spawn_sampler(shutdown_rx)?;

    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MeterlyError::Internal(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, "meterly-server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .map_err(|e| MeterlyError::Internal(format!("server failed: {e}")))?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sampler.await {
        tracing::warn!(error = %e, "sampler task ended abnormally");
    }
    Ok(())
}
