//! Axum router wiring.
//!
//! Exposes the metrics and health routes plus one route per instrumented
//! endpoint (any method).

use std::sync::Arc;

use axum::{
    extract::Request,
    routing::{any, get},
    Router,
};

use crate::{app_state::AppState, config::schema::HEALTHZ_PATH, instrument::Endpoint, ops};

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route(&state.cfg().metrics.path, get(ops::metrics))
        .route(HEALTHZ_PATH, get(ops::healthz));

    for mounted in state.endpoints() {
        let endpoint = Arc::clone(&mounted.endpoint);
        router = router.route(
            &mounted.path,
            any(move |req: Request| async move { endpoint.call(req).await }),
        );
    }

    router.with_state(state)
}
