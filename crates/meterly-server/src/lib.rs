//! meterly server library entry.
//!
//! Wires the metric registry, the instrumentation middleware, the background
//! sampler, and the exposition endpoint into an axum service. It is consumed
//! by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod instrument;
pub mod obs;
pub mod ops;
pub mod router;
pub mod sampler;
pub mod services;
