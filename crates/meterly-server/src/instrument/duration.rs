use std::fmt;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::time::Instant;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use futures_util::FutureExt;

use meterly_core::error::Result;
use meterly_core::HistogramVec;

use super::guard::{CallGuard, LabelPlan};
use super::Endpoint;

/// Observes the wall-clock seconds of each call of `inner` into `observer`.
pub struct InstrumentDuration<E> {
    inner: E,
    observer: HistogramVec,
    plan: LabelPlan,
}

impl<E> InstrumentDuration<E> {
    /// `observer` may leave only `code` and/or `method` uncurried.
    pub fn new(observer: HistogramVec, inner: E) -> Result<Self> {
        let plan =
            LabelPlan::for_remaining(&observer.desc().name, &observer.remaining_label_names())?;
        Ok(Self {
            inner,
            observer,
            plan,
        })
    }
}

impl<E> fmt::Debug for InstrumentDuration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentDuration")
            .field("observer", &self.observer.desc().name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<E: Endpoint> Endpoint for InstrumentDuration<E> {
    async fn call(&self, req: Request) -> Response {
        let observer = &self.observer;
        let start = Instant::now();
        let mut guard = CallGuard::new(self.plan, req.method(), |labels: &[(&str, &str)]| {
            let elapsed = start.elapsed().as_secs_f64();
            match observer.with_labels(labels) {
                Ok(h) => h.observe(elapsed),
                Err(e) => tracing::warn!(error = %e, "request duration not recorded"),
            }
        });

        match AssertUnwindSafe(self.inner.call(req)).catch_unwind().await {
            Ok(resp) => {
                guard.finish(resp.status());
                resp
            }
            Err(panic) => {
                guard.finish(StatusCode::INTERNAL_SERVER_ERROR);
                drop(guard);
                resume_unwind(panic)
            }
        }
    }
}
