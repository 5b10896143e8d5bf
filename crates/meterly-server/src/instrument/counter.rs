use std::fmt;
use std::panic::{resume_unwind, AssertUnwindSafe};

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use futures_util::FutureExt;

use meterly_core::error::Result;
use meterly_core::CounterVec;

use super::guard::{CallGuard, LabelPlan};
use super::Endpoint;

/// Increments `counter` once per call of `inner`.
pub struct InstrumentCounter<E> {
    inner: E,
    counter: CounterVec,
    plan: LabelPlan,
}

impl<E> InstrumentCounter<E> {
    /// `counter` may leave only `code` and/or `method` uncurried.
    pub fn new(counter: CounterVec, inner: E) -> Result<Self> {
        let plan = LabelPlan::for_remaining(&counter.desc().name, &counter.remaining_label_names())?;
        Ok(Self {
            inner,
            counter,
            plan,
        })
    }
}

impl<E> fmt::Debug for InstrumentCounter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentCounter")
            .field("counter", &self.counter.desc().name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<E: Endpoint> Endpoint for InstrumentCounter<E> {
    async fn call(&self, req: Request) -> Response {
        let counter = &self.counter;
        let mut guard = CallGuard::new(self.plan, req.method(), |labels: &[(&str, &str)]| {
            match counter.with_labels(labels) {
                Ok(c) => c.inc(),
                Err(e) => tracing::warn!(error = %e, "request counter not recorded"),
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
