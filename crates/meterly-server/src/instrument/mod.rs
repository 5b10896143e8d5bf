//! Request instrumentation middleware.
//!
//! An [`Endpoint`] is anything that turns a request into a response. The
//! wrappers here add measurement around an endpoint without touching what it
//! returns:
//!
//! - [`InstrumentDuration`] observes wall-clock seconds into a histogram
//! - [`InstrumentCounter`] increments a counter
//!
//! [`instrument_handler`] composes both as `Duration(Counter(endpoint))`, with
//! the `handler` label curried on both families, so one request produces one
//! observation and one increment under the same labels. Recording is done by a
//! drop guard and therefore also happens when the endpoint panics or its
//! future is dropped.

mod counter;
mod duration;
mod guard;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;

use meterly_core::error::Result;

use crate::obs::ServiceMetrics;

pub use counter::InstrumentCounter;
pub use duration::InstrumentDuration;

/// Handler seam: accepts a request, produces a response.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, req: Request) -> Response;
}

#[async_trait]
impl<E: Endpoint + ?Sized> Endpoint for Arc<E> {
    async fn call(&self, req: Request) -> Response {
        (**self).call(req).await
    }
}

/// Endpoint backed by an async closure.
pub struct FnEndpoint<F>(F);

pub fn from_fn<F, Fut>(f: F) -> FnEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FnEndpoint(f)
}

#[async_trait]
impl<F, Fut> Endpoint for FnEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn call(&self, req: Request) -> Response {
        (self.0)(req).await
    }
}

/// Wrap `inner` so each call is timed and counted under `handler=<label>`.
pub fn instrument_handler<E: Endpoint>(
    label: &str,
    inner: E,
    metrics: &ServiceMetrics,
) -> Result<InstrumentDuration<InstrumentCounter<E>>> {
    let counter = metrics.requests_total.curry_with(&[("handler", label)])?;
    let observer = metrics.request_duration.curry_with(&[("handler", label)])?;

    let counted = InstrumentCounter::new(counter, inner)?;
    InstrumentDuration::new(observer, counted)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;
    use axum::body::Body;
    use axum::http::{Method, StatusCode};
    use axum::response::IntoResponse;
    use meterly_core::{CounterVec, Opts, Registry};
    use crate::config::MetricsSection;

    fn metrics() -> ServiceMetrics {
        ServiceMetrics::register(&Registry::new(), &MetricsSection::default()).unwrap()
    }

    fn get(uri: &str) -> Request {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn passes_response_through_and_records_once() {
        let m = metrics();
        let ep = instrument_handler(
            "teapot",
            from_fn(|_req| async { (StatusCode::IM_A_TEAPOT, "short and stout").into_response() }),
            &m,
        )
        .unwrap();

        let resp = ep.call(get("/tea")).await;
        assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"short and stout");

        let labels = ["teapot", "418", "get"];
        assert_eq!(m.requests_total.with_label_values(&labels).unwrap().get(), 1.0);
        assert_eq!(
            m.request_duration
                .with_label_values(&labels)
                .unwrap()
                .sample_count(),
            1
        );
    }

    #[tokio::test]
    async fn duration_covers_handler_latency() {
        let m = metrics();
        let ep = instrument_handler(
            "slow",
            from_fn(|_req| async {
                tokio::time::sleep(std::time::Duration::from_millis(30)).await;
                StatusCode::NO_CONTENT.into_response()
            }),
            &m,
        )
        .unwrap();
        ep.call(get("/slow")).await;

        let h = m
            .request_duration
            .with_label_values(&["slow", "204", "get"])
            .unwrap();
        assert_eq!(h.sample_count(), 1);
        assert!(h.sample_sum() >= 0.03, "sum={}", h.sample_sum());
    }

    #[test]
    fn uncurried_extra_label_is_rejected() {
        let m = metrics();
        // not curried: `handler` would be left for the middleware to fill
        let err = InstrumentCounter::new(m.requests_total.clone(), from_fn(|_req| async {
            StatusCode::OK.into_response()
        }))
        .err()
        .expect("must fail");
        assert_eq!(err.code().as_str(), "INCONSISTENT_LABELS");
    }

    #[tokio::test]
    async fn families_without_code_or_method_are_supported() {
        let registry = Registry::new();
        let counter = CounterVec::new(Opts::new("plain_total", "plain"), &["handler"]).unwrap();
        registry.register(counter.clone()).unwrap();
        let curried = counter.curry_with(&[("handler", "p")]).unwrap();

        let ep = InstrumentCounter::new(
            curried,
            from_fn(|_req| async { StatusCode::OK.into_response() }),
        )
        .unwrap();
        ep.call(get("/p")).await;
        ep.call(get("/p")).await;

        assert_eq!(counter.with_label_values(&["p"]).unwrap().get(), 2.0);
    }
}
