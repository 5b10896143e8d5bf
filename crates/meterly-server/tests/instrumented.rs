#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use futures_util::future::join_all;
use tokio::sync::watch;
use tower::ServiceExt;

use meterly_core::encode::TEXT_CONTENT_TYPE;
use meterly_core::Registry;
use meterly_server::app_state::{mount, AppState, MountedEndpoint};
use meterly_server::config;
use meterly_server::instrument::from_fn;
use meterly_server::obs::ServiceMetrics;
use meterly_server::router::build_router;
use meterly_server::services::DelayedNoContent;

const CFG: &str = r#"
version: 1
sampler:
  interval_ms: 1
"#;

fn state_with(endpoints: impl FnOnce(&ServiceMetrics) -> Vec<MountedEndpoint>) -> AppState {
    let cfg = config::load_from_str(CFG).unwrap();
    let registry = Arc::new(Registry::new());
    let metrics = ServiceMetrics::register(&registry, &cfg.metrics).unwrap();
    let endpoints = endpoints(&metrics);
    AppState::from_parts(cfg, registry, metrics, endpoints)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn scrape(app: &Router) -> String {
    let resp = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn online_users(text: &str) -> f64 {
    let line = text
        .lines()
        .find(|l| l.starts_with("meterly_online_users{"))
        .expect("online users series present");
    line.rsplit(' ').next().unwrap().parse().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_are_all_counted() {
    let state = state_with(|m| {
        vec![mount("/fast", "fast", DelayedNoContent::new(0), m).unwrap()]
    });
    let app = build_router(state.clone());

    // each call on its own task so the series cell is created and written in parallel
    let calls = (0..100).map(|_| tokio::spawn(app.clone().oneshot(get("/fast"))));
    for joined in join_all(calls).await {
        assert_eq!(joined.unwrap().unwrap().status(), StatusCode::NO_CONTENT);
    }

    let labels = ["fast", "204", "get"];
    let m = state.metrics();
    assert_eq!(m.requests_total.with_label_values(&labels).unwrap().get(), 100.0);
    let h = m.request_duration.with_label_values(&labels).unwrap();
    assert_eq!(h.sample_count(), 100);
    assert!(h.sample_sum() < 1.0, "sum={}", h.sample_sum());

    let text = scrape(&app).await;
    assert_eq!(
        text.matches("meterly_http_requests_total{handler=\"fast\"").count(),
        1,
        "exactly one series for the label set"
    );
}

#[tokio::test]
async fn method_label_follows_the_request() {
    let state = state_with(|m| {
        vec![mount("/any", "any", DelayedNoContent::new(0), m).unwrap()]
    });
    let app = build_router(state.clone());

    let post = Request::builder()
        .method("POST")
        .uri("/any")
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(post).await.unwrap();
    app.clone().oneshot(get("/any")).await.unwrap();

    let c = &state.metrics().requests_total;
    assert_eq!(c.with_label_values(&["any", "204", "post"]).unwrap().get(), 1.0);
    assert_eq!(c.with_label_values(&["any", "204", "get"]).unwrap().get(), 1.0);
}

#[tokio::test]
async fn panicking_handler_is_recorded_as_500() {
    let state = state_with(|m| {
        let boom = from_fn(|_req| async {
            if true {
                panic!("handler exploded");
            }
            StatusCode::OK.into_response()
        });
        vec![mount("/boom", "boom", boom, m).unwrap()]
    });
    let app = build_router(state.clone());

    let joined = tokio::spawn(app.oneshot(get("/boom"))).await;
    assert!(joined.expect_err("panic must propagate").is_panic());

    let labels = ["boom", "500", "get"];
    let m = state.metrics();
    assert_eq!(m.requests_total.with_label_values(&labels).unwrap().get(), 1.0);
    assert_eq!(
        m.request_duration.with_label_values(&labels).unwrap().sample_count(),
        1
    );
}

#[tokio::test]
async fn abandoned_request_is_recorded_as_499() {
    let state = state_with(|m| {
        let slow = from_fn(|_req| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK.into_response()
        });
        vec![mount("/slow", "slow", slow, m).unwrap()]
    });
    let app = build_router(state.clone());

    let res = tokio::time::timeout(Duration::from_millis(20), app.oneshot(get("/slow"))).await;
    assert!(res.is_err(), "call must time out");

    let m = state.metrics();
    assert_eq!(
        m.requests_total.with_label_values(&["slow", "499", "get"]).unwrap().get(),
        1.0
    );
    let h = m
        .request_duration
        .with_label_values(&["slow", "499", "get"])
        .unwrap();
    assert_eq!(h.sample_count(), 1);
    assert!(h.sample_sum() >= 0.02, "sum={}", h.sample_sum());
}

#[tokio::test]
async fn scrape_exposes_families_and_is_not_counted() {
    let state = state_with(|m| {
        vec![mount("/fast", "fast", DelayedNoContent::new(0), m).unwrap()]
    });
    let app = build_router(state.clone());
    app.clone().oneshot(get("/fast")).await.unwrap();

    let resp = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        TEXT_CONTENT_TYPE
    );

    let first = scrape(&app).await;
    let second = scrape(&app).await;
    for text in [&first, &second] {
        assert!(text.contains("# HELP meterly_http_requests_total "));
        assert!(text.contains("# TYPE meterly_http_requests_total counter"));
        assert!(text.contains("# TYPE meterly_http_request_duration_seconds histogram"));
        assert!(text.contains("# TYPE meterly_online_users gauge"));
        assert!(text.contains(
            "meterly_http_requests_total{handler=\"fast\",code=\"204\",method=\"get\"} 1\n"
        ));
        assert!(text.contains(
            "meterly_http_request_duration_seconds_count{handler=\"fast\",code=\"204\",method=\"get\"} 1\n"
        ));
    }
    // nothing about the scrapes themselves shows up
    assert!(!second.contains("/metrics"));
    assert_eq!(
        state.metrics().requests_total.with_label_values(&["fast", "204", "get"]).unwrap().get(),
        1.0
    );
}

#[tokio::test]
async fn healthz_is_served() {
    let app = build_router(state_with(|_| Vec::new()));
    let resp = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn sampler_moves_the_gauge_between_scrapes() {
    let state = state_with(|_| Vec::new());
    let app = build_router(state.clone());

    let (tx, rx) = watch::channel(false);
    let sampler = state.spawn_sampler(rx).unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let a = online_users(&scrape(&app).await);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let b = online_users(&scrape(&app).await);

    for v in [a, b] {
        assert!((0.0..1_000_000.0).contains(&v), "v={v}");
        assert_eq!(v.fract(), 0.0);
    }
    assert_ne!(a, b, "gauge should have been resampled");

    tx.send(true).unwrap();
    sampler.await.unwrap();
}

#[test]
fn duplicate_family_fails_before_serving() {
    let cfg = config::load_from_str(CFG).unwrap();
    let registry = Registry::new();
    ServiceMetrics::register(&registry, &cfg.metrics).unwrap();
    let err = ServiceMetrics::register(&registry, &cfg.metrics)
        .err()
        .expect("second registration must fail");
    assert_eq!(err.code().as_str(), "ALREADY_REGISTERED");
}

#[tokio::test]
async fn configured_endpoints_are_mounted() {
    let cfg = config::load_from_str(
        r#"
version: 1
endpoints:
  - path: "/quick"
    handler: "quick"
"#,
    )
    .unwrap();
    let state = AppState::new(cfg).unwrap();
    assert_eq!(state.endpoints().len(), 1);

    let app = build_router(state.clone());
    let resp = app.oneshot(get("/quick")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        state.metrics().requests_total.with_label_values(&["quick", "204", "get"]).unwrap().get(),
        1.0
    );
}
