use async_trait::async_trait;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rand::Rng;
use tokio::time::Duration;

use crate::instrument::Endpoint;

/// Simulated work: waits a random `[0, max_delay_ms)` milliseconds, then
/// answers `204 No Content`.
#[derive(Debug, Clone)]
pub struct DelayedNoContent {
    max_delay_ms: u64,
}

impl DelayedNoContent {
    pub fn new(max_delay_ms: u64) -> Self {
        Self { max_delay_ms }
    }

    fn pick_delay(&self) -> Duration {
        if self.max_delay_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..self.max_delay_ms))
    }
}

#[async_trait]
impl Endpoint for DelayedNoContent {
    async fn call(&self, _req: Request) -> Response {
        let delay = self.pick_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        StatusCode::NO_CONTENT.into_response()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use axum::body::Body;

    #[test]
    fn delay_stays_below_bound() {
        let svc = DelayedNoContent::new(5);
        for _ in 0..200 {
            assert!(svc.pick_delay() < Duration::from_millis(5));
        }
        assert_eq!(DelayedNoContent::new(0).pick_delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn answers_no_content() {
        let svc = DelayedNoContent::new(0);
        let resp = svc
            .call(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
