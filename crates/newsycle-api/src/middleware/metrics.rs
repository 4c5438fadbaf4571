//! Metrics tracking middleware
//!
//! Tracks request counts, latency and status classes in the shared state's
//! atomic counters.
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Metrics tracking middleware
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let latency_us = start.elapsed().as_micros() as u64;
    let status = response.status();
    state.counters.record_request(status.as_u16(), latency_us);

    tracing::debug!(%method, %path, status = status.as_u16(), latency_us, "Request finished");

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use newsycle_core::AppConfig;
    use newsycle_fetcher::StaticSource;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_requests_are_counted() {
        let state = Arc::new(
            AppState::with_source(AppConfig::default(), Arc::new(StaticSource::new())).unwrap(),
        );
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/bad", get(|| async { StatusCode::BAD_REQUEST }))
            .layer(middleware::from_fn_with_state(state.clone(), metrics_middleware))
            .with_state(state.clone());

        for uri in ["/ok", "/bad", "/ok"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            app.clone().oneshot(request).await.unwrap();
        }

        let snapshot = state.counters.snapshot();
        assert_eq!(snapshot.requests, 3);
        assert_eq!(snapshot.client_errors, 1);
    }
}
