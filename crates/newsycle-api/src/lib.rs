//! Newsycle API - HTTP server
//!
//! Serves the daily outlet comparison page, the same report as JSON, health
//! probes and the OpenAPI document.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod presenter;
pub mod routes;
pub mod state;
pub mod telemetry;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware, Router,
};
use newsycle_core::{AppConfig, Result, ServerConfig};
use newsycle_fetcher::ArticleSource;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::handlers::health::{HealthResponse, MetricsResponse, ReadinessChecks, ReadinessResponse};
use crate::handlers::report::ReportForm;
use crate::middleware::{metrics_middleware, security_headers_middleware};
use crate::state::{AppState, CounterSnapshot};

/// OpenAPI document
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::report::index_page,
        handlers::report::date_page,
        handlers::report::report_json,
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::health::metrics,
    ),
    components(schemas(
        ApiError,
        ReportForm,
        HealthResponse,
        ReadinessResponse,
        ReadinessChecks,
        MetricsResponse,
        CounterSnapshot,
    )),
    tags(
        (name = "report", description = "Daily entity comparison across outlets"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);
    let cors = cors_layer(&state.config.server);

    Router::new()
        .merge(routes::page_routes())
        .nest("/api/v1", routes::api_routes())
        .merge(routes::health_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router over a fixed article source with the in-process models
pub fn create_router_for_testing(source: Arc<dyn ArticleSource>) -> Result<Router> {
    let state = AppState::with_source(AppConfig::default(), source)?;
    Ok(create_router(Arc::new(state)))
}

/// Wait for `signal`, then report not-ready so load balancers stop routing
/// here while in-flight requests finish
///
/// Meant for `axum::serve(..).with_graceful_shutdown(..)`.
pub async fn mark_draining<F>(state: Arc<AppState>, signal: F)
where
    F: Future<Output = ()>,
{
    signal.await;
    state.set_ready(false);
    tracing::info!("Shutdown requested, draining connections");
}

/// Cross-origin access only for configured origins
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
