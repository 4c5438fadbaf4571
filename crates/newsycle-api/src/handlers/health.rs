//! Liveness, readiness and counter endpoints
//!
//! Author: hephaex@gmail.com

use crate::state::{AppState, CounterSnapshot};
use axum::{extract::State, http::StatusCode, Json};
use newsycle_core::REPORT_DATE_FORMAT;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

/// What a report request would run against
#[derive(Serialize, ToSchema)]
pub struct ReadinessChecks {
    /// A news API key is configured
    pub news_api_key: bool,
    /// Recognizer and embedding backend in use
    pub model_provider: String,
    pub outlets: usize,
    /// Accepted `dt` format
    pub date_format: &'static str,
}

/// Readiness probe
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let ready = state.is_ready();
    let response = ReadinessResponse {
        ready,
        checks: ReadinessChecks {
            news_api_key: state.config.news.api_key.is_some(),
            model_provider: state.config.llm.provider.to_string(),
            outlets: state.assembler.outlets().len(),
            date_format: REPORT_DATE_FORMAT,
        },
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[derive(Serialize, ToSchema)]
pub struct MetricsResponse {
    pub uptime_seconds: u64,
    pub requests_per_second: f64,
    pub counters: CounterSnapshot,
}

/// Request counters since start
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "health",
    responses(
        (status = 200, description = "Request counters", body = MetricsResponse)
    )
)]
pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    let uptime_seconds = state.uptime_secs();
    let counters = state.counters.snapshot();
    let requests_per_second = match uptime_seconds {
        0 => 0.0,
        secs => counters.requests as f64 / secs as f64,
    };

    Json(MetricsResponse {
        uptime_seconds,
        requests_per_second,
        counters,
    })
}
