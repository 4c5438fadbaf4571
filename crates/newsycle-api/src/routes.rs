//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::{health, report};
use crate::state::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// The report page: today on GET, the posted date on POST
pub fn page_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(report::index_page).post(report::date_page))
}

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().route("/report", get(report::report_json))
}

/// Probes and counters
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
}
