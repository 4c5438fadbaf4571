//! API Integration Tests
//!
//! The router runs against an in-memory article source and the in-process
//! recognizer and embedder, so no network access is needed.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Local, NaiveDate};
use newsycle_api::state::AppState;
use newsycle_api::{create_router, create_router_for_testing, mark_draining};
use newsycle_core::{AppConfig, NewsycleError, Outlet, DEFAULT_OUTLETS};
use newsycle_fetcher::{ArticleSource, StaticSource};
use serde_json::Value;
use tower::ServiceExt;

fn sample_source() -> StaticSource {
    let mut source = StaticSource::new();
    for outlet in DEFAULT_OUTLETS {
        source = source.with_outlet(outlet, vec![None]);
    }
    source
        .with_outlet(
            "cnn",
            vec![
                Some("The president met with NATO officials in Brussels.".to_string()),
                None,
                Some("NATO extended support.".to_string()),
            ],
        )
        .with_outlet(
            "fox-news",
            vec![Some("Congress debated aid to Ukraine as NATO watched.".to_string())],
        )
}

fn app() -> Router {
    create_router_for_testing(Arc::new(sample_source())).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let response = app()
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["model_provider"], "local");
    assert_eq!(json["checks"]["outlets"], 6);
}

#[tokio::test]
async fn test_not_ready_once_shutdown_starts() {
    let state = Arc::new(
        AppState::with_source(AppConfig::default(), Arc::new(sample_source())).unwrap(),
    );
    let app = create_router(state.clone());

    mark_draining(state, std::future::ready(())).await;

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["ready"], false);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let response = app()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["uptime_seconds"].is_number());
    assert!(json["counters"]["requests"].is_number());
    assert_eq!(json["counters"]["server_errors"], 0);
}

#[tokio::test]
async fn test_openapi_document() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["paths"]["/api/v1/report"].is_object());
    assert!(json["paths"]["/"]["post"].is_object());
}

// =============================================================================
// Report Page Tests
// =============================================================================

#[tokio::test]
async fn test_index_page_uses_today() {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = body_string(response).await;
    let today = Local::now().date_naive().to_string();
    assert!(html.contains(&format!("id=\"report-date\">{today}<")));
    assert!(html.contains("vegaEmbed(\"#entity-grid\""));
    assert!(html.contains("vegaEmbed(\"#similarity-heatmap\""));
}

#[tokio::test]
async fn test_posted_date_is_echoed() {
    let response = app().oneshot(form_request("dt=2023-01-01")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let html = body_string(response).await;
    assert!(html.contains("id=\"report-date\">2023-01-01<"));
    assert!(html.contains("News Topic Similarity Between Outlets on 2023-01-01"));
    assert!(html.contains("CNN Top Mentions"));
}

#[tokio::test]
async fn test_empty_posted_date_means_today() {
    let response = app().oneshot(form_request("dt=")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let html = body_string(response).await;
    let today = Local::now().date_naive().to_string();
    assert!(html.contains(&format!("id=\"report-date\">{today}<")));
}

#[tokio::test]
async fn test_malformed_posted_date() {
    let response = app()
        .oneshot(form_request("dt=%3Cscript%3E"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_concurrent_dates_do_not_mix() {
    let app = app();

    let (first, second) = tokio::join!(
        app.clone().oneshot(form_request("dt=2023-01-01")),
        app.clone().oneshot(form_request("dt=2024-02-29")),
    );

    let first = body_string(first.unwrap()).await;
    let second = body_string(second.unwrap()).await;
    assert!(first.contains("id=\"report-date\">2023-01-01<"));
    assert!(second.contains("id=\"report-date\">2024-02-29<"));
    assert!(!first.contains("2024-02-29"));
}

// =============================================================================
// JSON Report Tests
// =============================================================================

#[tokio::test]
async fn test_report_json() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/report?date=2023-01-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["date"], "2023-01-01");
    assert_eq!(json["analyses"].as_array().unwrap().len(), 6);
    assert_eq!(json["similarity"]["values"].as_array().unwrap().len(), 6);
    assert_eq!(json["heatmap"]["cells"].as_array().unwrap().len(), 36);
    assert_eq!(json["grid"]["columns"], 2);

    let cnn = json["analyses"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["outlet"] == "cnn")
        .unwrap();
    assert_eq!(cnn["labels"]["ORG"][0]["text"], "NATO");
    assert_eq!(cnn["labels"]["ORG"][0]["count"], 2);
    assert_eq!(cnn["labels"]["GPE"][0]["text"], "Brussels");

    // Outlet with only missing descriptions renders zero bars
    let breitbart = json["grid"]["charts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["outlet"] == "breitbart-news")
        .unwrap();
    assert_eq!(breitbart["bars"], serde_json::json!([]));
}

#[tokio::test]
async fn test_report_json_invalid_date() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/report?date=yesterday")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

struct DownSource;

#[async_trait::async_trait]
impl ArticleSource for DownSource {
    async fn fetch_descriptions(
        &self,
        _outlet: &Outlet,
        _date: NaiveDate,
    ) -> newsycle_core::Result<Vec<String>> {
        Err(NewsycleError::FetchError("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let app = create_router_for_testing(Arc::new(DownSource)).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/report?date=2023-01-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = body_json(response).await;
    assert_eq!(json["code"], "FETCH_ERROR");
    assert!(json["details"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn test_security_headers_on_page() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let csp = response.headers()[header::CONTENT_SECURITY_POLICY]
        .to_str()
        .unwrap();
    assert!(csp.contains("cdn.jsdelivr.net"));
}
