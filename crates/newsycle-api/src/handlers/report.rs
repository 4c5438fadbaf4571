//! Report handlers
//!
//! The report date is resolved per request and handed down explicitly to
//! the assembler and presenter.
//!
//! Author: hephaex@gmail.com

use crate::error::{ApiError, AppError};
use crate::presenter::render_page;
use crate::state::AppState;
use axum::{
    extract::{Form, Query, State},
    response::Html,
    Json,
};
use chrono::{Local, NaiveDate};
use newsycle_core::parse_report_date;
use newsycle_report::Report;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

/// Form posted by the date picker
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReportForm {
    /// Report date (YYYY-MM-DD); empty means today
    #[serde(default)]
    pub dt: Option<String>,
}

/// Query string of the JSON endpoint
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// Report date (YYYY-MM-DD), today when omitted
    #[serde(default)]
    pub date: Option<String>,
}

/// Requested date, or today when none was supplied
pub fn resolve_date(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    let parsed = match raw {
        Some(raw) => parse_report_date(raw)?,
        None => None,
    };
    Ok(parsed.unwrap_or_else(|| Local::now().date_naive()))
}

async fn build_report(state: &AppState, date: NaiveDate) -> Result<Report, AppError> {
    let report = state.assembler.assemble(date).await?;
    state.counters.record_report();
    Ok(report)
}

/// Report page for today
#[utoipa::path(
    get,
    path = "/",
    tag = "report",
    responses(
        (status = 200, description = "HTML report for today", content_type = "text/html"),
        (status = 502, description = "News or model provider failed", body = ApiError)
    )
)]
pub async fn index_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let date = resolve_date(None)?;
    let report = build_report(&state, date).await?;
    Ok(Html(render_page(&report)))
}

/// Report page for the posted `dt`
#[utoipa::path(
    post,
    path = "/",
    tag = "report",
    request_body(content = ReportForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "HTML report for the requested date", content_type = "text/html"),
        (status = 400, description = "Malformed date", body = ApiError),
        (status = 502, description = "News or model provider failed", body = ApiError)
    )
)]
pub async fn date_page(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ReportForm>,
) -> Result<Html<String>, AppError> {
    let date = resolve_date(form.dt.as_deref())?;
    tracing::debug!(%date, "Report requested by form");
    let report = build_report(&state, date).await?;
    Ok(Html(render_page(&report)))
}

/// Report as JSON
#[utoipa::path(
    get,
    path = "/api/v1/report",
    tag = "report",
    params(ReportQuery),
    responses(
        (status = 200, description = "Analyses, similarity matrix and chart specs"),
        (status = 400, description = "Malformed date", body = ApiError),
        (status = 502, description = "News or model provider failed", body = ApiError)
    )
)]
pub async fn report_json(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Report>, AppError> {
    let date = resolve_date(query.date.as_deref())?;
    let report = build_report(&state, date).await?;
    Ok(Json(report))
}
