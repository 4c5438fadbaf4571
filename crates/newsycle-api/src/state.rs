//! Application state management
//!
//! Shared state is read-only configuration, the report assembler and a few
//! atomic counters. Nothing request-specific (such as the report date) is
//! stored here.
//!
//! Author: hephaex@gmail.com

use newsycle_core::config::AppConfig;
use newsycle_core::Result;
use newsycle_fetcher::{ArticleSource, NewsApiClient};
use newsycle_report::ReportAssembler;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

/// Monotonic request and report counters
#[derive(Debug, Default)]
pub struct RequestCounters {
    requests: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    latency_us_total: AtomicU64,
    reports: AtomicU64,
}

/// Point-in-time copy of [`RequestCounters`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct CounterSnapshot {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub reports: u64,
    pub mean_latency_ms: f64,
}

impl RequestCounters {
    pub fn record_request(&self, status: u16, latency_us: u64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.latency_us_total.fetch_add(latency_us, Ordering::Relaxed);
        let bucket = match status {
            400..=499 => &self.client_errors,
            500..=599 => &self.server_errors,
            _ => return,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_report(&self) {
        self.reports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let mean_latency_ms = match requests {
            0 => 0.0,
            n => self.latency_us_total.load(Ordering::Relaxed) as f64 / n as f64 / 1000.0,
        };

        CounterSnapshot {
            requests,
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            reports: self.reports.load(Ordering::Relaxed),
            mean_latency_ms,
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub config: AppConfig,
    pub assembler: ReportAssembler,
    pub counters: RequestCounters,
    start_time: Instant,
    ready: AtomicBool,
}

impl AppState {
    pub fn new(config: AppConfig, assembler: ReportAssembler) -> Self {
        Self {
            config,
            assembler,
            counters: RequestCounters::default(),
            start_time: Instant::now(),
            ready: AtomicBool::new(true),
        }
    }

    /// Build state backed by the live news API
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let source: Arc<dyn ArticleSource> = Arc::new(NewsApiClient::from_config(&config.news)?);
        Self::with_source(config, source)
    }

    /// Build state over any article source
    pub fn with_source(config: AppConfig, source: Arc<dyn ArticleSource>) -> Result<Self> {
        let assembler = ReportAssembler::from_config(&config, source)?;
        Ok(Self::new(config, assembler))
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}
