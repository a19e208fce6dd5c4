//! HTTP surface of the weather tracker

pub mod error;
pub mod routes;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode},
    routing::{get, post},
    Router,
};
use opentelemetry::{
    metrics::{Counter, MeterProvider},
    KeyValue,
};
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use wxtrack_core::{HourlyResolver, WeatherProvider};
use wxtrack_db::DbClient;

pub use error::ApiError;

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    meter_provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    pub(crate) db: DbClient,
    pub(crate) provider: Arc<dyn WeatherProvider>,
    pub(crate) resolver: HourlyResolver,
}

impl AppState {
    pub(crate) fn count_request(&self, route: &'static str) {
        self.requests_total
            .add(1, &[KeyValue::new("route", route)]);
    }
}

pub fn build_app(db: DbClient, provider: Arc<dyn WeatherProvider>) -> Result<(Router, Arc<AppState>)> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter().with_registry(registry.clone()).build()?;
    let meter_provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = meter_provider.meter("wxtrack-server");

    let requests_total = meter
        .u64_counter("wxtrack_requests_total")
        .with_description("Total HTTP requests served")
        .init();

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        meter_provider,
        requests_total,
        db,
        resolver: HourlyResolver::new(Arc::clone(&provider)),
        provider,
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/register", post(routes::register))
        .route("/add_city", post(routes::add_city))
        .route("/cities", get(routes::cities))
        .route("/city_weather", get(routes::city_weather))
        .route("/weather", post(routes::current_weather))
        .route("/hourly_weather_by_hour", get(routes::hourly_weather_by_hour))
        .with_state(Arc::clone(&state));

    Ok((router, state))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.count_request("/healthz");
    StatusCode::OK
}

/// Ready once flagged by the binary and while the database answers
async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if !state.ready.load(Ordering::Relaxed) {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    match state.db.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn metrics(State(state): State<Arc<AppState>>) -> ([(HeaderName, HeaderValue); 1], String) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}
