#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;
use wxtrack_core::{Coordinates, CurrentConditions, HourlyGrid, HourlySeries, WeatherProvider};
use wxtrack_db::DbClient;
use wxtrack_server::AppState;

/// Provider double: fixed current readings and a 24-hour ramp for today (UTC)
pub struct StubProvider {
    pub current_calls: AtomicUsize,
    pub hourly_calls: AtomicUsize,
    /// First hour of the forecast grid
    pub first_hour: i64,
    pub fail: bool,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            current_calls: AtomicUsize::new(0),
            hourly_calls: AtomicUsize::new(0),
            first_hour: 0,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn starting_at(first_hour: i64) -> Self {
        Self {
            first_hour,
            ..Self::new()
        }
    }

    pub fn hourly_calls(&self) -> usize {
        self.hourly_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WeatherProvider for StubProvider {
    async fn fetch_current(&self, _coords: Coordinates) -> Result<CurrentConditions> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("provider unavailable");
        }
        Ok(CurrentConditions::from_iter([
            ("temperature_2m", 9.1),
            ("surface_pressure", 1013.0),
            ("wind_speed_10m", 4.2),
        ]))
    }

    async fn fetch_hourly(&self, _coords: Coordinates, variables: &[String]) -> Result<HourlySeries> {
        self.hourly_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("provider unavailable");
        }
        let today = Utc::now().date_naive();
        let midnight = Utc.from_utc_datetime(&today.and_hms_opt(0, 0, 0).unwrap());
        let start = midnight + Duration::hours(self.first_hour);
        let end = midnight + Duration::hours(24);
        let grid = HourlyGrid::new(start, end, 3600)?;
        let count = grid.len();

        let mut series = HourlySeries::new(grid);
        for name in variables {
            // precipitation is never reported by this double
            if name == "precipitation" {
                continue;
            }
            let samples = (0..count)
                .map(|i| Some(self.first_hour as f64 + i as f64))
                .collect();
            series.series.insert(name.clone(), samples);
        }
        Ok(series)
    }
}

pub async fn app_with(provider: Arc<StubProvider>) -> (Router, Arc<AppState>, DbClient) {
    let db = DbClient::in_memory().await.unwrap();
    let (app, state) = wxtrack_server::build_app(db.clone(), provider).unwrap();
    (app, state, db)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Status plus the JSON body (`Null` when the body is not JSON)
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

pub async fn register(app: &Router, username: &str) -> i64 {
    let (status, body) = send(app, post_json("/register", serde_json::json!({ "username": username }))).await;
    assert_eq!(status, StatusCode::OK);
    body["user_id"].as_i64().unwrap()
}

pub async fn add_city(app: &Router, user_id: i64, name: &str, lat: f64, lon: f64) -> StatusCode {
    let (status, _) = send(
        app,
        post_json(
            "/add_city",
            serde_json::json!({
                "user_id": user_id,
                "city_name": name,
                "latitude": lat,
                "longitude": lon
            }),
        ),
    )
    .await;
    status
}
