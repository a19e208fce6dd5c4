//! Open-Meteo forecast API client

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;
use wxtrack_core::{
    Coordinates, CurrentConditions, HourlyGrid, HourlySeries, WeatherProvider, CURRENT_VARIABLES,
};

use crate::retry::with_retry;
use crate::{ProviderError, ProviderResult, ResponseCache, RetryConfig};

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Spacing assumed when the time axis has a single sample
const DEFAULT_HOURLY_INTERVAL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct OpenMeteoConfig {
    pub base_url: String,
    /// Timeout of one HTTP attempt
    pub request_timeout: Duration,
    /// Timeout of a whole call, retries included
    pub call_timeout: Duration,
    pub cache_ttl: Duration,
    pub retry: RetryConfig,
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(3600),
            retry: RetryConfig::default(),
        }
    }
}

/// Process-wide Open-Meteo client; cheap to clone, shares its cache
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    endpoint: Url,
    call_timeout: Duration,
    retry: RetryConfig,
    cache: Arc<ResponseCache>,
}

impl OpenMeteoClient {
    pub fn new(config: OpenMeteoConfig) -> ProviderResult<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        let endpoint = Url::parse(&config.base_url)?;

        Ok(Self {
            http,
            endpoint,
            call_timeout: config.call_timeout,
            retry: config.retry,
            cache: Arc::new(ResponseCache::new(config.cache_ttl)),
        })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    fn request_url(&self, coords: Coordinates, params: &[(&str, String)]) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &coords.latitude.to_string())
            .append_pair("longitude", &coords.longitude.to_string())
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        url
    }

    /// GET `url`, from cache when fresh, otherwise with retries under the
    /// overall call timeout.
    async fn get_body(&self, url: Url) -> ProviderResult<String> {
        let key = url.as_str().to_string();
        if let Some(body) = self.cache.get(&key).await {
            debug!(%url, "Provider cache hit");
            return Ok(body);
        }

        let fetch = async {
            let response = with_retry(&self.retry, || self.http.get(url.clone()).send()).await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    reason: error_reason(&body),
                });
            }
            Ok(body)
        };

        let body = tokio::time::timeout(self.call_timeout, fetch)
            .await
            .map_err(|_| ProviderError::Timeout(self.call_timeout))??;

        self.cache.insert(key, body.clone()).await;
        Ok(body)
    }

    /// Current temperature, surface pressure and wind speed
    #[instrument(skip(self))]
    pub async fn current(&self, coords: Coordinates) -> ProviderResult<CurrentConditions> {
        let url = self.request_url(
            coords,
            &[
                ("current", CURRENT_VARIABLES.join(",")),
                ("timezone", "GMT".to_string()),
            ],
        );
        let body = self.get_body(url).await?;
        decode_current(&body)
    }

    /// Hourly forecast for `variables`, time axis in UTC epoch seconds
    #[instrument(skip(self))]
    pub async fn hourly(
        &self,
        coords: Coordinates,
        variables: &[String],
    ) -> ProviderResult<HourlySeries> {
        let url = self.request_url(
            coords,
            &[
                ("hourly", variables.join(",")),
                ("timezone", "auto".to_string()),
                ("timeformat", "unixtime".to_string()),
            ],
        );
        let body = self.get_body(url).await?;
        decode_hourly(&body)
    }
}

#[async_trait::async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn fetch_current(&self, coords: Coordinates) -> anyhow::Result<CurrentConditions> {
        self.current(coords).await.with_context(|| {
            format!(
                "current weather request for ({}, {}) failed",
                coords.latitude, coords.longitude
            )
        })
    }

    async fn fetch_hourly(
        &self,
        coords: Coordinates,
        variables: &[String],
    ) -> anyhow::Result<HourlySeries> {
        self.hourly(coords, variables).await.with_context(|| {
            format!(
                "hourly forecast request for ({}, {}) failed",
                coords.latitude, coords.longitude
            )
        })
    }
}

#[derive(Debug, Deserialize)]
struct OmErrorBody {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct OmCurrentResponse {
    current: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct OmHourlyResponse {
    #[serde(default)]
    utc_offset_seconds: i64,
    hourly: Option<OmHourly>,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<i64>,
    #[serde(flatten)]
    series: HashMap<String, Value>,
}

/// Open-Meteo reports failures as `{"error": true, "reason": "..."}`
fn error_reason(body: &str) -> String {
    serde_json::from_str::<OmErrorBody>(body)
        .map(|e| e.reason)
        .unwrap_or_else(|_| truncate_body(body))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

pub fn decode_current(body: &str) -> ProviderResult<CurrentConditions> {
    let parsed: OmCurrentResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

    let mut conditions = CurrentConditions::new();
    for name in CURRENT_VARIABLES {
        let value = parsed
            .current
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                ProviderError::Decode(format!("missing or non-numeric current value '{name}'"))
            })?;
        conditions.push(name, value);
    }
    Ok(conditions)
}

pub fn decode_hourly(body: &str) -> ProviderResult<HourlySeries> {
    let parsed: OmHourlyResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    let hourly = parsed
        .hourly
        .ok_or_else(|| ProviderError::Decode("response has no hourly block".into()))?;

    let grid = grid_from_axis(&hourly.time)?;
    debug!(
        samples = grid.len(),
        utc_offset_seconds = parsed.utc_offset_seconds,
        "Decoded hourly grid"
    );

    let mut forecast = HourlySeries::new(grid);
    for (name, value) in hourly.series {
        let samples = decode_samples(&name, &value)?;
        forecast.series.insert(name, samples);
    }
    Ok(forecast)
}

fn decode_samples(name: &str, value: &Value) -> ProviderResult<Vec<Option<f64>>> {
    let items = value
        .as_array()
        .ok_or_else(|| ProviderError::Decode(format!("hourly '{name}' is not an array")))?;

    items
        .iter()
        .map(|item| match item {
            Value::Null => Ok(None),
            other => other.as_f64().map(Some).ok_or_else(|| {
                ProviderError::Decode(format!("hourly '{name}' holds a non-numeric sample"))
            }),
        })
        .collect()
}

fn epoch(secs: i64) -> ProviderResult<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| ProviderError::Decode(format!("timestamp {secs} out of range")))
}

/// Grid metadata from the response time axis: first sample, spacing, and one
/// interval past the last sample.
fn grid_from_axis(time: &[i64]) -> ProviderResult<HourlyGrid> {
    let (first, last) = match (time.first(), time.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(ProviderError::Decode("hourly time axis is empty".into())),
    };

    let out_of_range = || ProviderError::Decode("hourly time axis out of range".into());

    let interval = match time {
        [a, b, ..] => b.checked_sub(*a).ok_or_else(out_of_range)?,
        _ => DEFAULT_HOURLY_INTERVAL_SECS,
    };
    for w in time.windows(2) {
        let step = w[1].checked_sub(w[0]).ok_or_else(out_of_range)?;
        if step != interval {
            return Err(ProviderError::Decode(
                "hourly time axis is not evenly spaced".into(),
            ));
        }
    }
    let end = last.checked_add(interval).ok_or_else(out_of_range)?;

    HourlyGrid::new(epoch(first)?, epoch(end)?, interval)
        .map_err(|e| ProviderError::Decode(e.to_string()))
}
