//! Hourly resolver: answers "what will these variables be at this hour?"

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    Coordinates, HourlySeries, HourlyValue, HourlyValues, QueryError, QueryResult,
    WeatherProvider,
};

/// Build the UTC timestamp string for `hour` on `date`.
///
/// Rejects hours outside 0..=23 so callers can validate before any
/// provider call is made.
pub fn hour_timestamp(date: NaiveDate, hour: i64) -> QueryResult<String> {
    if !(0..=23).contains(&hour) {
        return Err(QueryError::Validation(format!(
            "hour must be within [0, 23], got {hour}"
        )));
    }
    Ok(format!("{}T{:02}:00:00Z", date.format("%Y-%m-%d"), hour))
}

/// Parse an RFC 3339 / ISO-8601 instant and normalise it to UTC.
pub fn parse_target_time(timestamp: &str) -> QueryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| QueryError::Validation(format!("invalid timestamp {timestamp:?}: {e}")))
}

/// Pick the samples at `target` out of `forecast`, in `variables` order.
pub fn extract_hour(
    forecast: &HourlySeries,
    target: DateTime<Utc>,
    variables: &[String],
) -> QueryResult<HourlyValues> {
    let index = forecast.grid.index_of(target).ok_or_else(|| {
        QueryError::NotFound(format!(
            "no forecast data for {} (grid {} .. {} every {}s)",
            target.to_rfc3339(),
            forecast.grid.start().to_rfc3339(),
            forecast.grid.end().to_rfc3339(),
            forecast.grid.interval_secs()
        ))
    })?;

    let mut values = HourlyValues::new();
    for name in variables {
        let value = match forecast.samples(name) {
            None => HourlyValue::Missing,
            Some(samples) => match samples.get(index) {
                Some(Some(v)) => HourlyValue::Value(*v),
                Some(None) => HourlyValue::Missing,
                None => HourlyValue::ExtractionError(format!(
                    "failed to extract data: index {index} out of range for {} samples",
                    samples.len()
                )),
            },
        };
        values.push(name.clone(), value);
    }
    Ok(values)
}

/// Resolves hourly queries against the shared provider client
#[derive(Clone)]
pub struct HourlyResolver {
    provider: Arc<dyn WeatherProvider>,
}

impl HourlyResolver {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    /// Validate `hour`, then resolve it on `date` (UTC).
    pub async fn resolve_hour(
        &self,
        coords: Coordinates,
        date: NaiveDate,
        hour: i64,
        variables: &[String],
    ) -> QueryResult<HourlyValues> {
        let timestamp = hour_timestamp(date, hour)?;
        self.resolve(coords, &timestamp, variables).await
    }

    #[instrument(skip(self, variables), fields(vars = variables.len()))]
    pub async fn resolve(
        &self,
        coords: Coordinates,
        timestamp: &str,
        variables: &[String],
    ) -> QueryResult<HourlyValues> {
        if variables.is_empty() {
            return Err(QueryError::Validation(
                "at least one variable is required".into(),
            ));
        }
        let target = parse_target_time(timestamp)?;

        let forecast = self
            .provider
            .fetch_hourly(coords, variables)
            .await
            .map_err(|e| QueryError::upstream(&e))?;

        debug!(
            samples = forecast.grid.len(),
            series = forecast.series.len(),
            "Hourly forecast received"
        );

        extract_hour(&forecast, target, variables)
    }
}
