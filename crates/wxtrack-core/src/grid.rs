//! Hourly forecast grid and series alignment
//!
//! A provider returns hourly samples on an evenly spaced grid described by
//! a start instant, an end instant (excluded) and a fixed interval. Lookups
//! are exact: an instant either sits on a grid point or it is not found.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Grid construction error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("Grid interval must be positive, got {0}s")]
    NonPositiveInterval(i64),

    #[error("Grid end {end} precedes start {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Evenly spaced, half-open set of sample instants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourlyGrid {
    start: DateTime<Utc>,
    interval_secs: i64,
    count: usize,
}

impl HourlyGrid {
    /// Build the grid `[start, end)` sampled every `interval_secs`.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval_secs: i64,
    ) -> Result<Self, GridError> {
        if interval_secs <= 0 {
            return Err(GridError::NonPositiveInterval(interval_secs));
        }
        if end < start {
            return Err(GridError::EndBeforeStart { start, end });
        }

        let span = (end - start).num_seconds();
        // ceil(span / interval): a partial trailing step still yields a sample
        let count = (span + interval_secs - 1) / interval_secs;

        Ok(Self {
            start,
            interval_secs,
            count: count as usize,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// First instant past the last sample
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::seconds(self.interval_secs * self.count as i64)
    }

    pub fn interval_secs(&self) -> i64 {
        self.interval_secs
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Instant of the sample at `index`, if it exists
    pub fn instant(&self, index: usize) -> Option<DateTime<Utc>> {
        (index < self.count)
            .then(|| self.start + Duration::seconds(self.interval_secs * index as i64))
    }

    /// Position of `instant` on the grid, or `None` when it is not a member.
    pub fn index_of(&self, instant: DateTime<Utc>) -> Option<usize> {
        if instant.timestamp_subsec_nanos() != self.start.timestamp_subsec_nanos() {
            return None;
        }

        let secs = instant.timestamp() - self.start.timestamp();
        if secs < 0 || secs % self.interval_secs != 0 {
            return None;
        }

        let index = usize::try_from(secs / self.interval_secs).ok()?;
        (index < self.count).then_some(index)
    }
}

/// Hourly forecast returned by the provider for one request
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    pub grid: HourlyGrid,
    /// Samples per variable, aligned with the grid by index
    pub series: HashMap<String, Vec<Option<f64>>>,
}

impl HourlySeries {
    pub fn new(grid: HourlyGrid) -> Self {
        Self {
            grid,
            series: HashMap::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, samples: Vec<Option<f64>>) -> Self {
        self.series.insert(name.into(), samples);
        self
    }

    pub fn samples(&self, name: &str) -> Option<&[Option<f64>]> {
        self.series.get(name).map(Vec::as_slice)
    }
}
