//! Refresh scheduler

use anyhow::{Context, Result};
use chrono::Utc;
use futures::{future, stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use wxtrack_core::{LocationStore, TrackedLocation, UserId, WeatherProvider, WeatherSnapshot};

/// Pause between the end of one cycle and the start of the next
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(900);

/// Locations refreshed at once within a cycle
pub const DEFAULT_CONCURRENCY: usize = 4;

/// What happened to one location's snapshot this cycle
#[derive(Debug, Clone, PartialEq)]
pub enum LocationOutcome {
    Updated,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationReport {
    pub user_id: UserId,
    pub name: String,
    pub outcome: LocationOutcome,
    /// False when the store rejected the snapshot write
    pub persisted: bool,
}

/// Summary of one refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub total: usize,
    pub updated: usize,
    pub failed: usize,
    pub write_errors: usize,
    /// Locations not attempted because cancellation was requested
    pub skipped: usize,
}

impl CycleReport {
    fn from_reports(total: usize, reports: &[LocationReport]) -> Self {
        let mut summary = CycleReport {
            total,
            skipped: total - reports.len(),
            ..Default::default()
        };
        for report in reports {
            match report.outcome {
                LocationOutcome::Updated => summary.updated += 1,
                LocationOutcome::Failed { .. } => summary.failed += 1,
            }
            if !report.persisted {
                summary.write_errors += 1;
            }
        }
        summary
    }
}

/// Keeps every tracked location's snapshot current
pub struct Refresher {
    store: Arc<dyn LocationStore>,
    provider: Arc<dyn WeatherProvider>,
    interval: Duration,
    concurrency: usize,
}

impl Refresher {
    pub fn new(store: Arc<dyn LocationStore>, provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            store,
            provider,
            interval: DEFAULT_REFRESH_INTERVAL,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// `1` refreshes locations one after another
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch current conditions for `location`; a provider failure becomes
    /// an error marker.
    async fn snapshot_for(&self, location: &TrackedLocation) -> WeatherSnapshot {
        match self.provider.fetch_current(location.coordinates).await {
            Ok(conditions) => WeatherSnapshot::observed(&conditions, Utc::now()),
            Err(e) => {
                WeatherSnapshot::failed(format!("failed to refresh weather: {e:#}"), Utc::now())
            }
        }
    }

    /// Refresh one location and persist the result
    pub async fn refresh_location(&self, location: &TrackedLocation) -> LocationReport {
        let snapshot = self.snapshot_for(location).await;

        let outcome = match &snapshot {
            WeatherSnapshot::Failed { error, .. } => {
                warn!(
                    user_id = location.user_id,
                    location = %location.name,
                    error = %error,
                    "Weather refresh failed"
                );
                LocationOutcome::Failed {
                    error: error.clone(),
                }
            }
            WeatherSnapshot::Observed { .. } => LocationOutcome::Updated,
        };

        let persisted = match self
            .store
            .write_snapshot(location.user_id, &location.name, &snapshot)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(
                    user_id = location.user_id,
                    location = %location.name,
                    error = %format!("{e:#}"),
                    "Failed to store snapshot"
                );
                false
            }
        };

        LocationReport {
            user_id: location.user_id,
            name: location.name.clone(),
            outcome,
            persisted,
        }
    }

    /// Run one full cycle over every tracked location
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.cycle(&CancellationToken::new()).await
    }

    async fn cycle(&self, cancel: &CancellationToken) -> Result<CycleReport> {
        let locations = self
            .store
            .list_tracked_locations()
            .await
            .context("failed to enumerate tracked locations")?;
        let total = locations.len();

        let reports: Vec<LocationReport> = stream::iter(locations.iter())
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|location| self.refresh_location(location))
            .boxed()
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        Ok(CycleReport::from_reports(total, &reports))
    }

    /// Refresh forever, sleeping `interval` after each cycle, until `cancel`
    /// fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            concurrency = self.concurrency,
            "Refresh loop started"
        );

        let mut cycle_no: u64 = 0;
        while !cancel.is_cancelled() {
            cycle_no += 1;
            let span = info_span!("refresh_cycle", cycle = cycle_no);
            match self.cycle(&cancel).instrument(span).await {
                Ok(report) => info!(
                    cycle = cycle_no,
                    total = report.total,
                    updated = report.updated,
                    failed = report.failed,
                    write_errors = report.write_errors,
                    skipped = report.skipped,
                    "Refresh cycle complete"
                ),
                // Continue running despite errors
                Err(e) => error!(cycle = cycle_no, error = %format!("{e:#}"), "Refresh cycle failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Refresh loop stopped");
    }

    /// Run the loop as a background task
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
