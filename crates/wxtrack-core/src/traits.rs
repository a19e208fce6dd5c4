use anyhow::Result;

use crate::{Coordinates, CurrentConditions, HourlySeries, TrackedLocation, UserId, WeatherSnapshot};

/// Remote source of weather data
#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions at `coords`, one value per variable in
    /// [`crate::CURRENT_VARIABLES`] order.
    async fn fetch_current(&self, coords: Coordinates) -> Result<CurrentConditions>;

    /// Hourly forecast for `variables` over the provider's default horizon.
    async fn fetch_hourly(&self, coords: Coordinates, variables: &[String])
        -> Result<HourlySeries>;
}

/// Persistent home of tracked locations and their latest snapshot
#[async_trait::async_trait]
pub trait LocationStore: Send + Sync {
    async fn list_tracked_locations(&self) -> Result<Vec<TrackedLocation>>;

    /// Replace the snapshot of one location in a single atomic write.
    async fn write_snapshot(
        &self,
        user_id: UserId,
        name: &str,
        snapshot: &WeatherSnapshot,
    ) -> Result<()>;

    async fn read_snapshot(&self, user_id: UserId, name: &str) -> Result<Option<WeatherSnapshot>>;
}
