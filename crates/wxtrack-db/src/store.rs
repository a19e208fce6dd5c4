//! `LocationStore` seam backed by the SQLite client

use anyhow::Result;
use wxtrack_core::{LocationStore, TrackedLocation, UserId, WeatherSnapshot};

use crate::{DbClient, DbError};

#[async_trait::async_trait]
impl LocationStore for DbClient {
    async fn list_tracked_locations(&self) -> Result<Vec<TrackedLocation>> {
        Ok(self.list_all_locations().await?)
    }

    async fn write_snapshot(
        &self,
        user_id: UserId,
        name: &str,
        snapshot: &WeatherSnapshot,
    ) -> Result<()> {
        Ok(self.update_snapshot(user_id, name, snapshot).await?)
    }

    async fn read_snapshot(&self, user_id: UserId, name: &str) -> Result<Option<WeatherSnapshot>> {
        match self.get_snapshot(user_id, name).await {
            Ok(snapshot) => Ok(snapshot),
            Err(DbError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
