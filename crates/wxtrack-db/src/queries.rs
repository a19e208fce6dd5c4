//! Query operations for users and tracked locations

use crate::schema::{LocationRow, UserRow};
use crate::{DbClient, DbError, DbResult};
use tracing::{debug, instrument};
use wxtrack_core::{Coordinates, TrackedLocation, UserId, WeatherSnapshot};

const LOCATION_COLUMNS: &str =
    "user_id, name, latitude, longitude, weather, last_updated";

/// Map sqlx constraint failures onto store-level errors
fn constraint_error(err: sqlx::Error, what: &str) -> DbError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return DbError::ConstraintViolation(format!("{what} already exists"));
        }
        if db_err.is_foreign_key_violation() {
            return DbError::NotFound;
        }
    }
    DbError::ConnectionError(err)
}

impl DbClient {
    /// Register a user and return its id
    #[instrument(skip(self))]
    pub async fn add_user(&self, username: &str) -> DbResult<UserId> {
        let result = sqlx::query("INSERT INTO users (username) VALUES (?)")
            .bind(username)
            .execute(self.pool())
            .await?;

        let id = result.last_insert_rowid();
        debug!("Registered user {} as {}", username, id);
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: UserId) -> DbResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>("SELECT id, username FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(user)
    }

    /// Start tracking `name` for `user_id`; names are unique per user
    #[instrument(skip(self))]
    pub async fn add_location(
        &self,
        user_id: UserId,
        name: &str,
        coords: Coordinates,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO locations (user_id, name, latitude, longitude)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(coords.latitude)
        .bind(coords.longitude)
        .execute(self.pool())
        .await
        .map_err(|e| constraint_error(e, &format!("location '{name}'")))?;

        debug!("Added location {} for user {}", name, user_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_location(&self, user_id: UserId, name: &str) -> DbResult<Option<LocationRow>> {
        let row = sqlx::query_as::<_, LocationRow>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE user_id = ? AND name = ?"
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    pub async fn list_locations_for_user(&self, user_id: UserId) -> DbResult<Vec<LocationRow>> {
        let rows = sqlx::query_as::<_, LocationRow>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE user_id = ? ORDER BY id ASC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Every tracked location across all users
    #[instrument(skip(self))]
    pub async fn list_all_locations(&self) -> DbResult<Vec<TrackedLocation>> {
        let rows = sqlx::query_as::<_, LocationRow>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations ORDER BY id ASC"
        ))
        .fetch_all(self.pool())
        .await?;

        debug!("Listed {} tracked locations", rows.len());
        Ok(rows.iter().map(LocationRow::tracked).collect())
    }

    /// Overwrite the snapshot of one location
    #[instrument(skip(self, snapshot))]
    pub async fn update_snapshot(
        &self,
        user_id: UserId,
        name: &str,
        snapshot: &WeatherSnapshot,
    ) -> DbResult<()> {
        let blob = snapshot.to_json()?;
        let result = sqlx::query(
            r#"
            UPDATE locations
            SET weather = ?, last_updated = ?
            WHERE user_id = ? AND name = ?
            "#,
        )
        .bind(blob)
        .bind(snapshot.last_updated().to_rfc3339())
        .bind(user_id)
        .bind(name)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        debug!("Snapshot written for {}/{}", user_id, name);
        Ok(())
    }

    /// Latest snapshot of one location; `Ok(None)` if never refreshed
    #[instrument(skip(self))]
    pub async fn get_snapshot(
        &self,
        user_id: UserId,
        name: &str,
    ) -> DbResult<Option<WeatherSnapshot>> {
        match self.get_location(user_id, name).await? {
            Some(row) => row.snapshot(),
            None => Err(DbError::NotFound),
        }
    }
}
