//! API handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wxtrack_core::{
    hour_timestamp, parse_variable_list, Coordinates, CurrentConditions, HourlyValues, QueryError,
    UserId, WeatherSnapshot, DEFAULT_HOURLY_VARIABLES,
};
use wxtrack_db::DbClient;

use crate::{ApiError, AppState};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct AddCityRequest {
    pub user_id: UserId,
    pub city_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CitiesResponse {
    pub user_id: UserId,
    pub cities: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub user_id: UserId,
    pub city_name: String,
}

#[derive(Debug, Serialize)]
pub struct CityWeatherResponse {
    pub city_name: String,
    pub weather: Option<WeatherSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct CoordinatesRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct CurrentWeatherResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub weather: CurrentConditions,
}

#[derive(Debug, Deserialize)]
pub struct HourlyQuery {
    pub user_id: UserId,
    pub city_name: String,
    pub hour: i64,
    pub params: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HourlyResponse {
    pub city_name: String,
    pub time: String,
    pub weather: HourlyValues,
}

async fn require_user(db: &DbClient, user_id: UserId) -> Result<(), ApiError> {
    match db.get_user(user_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound("User not found".into())),
    }
}

fn city_not_found(user_id: UserId, city_name: &str) -> ApiError {
    ApiError::NotFound(format!("City '{city_name}' not found for user {user_id}"))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<RegisterResponse> {
    state.count_request("/register");

    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username must not be empty".into()));
    }
    let user_id = state.db.add_user(username).await?;
    tracing::info!(user_id, "User registered");
    Ok(Json(RegisterResponse { user_id }))
}

pub async fn add_city(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddCityRequest>,
) -> ApiResult<Value> {
    state.count_request("/add_city");

    let city_name = req.city_name.trim();
    if city_name.is_empty() {
        return Err(ApiError::BadRequest("city_name must not be empty".into()));
    }
    let coords = Coordinates::new(req.latitude, req.longitude)?;
    require_user(&state.db, req.user_id).await?;

    state.db.add_location(req.user_id, city_name, coords).await?;
    tracing::info!(user_id = req.user_id, city = %city_name, "City added");
    Ok(Json(json!({
        "message": format!("City '{city_name}' added for user {}", req.user_id)
    })))
}

pub async fn cities(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> ApiResult<CitiesResponse> {
    state.count_request("/cities");

    require_user(&state.db, q.user_id).await?;
    let rows = state.db.list_locations_for_user(q.user_id).await?;
    Ok(Json(CitiesResponse {
        user_id: q.user_id,
        cities: rows.into_iter().map(|row| row.name).collect(),
    }))
}

/// Latest stored snapshot; `weather` is null until the first refresh
pub async fn city_weather(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CityQuery>,
) -> ApiResult<CityWeatherResponse> {
    state.count_request("/city_weather");

    require_user(&state.db, q.user_id).await?;
    let row = state
        .db
        .get_location(q.user_id, &q.city_name)
        .await?
        .ok_or_else(|| city_not_found(q.user_id, &q.city_name))?;

    Ok(Json(CityWeatherResponse {
        weather: row.snapshot()?,
        city_name: row.name,
    }))
}

pub async fn current_weather(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CoordinatesRequest>,
) -> ApiResult<CurrentWeatherResponse> {
    state.count_request("/weather");

    let coords = Coordinates::new(req.latitude, req.longitude)?;
    let weather = state
        .provider
        .fetch_current(coords)
        .await
        .map_err(|e| QueryError::upstream(&e))?;

    Ok(Json(CurrentWeatherResponse {
        latitude: coords.latitude,
        longitude: coords.longitude,
        weather,
    }))
}

/// Forecast values for `hour` (UTC) of the current day at a tracked city.
///
/// The hour is checked before any lookup so an out-of-range hour is a 400
/// even for unknown users.
pub async fn hourly_weather_by_hour(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HourlyQuery>,
) -> ApiResult<HourlyResponse> {
    state.count_request("/hourly_weather_by_hour");

    let date = Utc::now().date_naive();
    let time = hour_timestamp(date, q.hour)?;

    require_user(&state.db, q.user_id).await?;
    let row = state
        .db
        .get_location(q.user_id, &q.city_name)
        .await?
        .ok_or_else(|| city_not_found(q.user_id, &q.city_name))?;

    let variables = match q.params.as_deref() {
        Some(raw) => parse_variable_list(raw),
        None => DEFAULT_HOURLY_VARIABLES.iter().map(|s| s.to_string()).collect(),
    };

    let weather = state
        .resolver
        .resolve_hour(row.tracked().coordinates, date, q.hour, &variables)
        .await?;

    Ok(Json(HourlyResponse {
        city_name: row.name,
        time,
        weather,
    }))
}
