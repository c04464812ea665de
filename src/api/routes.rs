use crate::config::Config;
use crate::intake::aggregate::DaySummary;
use crate::intake::goal::{UserProfile, calculate_daily_goal};
use crate::intake::manager::{CalendarDay, DayRecordManager, HistoryEntry};
use crate::intake::{EntryError, parse_date, parse_month, today};
use crate::store::ProfileStore;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub manager: Arc<Mutex<DayRecordManager>>,
    pub profiles: ProfileStore,
}

impl ApiState {
    fn manager(&self) -> ApiResult<MutexGuard<'_, DayRecordManager>> {
        self.manager
            .lock()
            .map_err(|_| ApiError::Internal(anyhow::anyhow!("record manager lock poisoned")))
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/day/:date", get(day_get))
        .route(
            "/api/v1/day/:date/drinks",
            post(drinks_add).delete(drinks_clear),
        )
        .route("/api/v1/calendar", get(calendar))
        .route("/api/v1/history", get(history))
        .route("/api/v1/profile", get(profile_get).put(profile_put))
        .route("/api/v1/goal", get(goal))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CalendarQuery {
    month: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct AddDrinkPayload {
    #[serde(rename = "type")]
    kind: Option<String>,
    amount: i64,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    today: String,
    records: usize,
    profile_set: bool,
    live_goal: u32,
    storage_backend: String,
    api_port: u16,
}

#[derive(Debug, Serialize)]
struct CalendarPayload {
    month: String,
    days: Vec<CalendarDay>,
}

#[derive(Debug, Serialize)]
struct HistoryPayload {
    count: usize,
    records: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
struct GoalPayload {
    goal: u32,
    profile: Option<UserProfile>,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let manager = state.manager()?;

    Ok(Json(StatusPayload {
        today: crate::intake::date_key(today()),
        records: manager.records().len(),
        profile_set: state.profiles.load().is_some(),
        live_goal: manager.live_goal(),
        storage_backend: state
            .config
            .get_value("storage_backend")
            .unwrap_or_default(),
        api_port: state.config.api_port,
    }))
}

async fn day_get(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> ApiResult<Json<DaySummary>> {
    let date = parse_path_date(&date)?;
    let manager = state.manager()?;

    Ok(Json(manager.summary(date)))
}

async fn drinks_add(
    State(state): State<ApiState>,
    Path(date): Path<String>,
    Json(payload): Json<AddDrinkPayload>,
) -> ApiResult<Json<DaySummary>> {
    let date = parse_path_date(&date)?;
    let kind = payload
        .kind
        .unwrap_or_else(|| state.config.default_drink.name().to_string());
    let mut manager = state.manager()?;

    manager.add_entry_named(date, &kind, payload.amount)?;

    Ok(Json(manager.summary(date)))
}

async fn drinks_clear(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> ApiResult<Json<DaySummary>> {
    let date = parse_path_date(&date)?;
    let mut manager = state.manager()?;

    if !manager.clear_day(date) {
        return Err(ApiError::NotFound(format!("No intake record for date: {date}")));
    }

    Ok(Json(manager.summary(date)))
}

async fn calendar(
    State(state): State<ApiState>,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<Json<CalendarPayload>> {
    let month = query
        .month
        .as_deref()
        .map(parse_month)
        .transpose()
        .map_err(|error| ApiError::BadRequest(error.to_string()))?
        .unwrap_or_else(today);
    let manager = state.manager()?;
    let days = manager.calendar_month(month)?;

    Ok(Json(CalendarPayload {
        month: month.format("%Y-%m").to_string(),
        days,
    }))
}

async fn history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryPayload>> {
    let manager = state.manager()?;
    let records = manager.history(query.limit);

    Ok(Json(HistoryPayload {
        count: records.len(),
        records,
    }))
}

async fn profile_get(State(state): State<ApiState>) -> ApiResult<Json<GoalPayload>> {
    let profile = state.profiles.load();

    Ok(Json(GoalPayload {
        goal: calculate_daily_goal(profile.as_ref()),
        profile,
    }))
}

async fn profile_put(
    State(state): State<ApiState>,
    Json(profile): Json<UserProfile>,
) -> ApiResult<Json<GoalPayload>> {
    profile
        .validate()
        .map_err(|error| ApiError::BadRequest(error.to_string()))?;
    state.profiles.save(&profile)?;

    Ok(Json(GoalPayload {
        goal: calculate_daily_goal(Some(&profile)),
        profile: Some(profile),
    }))
}

async fn goal(State(state): State<ApiState>) -> ApiResult<Json<GoalPayload>> {
    profile_get(State(state)).await
}

fn parse_path_date(input: &str) -> ApiResult<NaiveDate> {
    parse_date(input).map_err(|error| ApiError::BadRequest(error.to_string()))
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<EntryError> for ApiError {
    fn from(value: EntryError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}
