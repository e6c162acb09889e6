// HTTP request handlers
use crate::application::metrics_store::MetricsStore;
use crate::domain::error::StoreError;
use crate::domain::snapshot::PollResponse;
use crate::presentation::app_state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MAX_HOURS: f64 = 24.0 * 365.0;

#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    Validation(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // Store failures reach the caller as explicit failures, never
            // swallowed; details go to the log, not the wire.
            ApiError::Store(e) => {
                tracing::error!("store failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(PollResponse::err("internal storage error")),
                )
                    .into_response()
            }
            ApiError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(PollResponse::err(msg))).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HoursRequest {
    // Raw so a non-numeric body yields our validation message, not a
    // deserializer rejection
    pub hours: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub success: bool,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub deleted: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub status: &'static str,
    pub connections: usize,
    pub total_events: u64,
    pub broadcasts_sent: u64,
}

fn parse_hours(req: &HoursRequest) -> Result<f64, ApiError> {
    let value = req
        .hours
        .as_ref()
        .ok_or_else(|| ApiError::Validation("missing field: hours".to_string()))?;
    let hours = value
        .as_f64()
        .ok_or_else(|| ApiError::Validation("hours must be a number".to_string()))?;
    if !hours.is_finite() || hours <= 0.0 {
        return Err(ApiError::Validation(
            "hours must be a positive number".to_string(),
        ));
    }
    if hours > MAX_HOURS {
        return Err(ApiError::Validation(format!(
            "hours must be at most {MAX_HOURS}"
        )));
    }
    Ok(hours)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Pull transport: the same snapshot shape the push transport sends.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PollResponse>, ApiError> {
    let snapshot = state.snapshots.snapshot()?;
    Ok(Json(PollResponse::ok(snapshot)))
}

/// Seed backdated history into the store.
pub async fn seed(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HoursRequest>,
) -> Result<Json<SeedResponse>, ApiError> {
    let hours = parse_hours(&req)?;
    if hours.fract() != 0.0 {
        return Err(ApiError::Validation(
            "hours must be a whole number of hours".to_string(),
        ));
    }
    let count = state.generator.seed(hours as u32)?;
    Ok(Json(SeedResponse {
        success: true,
        count,
    }))
}

/// Retention cleanup: delete everything older than `hours` ago.
pub async fn cleanup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HoursRequest>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let hours = parse_hours(&req)?;
    let cutoff = Utc::now() - Duration::milliseconds((hours * 3_600_000.0) as i64);
    let deleted = state.store.cleanup(cutoff)?;
    Ok(Json(CleanupResponse {
        success: true,
        deleted,
    }))
}

/// Live-connection count and aggregate counters.
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    Ok(Json(StatsResponse {
        status: "ok",
        connections: state.hub.connection_count(),
        total_events: state.store.total_events()?,
        broadcasts_sent: state.hub.broadcasts_sent(),
    }))
}
