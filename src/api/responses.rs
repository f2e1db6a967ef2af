//! API request and response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    clock::TimerStatus,
    error::TimerError,
    state::TimerRecord,
    tasks::Visibility,
    utils::format_hms,
};

/// Body of `POST /timers/:id/init`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitRequest {
    pub status: TimerStatus,
    #[serde(default)]
    pub accumulated_seconds: u64,
    #[serde(default)]
    pub started_at: Option<String>,
    /// Authoritative now, epoch milliseconds
    pub server_now: i64,
}

/// Body of `POST /timers/:id/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub server_now: i64,
    pub started_at: String,
}

/// Body of `POST /timers/:id/pause` and `POST /timers/:id/stop`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEndRequest {
    pub accumulated_seconds: u64,
}

/// Body of `POST /timers/:id/sync`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub server_now: i64,
}

/// Body of `POST /visibility`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

/// One timer as seen by consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub id: String,
    pub timer: TimerRecord,
    /// Elapsed seconds computed at response time
    pub current_seconds: u64,
    /// `current_seconds` as HH:MM:SS
    pub display: String,
    pub timestamp: DateTime<Utc>,
}

impl TimerResponse {
    pub fn new(id: String, timer: TimerRecord, current_seconds: u64) -> Self {
        Self {
            id,
            timer,
            current_seconds,
            display: format_hms(current_seconds),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerListResponse {
    pub count: usize,
    pub timers: Vec<TimerResponse>,
}

/// Result of a reference count change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefResponse {
    pub id: String,
    pub reference_count: u32,
    pub removed: bool,
    pub timestamp: DateTime<Utc>,
}

impl RefResponse {
    pub fn new(id: String, reference_count: u32) -> Self {
        Self {
            id,
            reference_count,
            removed: reference_count == 0,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityResponse {
    pub visibility: Visibility,
    pub changed: bool,
    pub ticking: bool,
    pub timestamp: DateTime<Utc>,
}

/// Scheduler status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub visibility: Visibility,
    pub ticking: bool,
    pub tick_period_ms: u64,
    pub timers: usize,
    pub running: usize,
    pub last_visibility_change_at: Option<DateTime<Utc>>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error body returned for rejected operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A rejected timer operation, rendered as JSON with a matching status code
#[derive(Debug)]
pub struct ApiError(pub TimerError);

impl From<TimerError> for ApiError {
    fn from(e: TimerError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            TimerError::InvalidTransition { .. } | TimerError::NotRunning { .. } => {
                StatusCode::CONFLICT
            }
            TimerError::MalformedTimestamp { .. } | TimerError::MissingStartTime => {
                StatusCode::BAD_REQUEST
            }
            TimerError::UnknownTimer { .. } => StatusCode::NOT_FOUND,
            TimerError::StatePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            status: "error".to_string(),
            message: self.0.to_string(),
            timestamp: Utc::now(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Epoch milliseconds to a UTC datetime, if representable
pub fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
