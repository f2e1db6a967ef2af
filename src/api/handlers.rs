//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream, StreamExt};
use tracing::{info, warn};

use super::responses::{
    millis_to_datetime, ApiError, HealthResponse, InitRequest, RefResponse, SegmentEndRequest,
    StartRequest, StatusResponse, SyncRequest, TimerListResponse, TimerResponse,
    VisibilityRequest, VisibilityResponse,
};
use crate::{
    error::TimerError,
    state::{AppState, TimerEvent, TimerInit, TimerRecord, TimerSubscription},
    tasks::Visibility,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

fn timer_response(state: &AppState, id: String, record: TimerRecord) -> TimerResponse {
    let current = state.scheduler.current_seconds(&id).unwrap_or(record.seconds);
    TimerResponse::new(id, record, current)
}

/// Handle POST /timers/:id/init
pub async fn init_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<InitRequest>,
) -> ApiResult<TimerResponse> {
    let record = state.scheduler.init(
        &id,
        TimerInit {
            status: req.status,
            accumulated_seconds: req.accumulated_seconds,
            started_at: req.started_at,
            authoritative_now: req.server_now,
        },
    )?;
    Ok(Json(timer_response(&state, id, record)))
}

/// Handle POST /timers/:id/start
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StartRequest>,
) -> ApiResult<TimerResponse> {
    let record = state.scheduler.start(&id, req.server_now, &req.started_at)?;
    Ok(Json(timer_response(&state, id, record)))
}

/// Handle POST /timers/:id/pause
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SegmentEndRequest>,
) -> ApiResult<TimerResponse> {
    let record = state.scheduler.pause(&id, req.accumulated_seconds)?;
    Ok(Json(timer_response(&state, id, record)))
}

/// Handle POST /timers/:id/stop
pub async fn stop_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SegmentEndRequest>,
) -> ApiResult<TimerResponse> {
    let record = state.scheduler.stop(&id, req.accumulated_seconds)?;
    Ok(Json(timer_response(&state, id, record)))
}

/// Handle POST /timers/:id/sync
pub async fn sync_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SyncRequest>,
) -> ApiResult<TimerResponse> {
    let record = state.scheduler.sync_now(&id, req.server_now)?;
    Ok(Json(timer_response(&state, id, record)))
}

/// Handle POST /timers/:id/ref
pub async fn add_ref_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<RefResponse> {
    let count = state.scheduler.add_ref(&id)?;
    Ok(Json(RefResponse::new(id, count)))
}

/// Handle DELETE /timers/:id/ref
pub async fn remove_ref_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<RefResponse> {
    let count = state.scheduler.remove_ref(&id)?;
    Ok(Json(RefResponse::new(id, count)))
}

/// Handle GET /timers/:id
pub async fn get_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TimerResponse> {
    let record = state
        .scheduler
        .snapshot(&id)
        .ok_or_else(|| TimerError::UnknownTimer { id: id.clone() })?;
    Ok(Json(timer_response(&state, id, record)))
}

/// Handle GET /timers
pub async fn list_timers_handler(State(state): State<Arc<AppState>>) -> Json<TimerListResponse> {
    let timers: Vec<TimerResponse> = state
        .scheduler
        .snapshots()
        .into_iter()
        .map(|(id, record)| timer_response(&state, id, record))
        .collect();
    Json(TimerListResponse {
        count: timers.len(),
        timers,
    })
}

/// Handle DELETE /timers - full teardown
pub async fn clear_timers_handler(State(state): State<Arc<AppState>>) -> Json<TimerListResponse> {
    warn!("Clear-all requested over HTTP");
    state.scheduler.clear_all();
    Json(TimerListResponse {
        count: 0,
        timers: Vec::new(),
    })
}

/// Handle GET /timers/:id/events
///
/// Holds a reference on the timer for as long as the client stays connected.
pub async fn timer_events_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let subscription = state.scheduler.attach(&id)?;
    info!("Event stream opened for timer {}", id);

    let initial = subscription.snapshot().map(|record| TimerEvent::Updated {
        id: id.clone(),
        record,
    });
    let updates = stream::unfold(subscription, |mut subscription: TimerSubscription| async move {
        let event = subscription.changed().await?;
        Some((event, subscription))
    });

    let events = stream::iter(initial)
        .chain(updates)
        .map(|event| Ok::<_, Infallible>(sse_event(&event)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn sse_event(event: &TimerEvent) -> Event {
    let name = match event {
        TimerEvent::Updated { .. } => "updated",
        TimerEvent::Removed { .. } => "removed",
        TimerEvent::Cleared => "cleared",
    };
    Event::default()
        .event(name)
        .json_data(event)
        .unwrap_or_else(|e| {
            warn!("Failed to encode timer event: {}", e);
            Event::default().comment("encoding failed")
        })
}

/// Handle POST /visibility
pub async fn visibility_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VisibilityRequest>,
) -> Json<VisibilityResponse> {
    let visibility = Visibility::from_visible(req.visible);
    let changed = state.set_visibility(visibility);
    // Apply now so the response reflects it; the controller then sees no change.
    state.scheduler.on_visibility_change(visibility);
    Json(VisibilityResponse {
        visibility,
        changed,
        ticking: state.scheduler.is_ticking(),
        timestamp: chrono::Utc::now(),
    })
}

/// Handle GET /status - Return current scheduler status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let scheduler = &state.scheduler;
    Json(StatusResponse {
        visibility: Visibility::from_visible(scheduler.is_host_visible()),
        ticking: scheduler.is_ticking(),
        tick_period_ms: scheduler.tick_period().as_millis() as u64,
        timers: scheduler.len(),
        running: scheduler.running_count(),
        last_visibility_change_at: scheduler
            .last_visibility_change_at()
            .and_then(millis_to_datetime),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
