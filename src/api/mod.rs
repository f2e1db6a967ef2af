//! HTTP API module
//!
//! Exposes the timer operations to presentation consumers.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timers", get(list_timers_handler).delete(clear_timers_handler))
        .route("/timers/:id", get(get_timer_handler))
        .route("/timers/:id/init", post(init_handler))
        .route("/timers/:id/start", post(start_handler))
        .route("/timers/:id/pause", post(pause_handler))
        .route("/timers/:id/stop", post(stop_handler))
        .route("/timers/:id/sync", post(sync_handler))
        .route("/timers/:id/ref", post(add_ref_handler).delete(remove_ref_handler))
        .route("/timers/:id/events", get(timer_events_handler))
        .route("/visibility", post(visibility_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
