use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::watch;
use tower::ServiceExt;

use study_timer::{
    api::create_router,
    clock::ManualClock,
    state::{AppState, TimerScheduler},
    tasks::Visibility,
};

const T0: i64 = 1_700_000_000_000;

fn iso(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms).unwrap().to_rfc3339()
}

fn app(clock: &ManualClock) -> (Router, Arc<AppState>) {
    let (visibility_tx, _) = watch::channel(Visibility::Visible);
    let scheduler = TimerScheduler::new(
        Arc::new(clock.clone()),
        Duration::from_secs(1),
        Visibility::Visible,
    );
    let state = Arc::new(AppState::new(
        scheduler,
        visibility_tx,
        20554,
        "127.0.0.1".to_string(),
    ));
    (create_router(Arc::clone(&state)), state)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn timer_lifecycle_over_http() {
    let clock = ManualClock::new(T0);
    let (app, _) = app(&clock);

    let (status, body) = call(
        &app,
        Method::POST,
        "/timers/plan/init",
        Some(json!({ "status": "NOT_STARTED", "accumulated_seconds": 0, "server_now": T0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["status"], "NOT_STARTED");

    let (status, body) = call(
        &app,
        Method::POST,
        "/timers/plan/start",
        Some(json!({ "server_now": T0, "started_at": iso(T0) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["status"], "RUNNING");
    assert_eq!(body["timer"]["is_running"], true);

    clock.advance_secs(65);
    let (status, body) = call(&app, Method::GET, "/timers/plan", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_seconds"], 65);
    assert_eq!(body["display"], "00:01:05");

    let (status, body) = call(
        &app,
        Method::POST,
        "/timers/plan/pause",
        Some(json!({ "accumulated_seconds": 65 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["status"], "PAUSED");
    assert_eq!(body["timer"]["seconds"], 65);
    assert_eq!(body["timer"]["started_at"], Value::Null);

    let (status, body) = call(
        &app,
        Method::POST,
        "/timers/plan/pause",
        Some(json!({ "accumulated_seconds": 70 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");

    let (status, body) = call(
        &app,
        Method::POST,
        "/timers/plan/stop",
        Some(json!({ "accumulated_seconds": 65 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["status"], "COMPLETED");
}

#[tokio::test]
async fn rejected_requests_map_to_status_codes() {
    let clock = ManualClock::new(T0);
    let (app, state) = app(&clock);

    let (status, _) = call(&app, Method::GET, "/timers/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        Method::POST,
        "/timers/ghost/pause",
        Some(json!({ "accumulated_seconds": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        Method::POST,
        "/timers/plan/start",
        Some(json!({ "server_now": T0, "started_at": "half past nine" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.scheduler.snapshot("plan").is_none());

    let (status, _) = call(
        &app,
        Method::POST,
        "/timers/plan/init",
        Some(json!({ "status": "RUNNING", "server_now": T0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    call(
        &app,
        Method::POST,
        "/timers/plan/init",
        Some(json!({ "status": "PAUSED", "accumulated_seconds": 5, "server_now": T0 })),
    )
    .await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/timers/plan/sync",
        Some(json!({ "server_now": T0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn references_over_http() {
    let clock = ManualClock::new(T0);
    let (app, _) = app(&clock);

    call(
        &app,
        Method::POST,
        "/timers/p1/init",
        Some(json!({ "status": "NOT_STARTED", "server_now": T0 })),
    )
    .await;

    let (_, body) = call(&app, Method::POST, "/timers/p1/ref", None).await;
    assert_eq!(body["reference_count"], 2);

    let (_, body) = call(&app, Method::DELETE, "/timers/p1/ref", None).await;
    assert_eq!(body["reference_count"], 1);
    assert_eq!(body["removed"], false);

    let (_, body) = call(&app, Method::DELETE, "/timers/p1/ref", None).await;
    assert_eq!(body["removed"], true);

    let (status, _) = call(&app, Method::GET, "/timers/p1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::DELETE, "/timers/p1/ref", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn visibility_and_status() {
    let clock = ManualClock::new(T0);
    let (app, _) = app(&clock);

    call(
        &app,
        Method::POST,
        "/timers/plan/start",
        Some(json!({ "server_now": T0, "started_at": iso(T0) })),
    )
    .await;

    let (_, body) = call(&app, Method::POST, "/visibility", Some(json!({ "visible": false }))).await;
    assert_eq!(body["visibility"], "hidden");
    assert_eq!(body["changed"], true);
    assert_eq!(body["ticking"], false);

    let (status, body) = call(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["visibility"], "hidden");
    assert_eq!(body["ticking"], false);
    assert_eq!(body["running"], 1);
    assert_eq!(body["timers"], 1);
    assert_eq!(body["tick_period_ms"], 1000);

    clock.advance_secs(2);
    let (_, body) = call(&app, Method::POST, "/visibility", Some(json!({ "visible": true }))).await;
    assert_eq!(body["ticking"], true);

    let (_, body) = call(&app, Method::GET, "/status", None).await;
    assert_eq!(body["visibility"], "visible");
    assert_eq!(
        body["last_visibility_change_at"],
        json!(Utc.timestamp_millis_opt(T0 + 2_000).unwrap())
    );
}

#[tokio::test]
async fn list_and_clear() {
    let clock = ManualClock::new(T0);
    let (app, state) = app(&clock);

    for id in ["b", "a"] {
        call(
            &app,
            Method::POST,
            &format!("/timers/{}/start", id),
            Some(json!({ "server_now": T0, "started_at": iso(T0) })),
        )
        .await;
    }

    let (_, body) = call(&app, Method::GET, "/timers", None).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["timers"][0]["id"], "a");

    let (status, body) = call(&app, Method::DELETE, "/timers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert!(state.scheduler.is_empty());
    assert!(!state.scheduler.is_ticking());
}

#[tokio::test]
async fn health_reports_ok() {
    let clock = ManualClock::new(T0);
    let (app, _) = app(&clock);

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
