//! Study Timer - HTTP host for the shared timer scheduler
//!
//! This is the main entry point for the study-timer daemon.

use std::sync::Arc;

use tokio::{net::TcpListener, sync::watch};
use tracing::info;

use study_timer::{
    api::create_router,
    clock::SystemClock,
    config::Config,
    state::{AppState, TimerScheduler},
    tasks::visibility_task,
    utils::{shutdown_signal, visibility_signals},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("study_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting study-timer v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, tick={}ms, visibility={}",
        config.host,
        config.port,
        config.tick_ms,
        config.initial_visibility()
    );

    // Host visibility source, fed by HTTP and SIGUSR1/SIGUSR2
    let (visibility_tx, visibility_rx) = watch::channel(config.initial_visibility());

    let scheduler = TimerScheduler::new(
        Arc::new(SystemClock),
        config.tick_period(),
        config.initial_visibility(),
    );

    tokio::spawn(visibility_task(scheduler.clone(), visibility_rx));
    tokio::spawn(visibility_signals(visibility_tx.clone()));

    let state = Arc::new(AppState::new(
        scheduler.clone(),
        visibility_tx,
        config.port,
        config.host.clone(),
    ));
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /timers/:id/{{init,start,pause,stop,sync}}");
    info!("  POST   /timers/:id/ref, DELETE /timers/:id/ref");
    info!("  GET    /timers, /timers/:id, /timers/:id/events");
    info!("  DELETE /timers      - Clear all timers");
    info!("  POST   /visibility  - Report host visibility");
    info!("  GET    /status, /health");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    scheduler.shutdown();
    info!("Server shutdown complete");
    Ok(())
}
