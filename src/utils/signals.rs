//! Unix signal handling: graceful shutdown and host visibility

use futures::stream::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook_tokio::Signals;
use tokio::sync::watch;
use tracing::{error, info};

use crate::tasks::Visibility;

/// Wait for shutdown signals (SIGTERM, SIGINT)
pub async fn shutdown_signal() {
    let mut signals = match Signals::new([SIGTERM, SIGINT]) {
        Ok(signals) => signals,
        Err(e) => {
            error!("Failed to install shutdown signal handler: {}", e);
            // Without a handler only Ctrl-C through tokio can stop us.
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    if let Some(signal) = signals.next().await {
        info!("Received signal: {}", signal);
    }
}

/// Feed host visibility from signals: SIGUSR1 hides, SIGUSR2 shows.
pub async fn visibility_signals(visibility_tx: watch::Sender<Visibility>) {
    let mut signals = match Signals::new([SIGUSR1, SIGUSR2]) {
        Ok(signals) => signals,
        Err(e) => {
            error!("Failed to install visibility signal handler: {}", e);
            return;
        }
    };

    while let Some(signal) = signals.next().await {
        let visibility = match signal {
            SIGUSR1 => Visibility::Hidden,
            SIGUSR2 => Visibility::Visible,
            _ => continue,
        };
        info!("Received signal {}, host is {}", signal, visibility);
        visibility_tx.send_replace(visibility);
    }
}
