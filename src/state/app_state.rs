//! State shared by the HTTP host

use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info};

use super::TimerScheduler;
use crate::tasks::Visibility;

/// Everything the HTTP handlers need: the scheduler and the visibility source
#[derive(Debug)]
pub struct AppState {
    pub scheduler: TimerScheduler,
    /// Host visibility source consumed by the visibility controller
    pub visibility_tx: watch::Sender<Visibility>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
}

impl AppState {
    pub fn new(
        scheduler: TimerScheduler,
        visibility_tx: watch::Sender<Visibility>,
        port: u16,
        host: String,
    ) -> Self {
        Self {
            scheduler,
            visibility_tx,
            start_time: Instant::now(),
            port,
            host,
        }
    }

    /// Publish a new host visibility. Returns whether it changed.
    pub fn set_visibility(&self, visibility: Visibility) -> bool {
        let previous = self.visibility_tx.send_replace(visibility);
        if previous == visibility {
            debug!("Visibility already {}", visibility);
            return false;
        }
        info!("Host visibility reported: {} -> {}", previous, visibility);
        true
    }

    pub fn visibility(&self) -> Visibility {
        *self.visibility_tx.borrow()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
