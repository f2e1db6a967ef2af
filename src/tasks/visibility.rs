//! Host visibility controller

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::state::TimerScheduler;

/// Binary foreground/background state reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn from_visible(visible: bool) -> Self {
        if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, Visibility::Visible)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Visible => "visible",
            Visibility::Hidden => "hidden",
        })
    }
}

/// Background task forwarding host visibility changes to the scheduler.
///
/// Hidden suspends the shared tick; visible records the instant and
/// resumes it. Consumers wanting authoritative correction call
/// `sync_now` themselves after a resume.
pub async fn visibility_task(
    scheduler: TimerScheduler,
    mut visibility_rx: watch::Receiver<Visibility>,
) {
    info!("Starting visibility controller");

    let initial = *visibility_rx.borrow_and_update();
    scheduler.on_visibility_change(initial);

    while visibility_rx.changed().await.is_ok() {
        let visibility = *visibility_rx.borrow_and_update();
        scheduler.on_visibility_change(visibility);
    }

    info!("Visibility source closed, visibility controller exiting");
}
