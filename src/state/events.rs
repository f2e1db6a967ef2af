//! Change notifications and reference-holding subscriptions

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use super::{TimerRecord, TimerScheduler};
use crate::error::TimerError;

/// Emitted once per mutated timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimerEvent {
    Updated { id: String, record: TimerRecord },
    Removed { id: String },
    /// Every record was dropped at once
    Cleared,
}

impl TimerEvent {
    /// Whether this event affects the timer `id`
    pub fn concerns(&self, id: &str) -> bool {
        match self {
            TimerEvent::Updated { id: event_id, .. } | TimerEvent::Removed { id: event_id } => {
                event_id == id
            }
            TimerEvent::Cleared => true,
        }
    }

    /// Whether the timer no longer exists after this event
    pub fn is_removal(&self) -> bool {
        matches!(self, TimerEvent::Removed { .. } | TimerEvent::Cleared)
    }
}

/// A consumer's interest in one timer.
///
/// Created by [`TimerScheduler::attach`], which takes a reference on the
/// timer. Dropping the subscription gives the reference back, unless the
/// timer has since been removed and re-created under the same id.
#[derive(Debug)]
pub struct TimerSubscription {
    scheduler: TimerScheduler,
    id: String,
    incarnation: u64,
    events: broadcast::Receiver<TimerEvent>,
    released: bool,
}

impl TimerSubscription {
    pub(crate) fn new(scheduler: TimerScheduler, id: String) -> Result<Self, TimerError> {
        // Subscribe before taking the reference so no update is missed.
        let events = scheduler.subscribe();
        let (_, incarnation) = scheduler.acquire(&id)?;
        Ok(Self {
            scheduler,
            id,
            incarnation,
            events,
            released: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current record, if the timer still exists
    pub fn snapshot(&self) -> Option<TimerRecord> {
        self.scheduler.snapshot(&self.id)
    }

    /// Wait for the next change to this timer.
    ///
    /// Returns `None` once the timer has been removed or the scheduler is gone.
    pub async fn changed(&mut self) -> Option<TimerEvent> {
        if self.released {
            return None;
        }
        loop {
            let event = match self.events.recv().await {
                Ok(event) if event.concerns(&self.id) => event,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Subscription for {} lagged by {} events, resyncing", self.id, skipped);
                    match self.snapshot() {
                        Some(record) => TimerEvent::Updated {
                            id: self.id.clone(),
                            record,
                        },
                        None => TimerEvent::Removed { id: self.id.clone() },
                    }
                }
                Err(RecvError::Closed) => return None,
            };

            if event.is_removal() {
                self.released = true;
            }
            return Some(event);
        }
    }
}

impl Drop for TimerSubscription {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.scheduler.release(&self.id, Some(self.incarnation)) {
            debug!("Releasing subscription for {}: {}", self.id, e);
        }
    }
}
