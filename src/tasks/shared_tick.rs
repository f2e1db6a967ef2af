//! Shared tick background task

use std::{sync::Weak, time::Duration};

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::state::scheduler::Shared;

/// Periodic task refreshing every running timer.
///
/// Values are recomputed from timestamps on each firing, so a delayed or
/// skipped firing only delays the display. The task exits when the
/// scheduler is dropped, when a sweep finds nothing left to run, or when
/// `generation` is no longer the scheduler's current tick.
pub(crate) async fn shared_tick_task(shared: Weak<Shared>, generation: u64, period: Duration) {
    debug!("Shared tick generation {} running", generation);

    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(shared) = shared.upgrade() else {
            debug!("Scheduler dropped, shared tick generation {} exiting", generation);
            break;
        };
        if !shared.sweep(generation) {
            break;
        }
    }
}
