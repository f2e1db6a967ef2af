//! Registry and shared tick bookkeeping

use std::collections::HashMap;

use tokio::task::JoinHandle;

use super::TimerRecord;

/// Handle of the currently spawned shared tick task.
///
/// `generation` lets a tick task recognise that it has been superseded.
#[derive(Debug)]
pub struct TickHandle {
    pub generation: u64,
    pub task: JoinHandle<()>,
}

/// Process-wide scheduler state guarded by the scheduler's mutex
#[derive(Debug, Default)]
pub struct SchedulerState {
    pub registry: HashMap<String, TimerRecord>,
    pub host_visible: bool,
    pub tick: Option<TickHandle>,
    /// Local instant (epoch ms) at which the host last became visible
    pub last_visibility_change_at: Option<i64>,
}

impl SchedulerState {
    pub fn new(host_visible: bool) -> Self {
        Self {
            registry: HashMap::new(),
            host_visible,
            tick: None,
            last_visibility_change_at: None,
        }
    }

    /// Check if any timer is currently running
    pub fn any_running(&self) -> bool {
        self.registry.values().any(TimerRecord::is_running)
    }

    pub fn running_count(&self) -> usize {
        self.registry.values().filter(|r| r.is_running()).count()
    }

    /// Whether the shared tick should be active right now
    pub fn wants_tick(&self) -> bool {
        self.host_visible && self.any_running()
    }

    /// Whether a tick task is spawned and still alive
    pub fn is_ticking(&self) -> bool {
        self.tick.as_ref().is_some_and(|tick| !tick.task.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TimerStatus;

    #[test]
    fn test_wants_tick_requires_visible_and_running() {
        let mut state = SchedulerState::new(true);
        assert!(!state.wants_tick());

        state
            .registry
            .insert("a".into(), TimerRecord::idle(TimerStatus::Paused, 3, 0));
        assert!(!state.wants_tick());

        state
            .registry
            .insert("b".into(), TimerRecord::running(0, 0, 0, 0));
        assert!(state.wants_tick());
        assert_eq!(state.running_count(), 1);

        state.host_visible = false;
        assert!(!state.wants_tick());
    }
}
