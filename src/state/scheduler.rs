//! Timer scheduler: the public operation surface over the registry
//!
//! Every operation reads the current record, computes the next one and
//! replaces it under a single lock acquisition, then reconciles the shared
//! tick with the result. Rejected operations leave the registry untouched.

use std::{
    collections::hash_map::Entry,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use tokio::{runtime::Handle, sync::broadcast};
use tracing::{debug, error, info, warn};

use super::{
    events::{TimerEvent, TimerSubscription},
    SchedulerState, TickHandle, TimerRecord,
};
use crate::{
    clock::{
        can_perform_action, clock_offset, parse_timestamp, validate_transition, Clock,
        TimerAction, TimerStatus,
    },
    error::TimerError,
    tasks::{shared_tick_task, Visibility},
};

const EVENT_CAPACITY: usize = 256;
const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Authoritative data used to (re)initialise a timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerInit {
    pub status: TimerStatus,
    pub accumulated_seconds: u64,
    /// RFC 3339 start of the current segment; required when running
    pub started_at: Option<String>,
    /// Authoritative "now" in epoch milliseconds
    pub authoritative_now: i64,
}

pub(crate) struct Shared {
    state: Mutex<SchedulerState>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<TimerEvent>,
    tick_period: Duration,
    runtime: Option<Handle>,
    next_generation: AtomicU64,
    next_incarnation: AtomicU64,
}

/// Process-wide timer scheduler. Clones share the same registry and tick.
#[derive(Clone)]
pub struct TimerScheduler {
    shared: Arc<Shared>,
}

impl fmt::Debug for TimerScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerScheduler")
            .field("tick_period", &self.shared.tick_period)
            .finish_non_exhaustive()
    }
}

impl TimerScheduler {
    /// Create a scheduler with an empty registry.
    ///
    /// The shared tick is spawned on the tokio runtime current at
    /// construction; without one the tick never starts. A zero
    /// `tick_period` is raised to one millisecond.
    pub fn new(clock: Arc<dyn Clock>, tick_period: Duration, visibility: Visibility) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        if tick_period < MIN_TICK_PERIOD {
            warn!(
                "Tick period {:?} too short, using {:?}",
                tick_period, MIN_TICK_PERIOD
            );
        }
        let tick_period = tick_period.max(MIN_TICK_PERIOD);
        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            warn!("TimerScheduler created outside a tokio runtime, shared tick disabled");
        }

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState::new(visibility.is_visible())),
                clock,
                events,
                tick_period,
                runtime,
                next_generation: AtomicU64::new(1),
                next_incarnation: AtomicU64::new(1),
            }),
        }
    }

    /// Create or replace a timer from authoritative data.
    pub fn init(&self, id: &str, init: TimerInit) -> Result<TimerRecord, TimerError> {
        let local_now = self.shared.clock.now_ms();
        let offset = clock_offset(init.authoritative_now, local_now);

        let mut record = if init.status == TimerStatus::Running {
            let Some(started_at) = init.started_at.as_deref() else {
                error!("Cannot init running timer {} without a start time", id);
                return Err(TimerError::MissingStartTime);
            };
            let started_at = parse_start(id, started_at)?;
            TimerRecord::running(init.accumulated_seconds, started_at, offset, local_now)
        } else {
            TimerRecord::idle(init.status, init.accumulated_seconds, offset)
        };
        record.incarnation = self.shared.next_incarnation();

        let mut state = self.lock_state()?;
        if state.registry.insert(id.to_string(), record.clone()).is_some() {
            debug!("Replacing existing timer {}", id);
        }
        info!(
            "Timer {} initialised: status={}, seconds={}, offset={}ms",
            id, record.status, record.seconds, offset
        );
        self.shared.publish_update(id, &record);
        self.reconcile_tick(&mut state);
        Ok(record)
    }

    /// Start or resume a timer. Unknown ids are created already running.
    pub fn start(
        &self,
        id: &str,
        authoritative_now: i64,
        started_at: &str,
    ) -> Result<TimerRecord, TimerError> {
        let started_at = parse_start(id, started_at)?;
        let local_now = self.shared.clock.now_ms();
        let offset = clock_offset(authoritative_now, local_now);

        let mut state = self.lock_state()?;
        let record = match state.registry.entry(id.to_string()) {
            Entry::Vacant(slot) => {
                info!("Timer {} not registered, creating it running", id);
                let mut record = TimerRecord::running(0, started_at, offset, local_now);
                record.incarnation = self.shared.next_incarnation();
                slot.insert(record).clone()
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                let action = if record.status == TimerStatus::Paused {
                    TimerAction::Resume
                } else {
                    TimerAction::Start
                };
                if let Err(e) = validate_transition(record.status, action) {
                    warn!("Ignoring start of timer {}: {}", id, e);
                    return Err(e);
                }
                record.begin_segment(started_at, offset, local_now);
                info!(
                    "Timer {} {}: base={}s, offset={}ms",
                    id,
                    if action == TimerAction::Resume { "resumed" } else { "started" },
                    record.base_accumulated,
                    offset
                );
                record.clone()
            }
        };

        self.shared.publish_update(id, &record);
        self.reconcile_tick(&mut state);
        Ok(record)
    }

    /// Pause a running timer at the authoritative `accumulated_seconds`.
    pub fn pause(&self, id: &str, accumulated_seconds: u64) -> Result<TimerRecord, TimerError> {
        self.end_segment(id, TimerAction::Pause, accumulated_seconds)
    }

    /// Complete a running or paused timer. Completion is terminal.
    pub fn stop(&self, id: &str, accumulated_seconds: u64) -> Result<TimerRecord, TimerError> {
        self.end_segment(id, TimerAction::Complete, accumulated_seconds)
    }

    fn end_segment(
        &self,
        id: &str,
        action: TimerAction,
        accumulated_seconds: u64,
    ) -> Result<TimerRecord, TimerError> {
        let mut state = self.lock_state()?;
        let Some(record) = state.registry.get_mut(id) else {
            warn!("Ignoring {} of unknown timer {}", action, id);
            return Err(unknown(id));
        };

        let next = match validate_transition(record.status, action) {
            Ok(next) => next,
            Err(e) => {
                warn!("Ignoring {} of timer {}: {}", action, id, e);
                return Err(e);
            }
        };
        record.end_segment(next, accumulated_seconds);
        let record = record.clone();
        info!("Timer {} {} at {}s", id, next, accumulated_seconds);

        self.shared.publish_update(id, &record);
        self.reconcile_tick(&mut state);
        Ok(record)
    }

    /// Correct a running timer against authoritative time and rebase it.
    pub fn sync_now(&self, id: &str, authoritative_now: i64) -> Result<TimerRecord, TimerError> {
        let local_now = self.shared.clock.now_ms();
        let offset = clock_offset(authoritative_now, local_now);

        let mut state = self.lock_state()?;
        let Some(record) = state.registry.get_mut(id) else {
            debug!("Sync of unknown timer {} ignored", id);
            return Err(unknown(id));
        };
        if !record.is_running() {
            debug!("Sync of timer {} ignored, status is {}", id, record.status);
            return Err(TimerError::NotRunning {
                id: id.to_string(),
                status: record.status,
            });
        }

        let before = record.seconds;
        record.rebase(offset, local_now);
        let record = record.clone();
        debug!(
            "Timer {} synced: {}s -> {}s, offset={}ms",
            id, before, record.seconds, offset
        );
        self.shared.publish_update(id, &record);
        Ok(record)
    }

    /// Take one more reference on an existing timer. Returns the new count.
    pub fn add_ref(&self, id: &str) -> Result<u32, TimerError> {
        self.acquire(id).map(|(count, _)| count)
    }

    /// Take a reference and report which incarnation of `id` it belongs to.
    pub(crate) fn acquire(&self, id: &str) -> Result<(u32, u64), TimerError> {
        let mut state = self.lock_state()?;
        let Some(record) = state.registry.get_mut(id) else {
            debug!("add_ref on unknown timer {} ignored", id);
            return Err(unknown(id));
        };
        record.reference_count = record.reference_count.saturating_add(1);
        let count = record.reference_count;
        debug!("Timer {} referenced ({} refs)", id, count);
        Ok((count, record.incarnation))
    }

    /// Give back one reference. Returns the remaining count; at zero the
    /// timer has been removed from the registry.
    pub fn remove_ref(&self, id: &str) -> Result<u32, TimerError> {
        self.release(id, None)
    }

    /// Give back a reference taken on one incarnation of `id`. A record
    /// re-created under the same id since then is left alone.
    pub(crate) fn release(&self, id: &str, incarnation: Option<u64>) -> Result<u32, TimerError> {
        let mut state = self.lock_state()?;
        let Some(record) = state.registry.get_mut(id) else {
            debug!("remove_ref on unknown timer {} ignored", id);
            return Err(unknown(id));
        };
        if incarnation.is_some_and(|incarnation| incarnation != record.incarnation) {
            debug!("Stale reference on timer {} ignored, record was replaced", id);
            return Err(unknown(id));
        }

        let remaining = record.reference_count.saturating_sub(1);
        if remaining > 0 {
            record.reference_count = remaining;
            debug!("Timer {} released ({} refs left)", id, remaining);
            return Ok(remaining);
        }

        state.registry.remove(id);
        info!("Timer {} removed, {} timers remain", id, state.registry.len());
        self.shared.publish(TimerEvent::Removed { id: id.to_string() });
        self.reconcile_tick(&mut state);
        Ok(0)
    }

    /// Take a reference on `id` that is given back when the subscription drops.
    pub fn attach(&self, id: &str) -> Result<TimerSubscription, TimerError> {
        TimerSubscription::new(self.clone(), id.to_string())
    }

    /// Drop every timer and stop the shared tick.
    ///
    /// Teardown proceeds even if a previous holder of the lock panicked.
    pub fn clear_all(&self) {
        let mut state = self.read_state();
        let count = state.registry.len();
        state.registry.clear();
        stop_tick(&mut state);
        info!("Cleared {} timers", count);
        self.shared.publish(TimerEvent::Cleared);
    }

    /// Tear the scheduler down at process exit.
    pub fn shutdown(&self) {
        info!("Shutting down timer scheduler");
        self.clear_all();
    }

    /// Apply a host visibility transition.
    pub fn on_visibility_change(&self, visibility: Visibility) {
        let mut state = match self.lock_state() {
            Ok(state) => state,
            Err(e) => {
                error!("Cannot apply visibility change: {}", e);
                return;
            }
        };

        let visible = visibility.is_visible();
        if state.host_visible == visible {
            debug!("Host visibility unchanged ({})", visibility);
            return;
        }
        state.host_visible = visible;

        if visible {
            state.last_visibility_change_at = Some(self.shared.clock.now_ms());
            info!("Host visible, resuming shared tick");
        } else {
            info!("Host hidden, suspending shared tick");
        }
        self.reconcile_tick(&mut state);
    }

    /// Subscribe to change notifications for every timer
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.shared.events.subscribe()
    }

    pub fn snapshot(&self, id: &str) -> Option<TimerRecord> {
        self.read_state().registry.get(id).cloned()
    }

    /// All records, sorted by id
    pub fn snapshots(&self) -> Vec<(String, TimerRecord)> {
        let mut all: Vec<_> = self
            .read_state()
            .registry
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Elapsed seconds as of now, without publishing anything.
    pub fn current_seconds(&self, id: &str) -> Option<u64> {
        let now = self.shared.clock.now_ms();
        self.read_state()
            .registry
            .get(id)
            .map(|record| record.elapsed_at(now))
    }

    /// Whether `action` is currently permitted on `id`
    pub fn can_perform(&self, id: &str, action: TimerAction) -> bool {
        self.read_state()
            .registry
            .get(id)
            .is_some_and(|record| can_perform_action(record.status, action))
    }

    pub fn is_ticking(&self) -> bool {
        self.read_state().is_ticking()
    }

    pub fn is_host_visible(&self) -> bool {
        self.read_state().host_visible
    }

    pub fn last_visibility_change_at(&self) -> Option<i64> {
        self.read_state().last_visibility_change_at
    }

    pub fn running_count(&self) -> usize {
        self.read_state().running_count()
    }

    pub fn len(&self) -> usize {
        self.read_state().registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().registry.is_empty()
    }

    pub fn tick_period(&self) -> Duration {
        self.shared.tick_period
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, SchedulerState>, TimerError> {
        self.shared.state.lock().map_err(|e| {
            error!("Failed to lock scheduler state: {}", e);
            TimerError::StatePoisoned
        })
    }

    fn read_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start or stop the shared tick so it runs exactly when a timer is
    /// running and the host is visible.
    fn reconcile_tick(&self, state: &mut SchedulerState) {
        if state.wants_tick() {
            self.start_tick(state);
        } else {
            stop_tick(state);
        }
    }

    fn start_tick(&self, state: &mut SchedulerState) {
        if let Some(tick) = state.tick.as_ref() {
            if !tick.task.is_finished() {
                return;
            }
            warn!(
                "Shared tick generation {} died unexpectedly, respawning",
                tick.generation
            );
            state.tick = None;
        }
        let Some(runtime) = self.shared.runtime.as_ref() else {
            warn!("No tokio runtime, cannot start shared tick");
            return;
        };

        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        let task = runtime.spawn(shared_tick_task(
            Arc::downgrade(&self.shared),
            generation,
            self.shared.tick_period,
        ));
        state.tick = Some(TickHandle { generation, task });
        info!(
            "Shared tick started (generation {}, period {:?})",
            generation, self.shared.tick_period
        );
    }
}

impl Shared {
    fn next_incarnation(&self) -> u64 {
        self.next_incarnation.fetch_add(1, Ordering::Relaxed)
    }

    /// One shared tick: refresh every running timer whose displayed value
    /// changed. Returns `false` once the calling tick task should exit.
    pub(crate) fn sweep(&self, generation: u64) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(e) => {
                error!("Shared tick cannot lock scheduler state: {}", e);
                return false;
            }
        };

        if state.tick.as_ref().map(|tick| tick.generation) != Some(generation) {
            debug!("Shared tick generation {} superseded, exiting", generation);
            return false;
        }

        if state.host_visible {
            let now = self.clock.now_ms();
            let updates: Vec<(String, u64)> = state
                .registry
                .iter()
                .filter(|(_, record)| record.is_running())
                .filter_map(|(id, record)| {
                    let seconds = record.elapsed_at(now);
                    (seconds != record.seconds).then(|| (id.clone(), seconds))
                })
                .collect();

            if !updates.is_empty() {
                debug!("Shared tick refreshing {} timers", updates.len());
            }
            for (id, seconds) in updates {
                self.update_seconds(&mut state, &id, seconds);
            }
        }

        if !state.wants_tick() {
            // Dropping our own handle detaches this task; returning ends it.
            state.tick = None;
            info!("No running timers, shared tick stopped");
            return false;
        }
        true
    }

    /// Publish a freshly computed display value. Only the shared tick calls this.
    fn update_seconds(&self, state: &mut SchedulerState, id: &str, seconds: u64) {
        if let Some(record) = state.registry.get_mut(id) {
            record.seconds = seconds;
            let record = record.clone();
            self.publish_update(id, &record);
        }
    }

    fn publish_update(&self, id: &str, record: &TimerRecord) {
        self.publish(TimerEvent::Updated {
            id: id.to_string(),
            record: record.clone(),
        });
    }

    fn publish(&self, event: TimerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn stop_tick(state: &mut SchedulerState) {
    if let Some(tick) = state.tick.take() {
        tick.task.abort();
        info!("Shared tick stopped (generation {})", tick.generation);
    }
}

fn parse_start(id: &str, started_at: &str) -> Result<i64, TimerError> {
    parse_timestamp(started_at).map_err(|e| {
        error!("Rejecting start time for timer {}: {}", id, e);
        e
    })
}

fn unknown(id: &str) -> TimerError {
    TimerError::UnknownTimer { id: id.to_string() }
}
