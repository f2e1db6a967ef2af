//! Timer record structure

use serde::{Deserialize, Serialize};

use crate::clock::{compute_elapsed, TimerStatus};

/// One tracked timer, keyed by an opaque id in the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    /// Last computed elapsed value, for display
    pub seconds: u64,
    pub status: TimerStatus,
    /// Always equal to `status == Running`
    pub is_running: bool,
    /// Start of the current run segment on the authoritative clock (epoch ms)
    pub started_at: Option<i64>,
    /// First start instant; never rebased
    pub original_started_at: Option<i64>,
    /// Seconds accrued by all earlier segments, as of `started_at`
    pub base_accumulated: u64,
    /// Authoritative minus local clock, in milliseconds
    pub clock_offset_ms: i64,
    pub reference_count: u32,
    /// Distinguishes records later re-created under the same id
    #[serde(skip)]
    pub(crate) incarnation: u64,
}

impl TimerRecord {
    /// Create a stopped record holding `accumulated_seconds`.
    pub fn idle(status: TimerStatus, accumulated_seconds: u64, clock_offset_ms: i64) -> Self {
        Self {
            seconds: accumulated_seconds,
            status,
            is_running: false,
            started_at: None,
            original_started_at: None,
            base_accumulated: accumulated_seconds,
            clock_offset_ms,
            reference_count: 1,
            incarnation: 0,
        }
    }

    /// Create a running record whose current segment began at `started_at`.
    pub fn running(
        accumulated_seconds: u64,
        started_at: i64,
        clock_offset_ms: i64,
        local_now_ms: i64,
    ) -> Self {
        let mut record = Self {
            seconds: accumulated_seconds,
            status: TimerStatus::Running,
            is_running: true,
            started_at: Some(started_at),
            original_started_at: Some(started_at),
            base_accumulated: accumulated_seconds,
            clock_offset_ms,
            reference_count: 1,
            incarnation: 0,
        };
        record.seconds = record.elapsed_at(local_now_ms);
        record
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Elapsed seconds at local instant `now_ms`, computed from timestamps.
    pub fn elapsed_at(&self, now_ms: i64) -> u64 {
        if !self.is_running() {
            return self.base_accumulated;
        }
        compute_elapsed(
            self.started_at,
            self.base_accumulated,
            self.clock_offset_ms,
            now_ms,
        )
    }

    /// Enter the running state with a fresh segment.
    pub(crate) fn begin_segment(
        &mut self,
        started_at: i64,
        clock_offset_ms: i64,
        local_now_ms: i64,
    ) {
        self.base_accumulated = self.seconds;
        self.started_at = Some(started_at);
        self.original_started_at.get_or_insert(started_at);
        self.clock_offset_ms = clock_offset_ms;
        self.set_status(TimerStatus::Running);
        self.seconds = self.elapsed_at(local_now_ms);
    }

    /// Close the current segment with an authoritative total.
    pub(crate) fn end_segment(&mut self, next: TimerStatus, accumulated_seconds: u64) {
        self.base_accumulated = accumulated_seconds;
        self.seconds = accumulated_seconds;
        self.started_at = None;
        self.set_status(next);
    }

    /// Recompute with a fresh offset and move the segment start up to now.
    pub(crate) fn rebase(&mut self, clock_offset_ms: i64, local_now_ms: i64) {
        self.clock_offset_ms = clock_offset_ms;
        let seconds = self.elapsed_at(local_now_ms);
        self.seconds = seconds;
        self.base_accumulated = seconds;
        self.started_at = Some(local_now_ms.saturating_add(clock_offset_ms));
    }

    fn set_status(&mut self, status: TimerStatus) {
        self.status = status;
        self.is_running = status == TimerStatus::Running;
    }
}
