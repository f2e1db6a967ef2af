//! Error types for timer operations

use thiserror::Error;

use crate::clock::{TimerAction, TimerStatus};

/// Reasons a timer operation was rejected.
///
/// A rejected operation never mutates the registry: the caller gets one of
/// these back and every record is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("invalid transition: cannot {action} a timer that is {from}")]
    InvalidTransition { from: TimerStatus, action: TimerAction },

    #[error("malformed timestamp: {input:?}")]
    MalformedTimestamp { input: String },

    #[error("a running timer requires a start time")]
    MissingStartTime,

    #[error("no timer registered for {id:?}")]
    UnknownTimer { id: String },

    #[error("timer {id:?} is {status}, not running")]
    NotRunning { id: String, status: TimerStatus },

    #[error("scheduler state lock poisoned")]
    StatePoisoned,
}
