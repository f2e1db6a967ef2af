//! Timer state machine

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TimerError;

/// Lifecycle state of a timer. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerStatus {
    NotStarted,
    Running,
    Paused,
    Completed,
}

impl TimerStatus {
    pub const ALL: [TimerStatus; 4] = [
        TimerStatus::NotStarted,
        TimerStatus::Running,
        TimerStatus::Paused,
        TimerStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::NotStarted => "NOT_STARTED",
            TimerStatus::Running => "RUNNING",
            TimerStatus::Paused => "PAUSED",
            TimerStatus::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TimerStatus::Completed)
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions that move a timer between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerAction {
    Start,
    Resume,
    Pause,
    Complete,
}

impl TimerAction {
    pub const ALL: [TimerAction; 4] = [
        TimerAction::Start,
        TimerAction::Resume,
        TimerAction::Pause,
        TimerAction::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimerAction::Start => "START",
            TimerAction::Resume => "RESUME",
            TimerAction::Pause => "PAUSE",
            TimerAction::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate `action` against `current` and return the resulting status.
///
/// The table is closed: any pair not listed below is rejected.
///
/// | current     | action   | next      |
/// |-------------|----------|-----------|
/// | NOT_STARTED | START    | RUNNING   |
/// | PAUSED      | RESUME   | RUNNING   |
/// | RUNNING     | PAUSE    | PAUSED    |
/// | RUNNING     | COMPLETE | COMPLETED |
/// | PAUSED      | COMPLETE | COMPLETED |
pub fn validate_transition(
    current: TimerStatus,
    action: TimerAction,
) -> Result<TimerStatus, TimerError> {
    use TimerAction::*;
    use TimerStatus::*;

    match (current, action) {
        (NotStarted, Start) => Ok(Running),
        (Paused, Resume) => Ok(Running),
        (Running, Pause) => Ok(Paused),
        (Running, Complete) | (Paused, Complete) => Ok(Completed),
        (from, action) => Err(TimerError::InvalidTransition { from, action }),
    }
}

/// Side-effect free check used to gate controls before issuing an action.
pub fn can_perform_action(status: TimerStatus, action: TimerAction) -> bool {
    validate_transition(status, action).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(current: TimerStatus, action: TimerAction) -> Option<TimerStatus> {
        use TimerAction::*;
        use TimerStatus::*;
        match (current, action) {
            (NotStarted, Start) => Some(Running),
            (Paused, Resume) => Some(Running),
            (Running, Pause) => Some(Paused),
            (Running, Complete) => Some(Completed),
            (Paused, Complete) => Some(Completed),
            _ => None,
        }
    }

    #[test]
    fn test_transition_table_is_exact() {
        let mut valid = 0;
        for status in TimerStatus::ALL {
            for action in TimerAction::ALL {
                let result = validate_transition(status, action);
                match expected(status, action) {
                    Some(next) => {
                        assert_eq!(result, Ok(next), "{} + {}", status, action);
                        valid += 1;
                    }
                    None => assert_eq!(
                        result,
                        Err(TimerError::InvalidTransition { from: status, action }),
                        "{} + {} should be rejected",
                        status,
                        action
                    ),
                }
            }
        }
        assert_eq!(valid, 5);
    }

    #[test]
    fn test_completed_is_terminal() {
        for action in TimerAction::ALL {
            assert!(!can_perform_action(TimerStatus::Completed, action));
        }
        assert!(TimerStatus::Completed.is_terminal());
    }

    #[test]
    fn test_restart_is_rejected() {
        assert!(!can_perform_action(TimerStatus::Running, TimerAction::Start));
        assert!(!can_perform_action(TimerStatus::Paused, TimerAction::Start));
        assert!(!can_perform_action(TimerStatus::NotStarted, TimerAction::Resume));
    }

    #[test]
    fn test_can_perform_matches_validate() {
        for status in TimerStatus::ALL {
            for action in TimerAction::ALL {
                assert_eq!(
                    can_perform_action(status, action),
                    validate_transition(status, action).is_ok()
                );
            }
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&TimerStatus::NotStarted).unwrap(),
            "\"NOT_STARTED\""
        );
        let action: TimerAction = serde_json::from_str("\"COMPLETE\"").unwrap();
        assert_eq!(action, TimerAction::Complete);
    }
}
