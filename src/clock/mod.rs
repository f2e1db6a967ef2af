//! Clock model
//!
//! Pure elapsed-time math, the timer state machine and the local clock
//! abstraction the scheduler reads "now" from.

pub mod elapsed;
pub mod source;
pub mod transitions;

pub use elapsed::{clock_offset, compute_elapsed, parse_timestamp};
pub use source::{Clock, ManualClock, SystemClock};
pub use transitions::{can_perform_action, validate_transition, TimerAction, TimerStatus};
