//! State management module
//!
//! The timer registry, the scheduler operating on it and the state shared
//! with the HTTP host.

pub mod app_state;
pub mod events;
pub mod scheduler;
pub mod scheduler_state;
pub mod timer_record;

// Re-export main types
pub use app_state::AppState;
pub use events::{TimerEvent, TimerSubscription};
pub use scheduler::{TimerInit, TimerScheduler};
pub use scheduler_state::{SchedulerState, TickHandle};
pub use timer_record::TimerRecord;
