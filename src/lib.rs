//! Study Timer - drift-free session timers behind one shared tick
//!
//! Tracks elapsed time for many concurrently running study session timers.
//! Displayed values are always recomputed from absolute timestamps and an
//! authoritative clock offset, one periodic task refreshes every running
//! timer, timers live as long as their consumers hold references, and a host
//! visibility signal suspends and resumes the shared tick.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use clock::{Clock, ManualClock, SystemClock, TimerAction, TimerStatus};
pub use config::Config;
pub use error::TimerError;
pub use state::{AppState, TimerEvent, TimerInit, TimerRecord, TimerScheduler, TimerSubscription};
pub use tasks::Visibility;
pub use utils::signals::shutdown_signal;
