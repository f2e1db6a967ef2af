//! Background tasks module
//!
//! The shared tick and the host visibility controller.

pub mod shared_tick;
pub mod visibility;

// Re-export main functions
pub(crate) use shared_tick::shared_tick_task;
pub use visibility::{visibility_task, Visibility};
