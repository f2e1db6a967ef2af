//! Utility functions module
//!
//! Signal handling and display formatting.

pub mod format;
pub mod signals;

// Re-export main functions
pub use format::format_hms;
pub use signals::{shutdown_signal, visibility_signals};
