//! vidtrim Common Utilities
//!
//! Shared infrastructure for all vidtrim crates:
//! - Error types and result aliases
//! - Monotonic clock and poll-rate utilities for the event loop
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
