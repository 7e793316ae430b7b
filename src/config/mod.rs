//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, delays, token format)
//! - Library configuration types

pub mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel};
