//! Utilities module
//!
//! This module provides utility functions for common operations:
//! - Logger setup
//! - Naming and formatting helpers

pub mod helpers;
pub mod logger;

// Re-export main types for convenience
pub use helpers::Helpers;
pub use logger::Logger;
