//! Error types for the Galaxy3D ID arrays
//!
//! This module defines the errors raised while registering, resolving
//! and configuring ID arrays, plus the helper that logs an error at the
//! point it is raised.

use std::fmt;
use std::panic::Location;

use crate::log::LogSeverity;

/// Result type for ID array operations
pub type Galaxy3dResult<T> = std::result::Result<T, Galaxy3dError>;

/// ID array errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Galaxy3dError {
    /// Growing the slot store failed (allocation refused)
    OutOfMemory,

    /// Growing would push the capacity past the largest representable ID
    HandleSpaceExhausted(String),

    /// A caller-supplied ID does not name a registered object
    InvalidHandle(String),

    /// The ID array configuration was rejected
    InvalidConfig(String),
}

impl fmt::Display for Galaxy3dError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Galaxy3dError::OutOfMemory => write!(f, "Out of memory"),
            Galaxy3dError::HandleSpaceExhausted(msg) => write!(f, "Handle space exhausted: {}", msg),
            Galaxy3dError::InvalidHandle(msg) => write!(f, "Invalid handle: {}", msg),
            Galaxy3dError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Galaxy3dError {}

/// Log an error with the caller's file:line before returning it (internal use)
///
/// Every error raised by an ID array passes through here, so failures show
/// up in the log even when the caller only looks at the `0` / `None` result.
#[track_caller]
pub(crate) fn log_and_return_error(source: &str, error: Galaxy3dError) -> Galaxy3dError {
    let location = Location::caller();
    crate::log::dispatch_detailed(
        LogSeverity::Error,
        source,
        error.to_string(),
        location.file(),
        location.line(),
    );
    error
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
