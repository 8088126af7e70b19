//! Registry error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while registering or resolving services.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No live (unexpired) registration exists for the service.
    #[error("Service unavailable: no live registration for '{name}'")]
    ServiceUnavailable { name: String },

    /// The directory did not answer within the call bound.
    #[error("Registry call '{operation}' timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    /// A lease needs a non-zero time-to-live and refresh period.
    #[error("Invalid lease for '{name}': ttl and refresh must be greater than zero")]
    InvalidLease { name: String },

    /// The backing directory failed.
    #[error("Directory error: {0}")]
    Directory(String),
}

/// Convenience type alias for registry results.
pub type Result<T> = std::result::Result<T, RegistryError>;
