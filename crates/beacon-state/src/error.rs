//! Error types for the Beacon endpoint registry.

use thiserror::Error;

/// Result type alias for registry operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur when registering an endpoint.
///
/// Unknown ids are never an error: lookups return `None` and updates are
/// ignored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("URL must start with http:// or https://")]
    InvalidUrl(String),

    #[error("Expected status code must be between 100 and 599")]
    InvalidExpectedStatus(String),
}
