//! Error types for the health checker.
//!
//! Probe failures are data (see `ProbeOutcome`), not errors. Only setting
//! up the HTTP client can fail.

use thiserror::Error;

/// Result type alias for health checker setup.
pub type HealthResult<T> = Result<T, HealthError>;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
