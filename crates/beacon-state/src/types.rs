//! Domain types for the Beacon registry.
//!
//! These types represent a monitored endpoint, its current liveness, and
//! the rolling window of past observations. All types serialize to/from
//! JSON for transport across the REST boundary.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// Process-lifetime identity of an endpoint.
pub type EndpointId = u64;

/// Maximum number of observations retained per endpoint.
pub const HISTORY_LIMIT: usize = 100;

/// Expected status used when a caller does not specify one.
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// Range of status codes accepted as an expected status.
pub const EXPECTED_STATUS_RANGE: std::ops::RangeInclusive<u16> = 100..=599;

// ── Status ────────────────────────────────────────────────────────

/// Liveness of an endpoint as determined by probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EndpointStatus {
    /// Never probed.
    #[default]
    Unknown,
    /// Last probe returned the expected status code.
    Operational,
    /// Reserved. No probe path produces it.
    Degraded,
    /// Last probe failed or returned an unexpected status code.
    Down,
}

impl EndpointStatus {
    /// Status for a received response, given the expected code.
    pub fn from_status_match(actual: u16, expected: u16) -> Self {
        if actual == expected {
            Self::Operational
        } else {
            Self::Down
        }
    }
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "Unknown",
            Self::Operational => "Operational",
            Self::Degraded => "Degraded",
            Self::Down => "Down",
        };
        f.write_str(s)
    }
}

// ── History ───────────────────────────────────────────────────────

/// One past observation of an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    /// Latency in milliseconds; `None` when no response was received.
    pub latency_ms: Option<f64>,
    pub status: EndpointStatus,
}

// ── Endpoint ──────────────────────────────────────────────────────

/// A registered HTTP(S) target under monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: EndpointId,
    pub url: String,
    pub name: String,
    /// Status code that counts as healthy.
    pub expected_status: u16,
    pub current_status: EndpointStatus,
    /// When the most recent probe result was applied.
    pub last_checked: Option<DateTime<Utc>>,
    /// Latency of the most recent probe in milliseconds.
    pub response_time_ms: Option<f64>,
    /// Oldest first, at most [`HISTORY_LIMIT`] entries.
    pub history: VecDeque<HistoryEntry>,
}

impl Endpoint {
    /// A freshly registered, never probed endpoint.
    pub(crate) fn new(id: EndpointId, url: String, name: String, expected_status: u16) -> Self {
        Self {
            id,
            url,
            name,
            expected_status,
            current_status: EndpointStatus::Unknown,
            last_checked: None,
            response_time_ms: None,
            history: VecDeque::new(),
        }
    }

    /// Record an observation and evict the oldest entries past the limit.
    pub(crate) fn record(
        &mut self,
        status: EndpointStatus,
        latency_ms: Option<f64>,
        timestamp: DateTime<Utc>,
    ) {
        self.current_status = status;
        self.response_time_ms = latency_ms;
        self.last_checked = Some(timestamp);

        self.history.push_back(HistoryEntry {
            timestamp,
            latency_ms,
            status,
        });
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }
}

/// Check the registration fields of an endpoint.
///
/// Only the URL scheme and the expected status range are checked; the name
/// is an opaque label.
pub fn validate_target(url: &str, expected_status: u16) -> StateResult<()> {
    validate_url(url)?;
    expected_status_from(i64::from(expected_status))?;
    Ok(())
}

/// Only `http://` and `https://` targets can be monitored.
pub fn validate_url(url: &str) -> StateResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(StateError::InvalidUrl(url.to_string()))
    }
}

/// Convert a raw expected status into a status code in 100..=599.
pub fn expected_status_from(raw: i64) -> StateResult<u16> {
    u16::try_from(raw)
        .ok()
        .filter(|status| EXPECTED_STATUS_RANGE.contains(status))
        .ok_or_else(|| StateError::InvalidExpectedStatus(raw.to_string()))
}
