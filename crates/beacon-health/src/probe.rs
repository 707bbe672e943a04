//! Health probe logic.
//!
//! Performs a single HTTP GET against an endpoint within a fixed total
//! timeout and classifies what happened into a [`ProbeOutcome`].

use std::future::Future;
use std::time::{Duration, Instant};

use beacon_state::EndpointStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HealthResult;

/// Total time budget of one probe (connect + response).
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// What a single probe ran into.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// A response arrived. Latency is measured from request start.
    Response { status_code: u16, latency_ms: f64 },
    /// No response within the timeout.
    Timeout,
    /// DNS, TCP, TLS or transport failure before a response.
    ConnectionError(String),
    /// Anything else.
    Unexpected(String),
}

impl ProbeOutcome {
    /// Liveness implied by this outcome.
    pub fn status(&self, expected_status: u16) -> EndpointStatus {
        match self {
            Self::Response { status_code, .. } => {
                EndpointStatus::from_status_match(*status_code, expected_status)
            }
            _ => EndpointStatus::Down,
        }
    }

    /// Operator-facing error message, if the probe failed to get a response.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Response { .. } => None,
            Self::Timeout => Some("Request timeout".to_string()),
            Self::ConnectionError(details) => Some(format!("Connection error: {details}")),
            Self::Unexpected(details) => Some(format!("Unexpected error: {details}")),
        }
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub url: String,
    /// Either `Operational` or `Down`.
    pub status: EndpointStatus,
    pub latency_ms: Option<f64>,
    pub actual_status_code: Option<u16>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProbeResult {
    /// Project an outcome onto a result record.
    pub fn from_outcome(
        url: impl Into<String>,
        expected_status: u16,
        outcome: ProbeOutcome,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let status = outcome.status(expected_status);
        let error = outcome.error_message();
        let (latency_ms, actual_status_code) = match outcome {
            ProbeOutcome::Response {
                status_code,
                latency_ms,
            } => (Some(latency_ms), Some(status_code)),
            _ => (None, None),
        };

        Self {
            url: url.into(),
            status,
            latency_ms,
            actual_status_code,
            error,
            timestamp,
        }
    }

    /// A `Down` result for a probe that could not run to completion.
    pub fn unexpected(url: impl Into<String>, details: impl Into<String>) -> Self {
        Self::from_outcome(url, 0, ProbeOutcome::Unexpected(details.into()), Utc::now())
    }
}

/// Anything that can health-check one URL.
///
/// Implementations must not fail: every problem is reported through the
/// returned [`ProbeResult`].
pub trait Probe: Send + Sync + 'static {
    fn probe(&self, url: &str, expected_status: u16) -> impl Future<Output = ProbeResult> + Send;
}

/// Probe backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    /// Create a probe with the default 10s timeout.
    pub fn new() -> HealthResult<Self> {
        Self::with_timeout(DEFAULT_PROBE_TIMEOUT)
    }

    /// Create a probe with a custom total timeout.
    pub fn with_timeout(timeout: Duration) -> HealthResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("beacon-health/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    /// The total timeout applied to each probe.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one GET and classify the outcome. Never retries.
    pub async fn check(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, self.client.get(url).send()).await {
            Ok(Ok(resp)) => ProbeOutcome::Response {
                status_code: resp.status().as_u16(),
                latency_ms: start.elapsed().as_secs_f64() * 1000.0,
            },
            Ok(Err(e)) => classify(&e),
            Err(_) => ProbeOutcome::Timeout,
        };

        debug!(%url, ?outcome, "probe finished");
        outcome
    }
}

impl Probe for HttpProbe {
    async fn probe(&self, url: &str, expected_status: u16) -> ProbeResult {
        let outcome = self.check(url).await;
        ProbeResult::from_outcome(url, expected_status, outcome, Utc::now())
    }
}

/// Sort a client error into the outcome buckets.
fn classify(err: &reqwest::Error) -> ProbeOutcome {
    if err.is_timeout() {
        ProbeOutcome::Timeout
    } else if err.is_builder() {
        ProbeOutcome::Unexpected(error_chain(err))
    } else {
        ProbeOutcome::ConnectionError(error_chain(err))
    }
}

/// Render an error with all of its sources, outermost first.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
