//! beacon.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use beacon_health::DEFAULT_PROBE_TIMEOUT;
use beacon_state::DEFAULT_EXPECTED_STATUS;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub server: ServerConfig,
    pub probe: ProbeConfig,
    /// Endpoints registered at startup.
    pub endpoints: Vec<EndpointSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Total timeout per probe, e.g. "10s" or "500ms".
    pub timeout: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: format!("{}s", DEFAULT_PROBE_TIMEOUT.as_secs()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSeed {
    pub url: String,
    pub name: String,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
}

fn default_expected_status() -> u16 {
    DEFAULT_EXPECTED_STATUS
}

impl BeaconConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: BeaconConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Probe timeout, falling back to the default when unparsable.
    pub fn probe_timeout(&self) -> Duration {
        parse_duration(&self.probe.timeout).unwrap_or_else(|| {
            warn!(
                timeout = %self.probe.timeout,
                "unparsable probe timeout, using default"
            );
            DEFAULT_PROBE_TIMEOUT
        })
    }
}

/// Parse a duration string like "10s", "500ms", "1m".
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
