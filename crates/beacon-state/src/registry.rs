//! Registry — the authoritative in-memory store of endpoint state.
//!
//! Provides identity assignment, snapshot reads, and probe-result
//! application. The registry is `Clone` (backed by `Arc<RwLock<..>>`) and
//! can be shared between API handlers and the probe coordinator.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::StateResult;
use crate::types::*;

struct Inner {
    /// Keyed by id; ids are assigned in increasing order, so iteration
    /// order is creation order.
    endpoints: BTreeMap<EndpointId, Endpoint>,
    next_id: EndpointId,
}

/// Thread-safe endpoint registry.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry. The first endpoint gets id 1.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                endpoints: BTreeMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Register a new endpoint and return its record.
    ///
    /// Rejected registrations do not consume an id.
    pub fn create(
        &self,
        url: impl Into<String>,
        name: impl Into<String>,
        expected_status: u16,
    ) -> StateResult<Endpoint> {
        let url = url.into();
        let name = name.into();
        validate_target(&url, expected_status)?;

        let mut inner = self.inner.write().expect("registry lock");
        let id = inner.next_id;
        inner.next_id += 1;

        let endpoint = Endpoint::new(id, url, name, expected_status);
        inner.endpoints.insert(id, endpoint.clone());

        debug!(id, url = %endpoint.url, expected_status, "endpoint registered");
        Ok(endpoint)
    }

    /// Snapshot of all endpoints in creation order.
    pub fn get_all(&self) -> Vec<Endpoint> {
        let inner = self.inner.read().expect("registry lock");
        inner.endpoints.values().cloned().collect()
    }

    /// Look up one endpoint.
    pub fn get(&self, id: EndpointId) -> Option<Endpoint> {
        let inner = self.inner.read().expect("registry lock");
        inner.endpoints.get(&id).cloned()
    }

    /// Look up many endpoints in request order, skipping unknown ids.
    pub fn resolve(&self, ids: &[EndpointId]) -> Vec<Endpoint> {
        let inner = self.inner.read().expect("registry lock");
        ids.iter()
            .filter_map(|id| inner.endpoints.get(id).cloned())
            .collect()
    }

    /// Apply one probe observation to an endpoint.
    ///
    /// Unknown ids are ignored. Returns whether an endpoint was updated.
    pub fn apply_result(
        &self,
        id: EndpointId,
        status: EndpointStatus,
        latency_ms: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> bool {
        let mut inner = self.inner.write().expect("registry lock");
        match inner.endpoints.get_mut(&id) {
            Some(endpoint) => {
                endpoint.record(status, latency_ms, timestamp);
                debug!(id, %status, ?latency_ms, history = endpoint.history.len(), "probe result applied");
                true
            }
            None => {
                debug!(id, "ignoring probe result for unknown endpoint");
                false
            }
        }
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("registry lock");
        inner.endpoints.len()
    }

    /// Whether no endpoint has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
