//! Coordinator — runs probes for a batch of endpoints concurrently.
//!
//! Each endpoint gets its own tokio task. The batch completes only after
//! every task has settled, and results come back in the order the
//! endpoints were given. A failing task never affects its siblings.

use std::sync::Arc;
use std::time::Instant;

use beacon_state::{Endpoint, EndpointId, EndpointStatus, Registry};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::HealthResult;
use crate::probe::{HttpProbe, Probe, ProbeResult};

/// A probe result paired with the endpoint it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointCheck {
    pub id: EndpointId,
    pub name: String,
    #[serde(flatten)]
    pub result: ProbeResult,
}

/// Fans probes out over a batch of endpoints and joins them.
pub struct Coordinator<P = HttpProbe> {
    probe: Arc<P>,
}

impl<P> Clone for Coordinator<P> {
    fn clone(&self) -> Self {
        Self {
            probe: Arc::clone(&self.probe),
        }
    }
}

impl Coordinator<HttpProbe> {
    /// Create a coordinator backed by an HTTP probe with the default timeout.
    pub fn new() -> HealthResult<Self> {
        Ok(Self::with_probe(HttpProbe::new()?))
    }
}

impl<P: Probe> Coordinator<P> {
    /// Create a coordinator around a specific probe implementation.
    pub fn with_probe(probe: P) -> Self {
        Self {
            probe: Arc::new(probe),
        }
    }

    /// The probe used for every endpoint.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Probe every endpoint concurrently.
    ///
    /// Returns exactly one check per input endpoint; check `i` describes
    /// endpoint `i`. An empty batch returns immediately.
    pub async fn probe_all(&self, endpoints: &[Endpoint]) -> Vec<EndpointCheck> {
        if endpoints.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let handles: Vec<_> = endpoints
            .iter()
            .map(|endpoint| {
                let probe = Arc::clone(&self.probe);
                let url = endpoint.url.clone();
                let expected_status = endpoint.expected_status;
                tokio::spawn(async move { probe.probe(&url, expected_status).await })
            })
            .collect();

        let mut checks = Vec::with_capacity(endpoints.len());
        for (endpoint, handle) in endpoints.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(endpoint_id = endpoint.id, error = %e, "probe task failed");
                    ProbeResult::unexpected(&endpoint.url, format!("probe task failed: {e}"))
                }
            };
            checks.push(EndpointCheck {
                id: endpoint.id,
                name: endpoint.name.clone(),
                result,
            });
        }

        let down = checks
            .iter()
            .filter(|c| c.result.status == EndpointStatus::Down)
            .count();
        info!(
            total = checks.len(),
            operational = checks.len() - down,
            down,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "probe batch completed"
        );

        checks
    }

    /// Probe the given endpoints now and fold the results into the registry.
    ///
    /// Unknown ids are skipped. Results are applied one by one after the
    /// whole batch has settled. Returns the refreshed records in request
    /// order.
    pub async fn check_now(&self, registry: &Registry, ids: &[EndpointId]) -> Vec<Endpoint> {
        let endpoints = registry.resolve(ids);
        if endpoints.len() < ids.len() {
            debug!(
                requested = ids.len(),
                known = endpoints.len(),
                "skipping unknown endpoint ids"
            );
        }

        let checks = self.probe_all(&endpoints).await;
        for check in &checks {
            registry.apply_result(
                check.id,
                check.result.status,
                check.result.latency_ms,
                check.result.timestamp,
            );
        }

        checks.iter().filter_map(|c| registry.get(c.id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::Utc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::probe::ProbeOutcome;

    /// Probe whose behavior is chosen by the URL:
    /// `panic` panics, `down` fails to connect, `slow-<ms>` sleeps first.
    #[derive(Default)]
    struct ScriptedProbe {
        calls: AtomicUsize,
    }

    impl Probe for ScriptedProbe {
        async fn probe(&self, url: &str, expected_status: u16) -> ProbeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("panic") {
                panic!("probe exploded");
            }
            if let Some(ms) = url.strip_prefix("http://slow-") {
                let ms: u64 = ms.parse().unwrap();
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            let outcome = if url.contains("down") {
                ProbeOutcome::ConnectionError("refused".into())
            } else {
                ProbeOutcome::Response {
                    status_code: 200,
                    latency_ms: 1.0,
                }
            };
            ProbeResult::from_outcome(url, expected_status, outcome, Utc::now())
        }
    }

    fn endpoints(urls: &[&str]) -> (Registry, Vec<Endpoint>) {
        let registry = Registry::new();
        for (i, url) in urls.iter().enumerate() {
            registry.create(*url, format!("ep-{i}"), 200).unwrap();
        }
        let all = registry.get_all();
        (registry, all)
    }

    #[tokio::test]
    async fn empty_batch_issues_no_probes() {
        let coordinator = Coordinator::with_probe(ScriptedProbe::default());
        let checks = coordinator.probe_all(&[]).await;
        assert!(checks.is_empty());
        assert_eq!(coordinator.probe().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn results_align_with_input_order() {
        // Later endpoints finish first.
        let (_, eps) = endpoints(&[
            "http://slow-150",
            "http://slow-100",
            "http://slow-50",
            "http://slow-0",
        ]);
        let coordinator = Coordinator::with_probe(ScriptedProbe::default());

        let checks = coordinator.probe_all(&eps).await;
        assert_eq!(checks.len(), eps.len());
        for (check, ep) in checks.iter().zip(&eps) {
            assert_eq!(check.id, ep.id);
            assert_eq!(check.name, ep.name);
            assert_eq!(check.result.url, ep.url);
        }
    }

    #[tokio::test]
    async fn probes_run_concurrently() {
        let (_, eps) = endpoints(&["http://slow-400", "http://slow-400", "http://slow-400"]);
        let coordinator = Coordinator::with_probe(ScriptedProbe::default());

        let started = Instant::now();
        coordinator.probe_all(&eps).await;
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn panicking_probe_is_isolated() {
        let (_, eps) = endpoints(&["http://up-a", "http://panic", "http://down", "http://up-b"]);
        let coordinator = Coordinator::with_probe(ScriptedProbe::default());

        let checks = coordinator.probe_all(&eps).await;
        assert_eq!(checks.len(), 4);

        assert_eq!(checks[0].result.status, EndpointStatus::Operational);
        assert_eq!(checks[1].result.status, EndpointStatus::Down);
        assert!(checks[1].result.error.as_deref().unwrap().starts_with("Unexpected error: "));
        assert_eq!(checks[2].result.status, EndpointStatus::Down);
        assert_eq!(checks[2].result.error.as_deref(), Some("Connection error: refused"));
        assert_eq!(checks[3].result.status, EndpointStatus::Operational);
        assert_eq!(coordinator.probe().calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn duplicate_endpoints_each_get_a_result() {
        let (_, eps) = endpoints(&["http://up"]);
        let batch = vec![eps[0].clone(), eps[0].clone(), eps[0].clone()];
        let coordinator = Coordinator::with_probe(ScriptedProbe::default());

        let checks = coordinator.probe_all(&batch).await;
        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|c| c.id == eps[0].id));
    }

    #[tokio::test]
    async fn check_now_applies_results_and_skips_unknown() {
        let (registry, eps) = endpoints(&["http://up", "http://down"]);
        let coordinator = Coordinator::with_probe(ScriptedProbe::default());

        let refreshed = coordinator
            .check_now(&registry, &[eps[1].id, 42, eps[0].id])
            .await;

        let ids: Vec<_> = refreshed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![eps[1].id, eps[0].id]);

        let down = registry.get(eps[1].id).unwrap();
        assert_eq!(down.current_status, EndpointStatus::Down);
        assert!(down.response_time_ms.is_none());
        assert!(down.last_checked.is_some());
        assert_eq!(down.history.len(), 1);

        let up = registry.get(eps[0].id).unwrap();
        assert_eq!(up.current_status, EndpointStatus::Operational);
        assert_eq!(up.response_time_ms, Some(1.0));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn check_now_with_no_known_ids_is_empty() {
        let (registry, _) = endpoints(&["http://up"]);
        let coordinator = Coordinator::with_probe(ScriptedProbe::default());

        assert!(coordinator.check_now(&registry, &[7, 8]).await.is_empty());
        assert!(coordinator.check_now(&registry, &[]).await.is_empty());
        assert_eq!(coordinator.probe().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn http_batch_mixes_outcomes_independently() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let registry = Registry::new();
        let up = registry.create(server.uri(), "up", 200).unwrap();
        let wrong = registry.create(server.uri(), "wrong", 404).unwrap();
        let gone = registry.create("http://127.0.0.1:1", "gone", 200).unwrap();

        let coordinator =
            Coordinator::with_probe(HttpProbe::with_timeout(Duration::from_secs(5)).unwrap());
        let refreshed = coordinator
            .check_now(&registry, &[up.id, wrong.id, gone.id])
            .await;

        assert_eq!(refreshed[0].current_status, EndpointStatus::Operational);
        assert!(refreshed[0].response_time_ms.is_some());
        assert_eq!(refreshed[1].current_status, EndpointStatus::Down);
        assert!(refreshed[1].response_time_ms.is_some());
        assert_eq!(refreshed[2].current_status, EndpointStatus::Down);
        assert!(refreshed[2].response_time_ms.is_none());
    }

    #[test]
    fn endpoint_check_flattens_probe_result() {
        let check = EndpointCheck {
            id: 3,
            name: "api".into(),
            result: ProbeResult::from_outcome(
                "http://a",
                200,
                ProbeOutcome::Response {
                    status_code: 200,
                    latency_ms: 5.0,
                },
                Utc::now(),
            ),
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["status"], "Operational");
        assert_eq!(json["actual_status_code"], 200);
    }
}
