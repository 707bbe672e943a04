//! beacon-health — HTTP probing and batch coordination for Beacon.
//!
//! Provides a single bounded-time HTTP probe and a coordinator that fans
//! probes out concurrently and folds their results back into the registry.
//!
//! # Architecture
//!
//! ```text
//! Coordinator
//!   ├── probe_all(&[Endpoint])
//!   │   ├── one tokio task per endpoint
//!   │   │   └── Probe::probe() → ProbeResult (never fails)
//!   │   └── join in input order → Vec<EndpointCheck>
//!   └── check_now(&Registry, &[EndpointId])
//!       └── resolve → probe_all → Registry::apply_result per check
//! ```
//!
//! Every failure a probe can meet (timeout, connection error, anything
//! else, even a panicking task) becomes a `Down` result carrying an error
//! message. Nothing is retried.

pub mod coordinator;
pub mod error;
pub mod probe;

pub use coordinator::{Coordinator, EndpointCheck};
pub use error::{HealthError, HealthResult};
pub use probe::{DEFAULT_PROBE_TIMEOUT, HttpProbe, Probe, ProbeOutcome, ProbeResult};
