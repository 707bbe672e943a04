//! beacon-state — in-memory endpoint registry for Beacon.
//!
//! Owns the set of monitored endpoints for the lifetime of the process:
//! assigns monotonic ids on creation, applies probe observations, and keeps
//! each endpoint's history bounded to the most recent
//! [`HISTORY_LIMIT`] entries.
//!
//! # Architecture
//!
//! ```text
//! Registry (Clone, Arc<RwLock<..>>)
//!   ├── next_id counter (starts at 1, never reused)
//!   └── BTreeMap<EndpointId, Endpoint>
//!         └── history: VecDeque<HistoryEntry> (≤ 100, FIFO eviction)
//! ```
//!
//! Writers (`create`, `apply_result`) are serialized by the write lock so
//! id assignment and history append+trim are each a single atomic step.
//! Readers get cloned snapshots.

pub mod error;
pub mod registry;
pub mod types;

pub use error::{StateError, StateResult};
pub use registry::Registry;
pub use types::*;
