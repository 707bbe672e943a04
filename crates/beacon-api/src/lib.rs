//! beacon-api — REST API for Beacon.
//!
//! Provides axum route handlers for registering endpoints, reading their
//! state, and triggering on-demand checks.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/endpoints` | List all endpoints |
//! | POST | `/api/v1/endpoints` | Register an endpoint |
//! | GET | `/api/v1/endpoints/{id}` | Get endpoint details |
//! | POST | `/api/v1/check-status` | Probe endpoints now and return them refreshed |

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use beacon_health::Coordinator;
use beacon_state::Registry;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Registry,
    pub coordinator: Coordinator,
}

/// Build the complete API router.
pub fn build_router(registry: Registry, coordinator: Coordinator) -> Router {
    let api_state = ApiState {
        registry,
        coordinator,
    };

    let api_routes = Router::new()
        .route("/endpoints", get(handlers::list_endpoints).post(handlers::create_endpoint))
        .route("/endpoints/{id}", get(handlers::get_endpoint))
        .route("/check-status", post(handlers::check_status))
        .with_state(api_state);

    Router::new().nest("/api/v1", api_routes)
}
