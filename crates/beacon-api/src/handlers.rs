//! REST API handlers.
//!
//! Each handler goes through the `Registry` (and, for checks, the
//! `Coordinator`) and returns JSON responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use beacon_state::{
    DEFAULT_EXPECTED_STATUS, EndpointId, StateError, StateResult, expected_status_from,
    validate_url,
};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// Unpack a JSON body, answering undecodable ones with a 400 envelope.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        let msg = rejection.body_text();
        debug!(error = %msg, "rejected request body");
        error_response(&msg, StatusCode::BAD_REQUEST).into_response()
    })
}

// ── Endpoints ──────────────────────────────────────────────────

/// Registration request body.
///
/// `url` and `name` must be present; `name` may be empty.
#[derive(Debug, Deserialize)]
pub struct CreateEndpointRequest {
    pub url: Option<String>,
    pub name: Option<String>,
    /// Left undecoded so a non-integer value is reported as a bad status.
    #[serde(default = "default_expected_status")]
    pub expected_status: Value,
}

fn default_expected_status() -> Value {
    Value::from(DEFAULT_EXPECTED_STATUS)
}

fn parse_expected_status(raw: &Value) -> StateResult<u16> {
    match raw.as_i64() {
        Some(code) => expected_status_from(code),
        None => Err(StateError::InvalidExpectedStatus(raw.to_string())),
    }
}

/// GET /api/v1/endpoints
pub async fn list_endpoints(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.registry.get_all())
}

/// GET /api/v1/endpoints/{id}
pub async fn get_endpoint(
    State(state): State<ApiState>,
    Path(id): Path<EndpointId>,
) -> impl IntoResponse {
    match state.registry.get(id) {
        Some(endpoint) => ApiResponse::ok(endpoint).into_response(),
        None => error_response("endpoint not found", StatusCode::NOT_FOUND).into_response(),
    }
}

/// POST /api/v1/endpoints
pub async fn create_endpoint(
    State(state): State<ApiState>,
    payload: Result<Json<CreateEndpointRequest>, JsonRejection>,
) -> Response {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let (Some(url), Some(name)) = (req.url, req.name) else {
        return error_response("URL and name are required", StatusCode::BAD_REQUEST)
            .into_response();
    };

    let created = validate_url(&url)
        .and_then(|()| parse_expected_status(&req.expected_status))
        .and_then(|expected_status| state.registry.create(url, name, expected_status));
    match created {
        Ok(endpoint) => {
            info!(id = endpoint.id, url = %endpoint.url, "endpoint registered");
            (StatusCode::CREATED, ApiResponse::ok(endpoint)).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response(),
    }
}

// ── Checks ─────────────────────────────────────────────────────

/// Check request body.
#[derive(Debug, Deserialize)]
pub struct CheckStatusRequest {
    pub endpoint_ids: Option<Vec<EndpointId>>,
}

/// POST /api/v1/check-status
pub async fn check_status(
    State(state): State<ApiState>,
    payload: Result<Json<CheckStatusRequest>, JsonRejection>,
) -> Response {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(endpoint_ids) = req.endpoint_ids else {
        return error_response("endpoint_ids are required", StatusCode::BAD_REQUEST)
            .into_response();
    };

    let refreshed = state
        .coordinator
        .check_now(&state.registry, &endpoint_ids)
        .await;
    ApiResponse::ok(refreshed).into_response()
}
