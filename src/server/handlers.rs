//! Axum HTTP handlers for the license endpoints.
//!
//! # Endpoints
//!
//! - `GET /validate?license_key=...` - check a key (read-only)
//! - `POST /mark_used` with `{"license_key": "..."}` - consume a key
//! - `GET /health` - service and database status
//!
//! Handlers are stateless and hold no mutable state between requests; the
//! shared connection pool travels in [`AppState`].

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::errors::ServiceError;
use crate::server::database::Database;
use crate::server::logging::HealthResponse;
use crate::server::validation::require_field;

/// Shared application state for handlers.
///
/// Right now this only wraps the database, but later config or metrics
/// handles can be added without touching every handler signature.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

/// Generic error body for failures the caller cannot act on.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    pub status: String,
    pub message: String,
}

/// Map internal ServiceError into an HTTP response Axum understands.
///
/// This lets handlers return `Result<Response, ServiceError>` and have a
/// store failure mid-request surface as a 500 with a generic message;
/// details stay in the logs.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        error!("Request failed: {self}");

        let body = ErrorResponse {
            status: "error".to_string(),
            message: "internal server error".to_string(),
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Query parameters for the validate endpoint.
///
/// `license_key` is optional at the extractor level so that an absent
/// parameter reaches the handler's own 400 path instead of an axum
/// rejection.
#[derive(Debug, Deserialize)]
pub struct ValidateParams {
    #[serde(default)]
    pub license_key: Option<String>,
}

/// Response body for the validate endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub message: String,
}

/// Request body for the mark-used endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct MarkUsedRequest {
    #[serde(default)]
    pub license_key: Option<String>,
}

/// Response body for the mark-used endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct MarkUsedResponse {
    pub status: String,
    pub message: String,
}

fn validate_reply(status: StatusCode, valid: bool, message: &str) -> Response {
    let body = ValidateResponse {
        valid,
        message: message.to_string(),
    };
    (status, Json(body)).into_response()
}

fn mark_used_reply(status: StatusCode, outcome: &str, message: &str) -> Response {
    let body = MarkUsedResponse {
        status: outcome.to_string(),
        message: message.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Handler for validating a license key.
///
/// Outcomes:
/// - missing or blank key: 400, `valid: false`
/// - key not found: 401, `valid: false`
/// - key already used: 400, `valid: false`
/// - key present and unused: 200, `valid: true`
///
/// Read-only; a concurrent `mark_used` may commit between this lookup and
/// the caller acting on the result, which is acceptable since validation
/// is advisory.
pub async fn validate_handler(
    State(state): State<AppState>,
    Query(params): Query<ValidateParams>,
) -> Result<Response, ServiceError> {
    let license_key = match require_field(params.license_key.as_deref(), "license_key") {
        Ok(key) => key,
        Err(_) => {
            warn!("License key not provided in validate request");
            return Ok(validate_reply(
                StatusCode::BAD_REQUEST,
                false,
                "License key is required",
            ));
        }
    };

    info!(license_key = %license_key, "Validating license key");

    match state.db.find_license(license_key).await? {
        None => {
            info!(license_key = %license_key, "Invalid or expired license key");
            Ok(validate_reply(
                StatusCode::UNAUTHORIZED,
                false,
                "Invalid or expired license key",
            ))
        }
        Some(record) if record.used => {
            info!(license_key = %license_key, "License key has already been used");
            Ok(validate_reply(
                StatusCode::BAD_REQUEST,
                false,
                "License invalid - already used",
            ))
        }
        Some(_) => {
            info!(license_key = %license_key, "License key is valid");
            Ok(validate_reply(StatusCode::OK, true, "VALID"))
        }
    }
}

/// Handler for marking a license key as used.
///
/// The update targets by key and applies unconditionally; repeated calls
/// on the same key succeed (idempotent). Two concurrent calls race
/// harmlessly to the same terminal state.
///
/// A missing body, missing field, or blank value all take the 400 path so
/// the error body shape stays consistent.
pub async fn mark_used_handler(
    State(state): State<AppState>,
    payload: Option<Json<MarkUsedRequest>>,
) -> Result<Response, ServiceError> {
    let payload = payload.map(|Json(p)| p).unwrap_or(MarkUsedRequest {
        license_key: None,
    });

    let license_key = match require_field(payload.license_key.as_deref(), "license_key") {
        Ok(key) => key,
        Err(_) => {
            warn!("License key not provided in mark_used request");
            return Ok(mark_used_reply(
                StatusCode::BAD_REQUEST,
                "error",
                "License key is required",
            ));
        }
    };

    info!(license_key = %license_key, "Marking license key as used");

    if state.db.mark_used(license_key).await? {
        info!(license_key = %license_key, "License key marked as used");
        Ok(mark_used_reply(
            StatusCode::OK,
            "success",
            "License key marked as used",
        ))
    } else {
        error!(license_key = %license_key, "License key not found");
        Ok(mark_used_reply(
            StatusCode::NOT_FOUND,
            "error",
            "License key not found",
        ))
    }
}

/// Handler for the health endpoint.
///
/// Always returns 200; database trouble shows up as `status: "degraded"`
/// in the body rather than an error status.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.db.ping().await;
    Json(HealthResponse::healthy(connected, state.db.backend()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_maps_to_internal_server_error() {
        let err = ServiceError::Database("connection reset".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validate_response_serializes_expected_fields() {
        let body = ValidateResponse {
            valid: true,
            message: "VALID".to_string(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"valid\":true"));
        assert!(json.contains("\"message\":\"VALID\""));
    }

    #[test]
    fn mark_used_response_serializes_expected_fields() {
        let body = MarkUsedResponse {
            status: "success".to_string(),
            message: "License key marked as used".to_string(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"status\":\"success\""));
    }
}
