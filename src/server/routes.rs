use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::handlers::{health_handler, mark_used_handler, validate_handler, AppState};
use crate::server::logging::request_logging_middleware;

/// Build the application router.
///
/// This is a convenience helper so `main.rs` or tests can construct the
/// router in a single call.
///
/// # Routes
///
/// - `GET /validate` - Validate a license key (query param `license_key`)
/// - `POST /mark_used` - Mark a license key as used (JSON body)
/// - `GET /health` - Service and database status
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/validate", get(validate_handler))
        .route("/mark_used", post(mark_used_handler))
        .route("/health", get(health_handler))
        .layer(middleware::from_fn(request_logging_middleware))
        .with_state(state)
}
