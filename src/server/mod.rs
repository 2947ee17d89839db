//! Server-side components for Keymark.
//!
//! This module contains:
//! - `database`   - DB abstraction over SQLite/Postgres
//! - `handlers`   - Axum HTTP handlers for the license endpoints
//! - `routes`     - Router builder
//! - `logging`    - tracing setup, request logging middleware, health types
//! - `validation` - Request validation utilities

pub mod database;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod validation;

// Convenient re-exports so callers can do `keymark::server::X`
// instead of digging into submodules.

pub use database::{Database, LicenseRecord};
pub use handlers::{
    health_handler, mark_used_handler, validate_handler, AppState, MarkUsedRequest,
    MarkUsedResponse, ValidateParams, ValidateResponse,
};
pub use logging::{
    generate_request_id, init_logging, request_logging_middleware, DatabaseHealth, HealthResponse,
    REQUEST_ID_HEADER,
};
pub use routes::build_router;
pub use validation::{require_field, validate_not_empty, ValidationError, ValidationResult};
