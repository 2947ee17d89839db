use thiserror::Error;

/// Error taxonomy for the Keymark service.
///
/// Configuration and startup failures are fatal; database failures that
/// occur while serving a request are mapped to HTTP 500 by the handler
/// layer (see `server::handlers`).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("server error: {0}")]
    Server(String),
}

/// Result alias used throughout the crate.
pub type ServiceResult<T> = Result<T, ServiceError>;
