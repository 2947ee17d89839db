use tokio::net::TcpListener;
use tracing::info;

use keymark::config::init_config;
use keymark::errors::{ServiceError, ServiceResult};
use keymark::server::database::Database;
use keymark::server::handlers::AppState;
use keymark::server::logging::init_logging;
use keymark::server::routes::build_router;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Logging may not be up yet, so report on stderr as well.
        eprintln!("keymark server failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> ServiceResult<()> {
    // Fail fast on bad configuration, before opening any connections.
    let config = init_config()?;
    init_logging(&config.logging)?;

    // Connect the pool once at startup; a store connection failure here is
    // fatal and the process refuses to start.
    let db = Database::new().await?;
    db.ensure_schema().await?;
    info!("Connected to {} database", db.backend());

    let state = AppState { db };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ServiceError::Server(format!("failed to bind {addr}: {e}")))?;

    info!("Listening on http://{addr}");

    // The pool is dropped (and closed) when serve returns.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServiceError::Server(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received, stopping server");
    }
}
