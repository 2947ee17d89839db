use sqlx::{query, query_as, FromRow};
use std::sync::Arc;
use tracing::error;

#[cfg(feature = "sqlite")]
use sqlx::SqlitePool;

#[cfg(feature = "postgres")]
use sqlx::PgPool;

use crate::config::get_config;
use crate::errors::{ServiceError, ServiceResult};

/// A license record stored in the `licenses` table.
///
/// `license_key` is the table's primary key, so uniqueness is enforced by
/// the schema. `used` flips `false -> true` exactly once per intended use
/// and is never reset through this service.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LicenseRecord {
    pub license_key: String,
    pub used: bool,
}

/// Unified database abstraction over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl Database {
    /// Initialize the database connection pool based on configuration.
    ///
    /// The pool is created once at startup and shared across requests.
    /// A connection failure here is fatal: the server refuses to start
    /// without a working store.
    pub async fn new() -> ServiceResult<Arc<Self>> {
        let config = get_config()?;
        let db_config = &config.database;

        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let pool = SqlitePool::connect(&db_config.sqlite_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to SQLite: {e}");
                        ServiceError::Database(format!("failed to connect to SQLite: {e}"))
                    })?;

                Ok(Arc::new(Database::SQLite(pool)))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(ServiceError::Config(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPool::connect(&db_config.postgres_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {e}");
                        ServiceError::Database(format!("failed to connect to PostgreSQL: {e}"))
                    })?;

                Ok(Arc::new(Database::Postgres(pool)))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(ServiceError::Config(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(ServiceError::Config(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Returns the backend name ("sqlite" or "postgres") for diagnostics.
    pub fn backend(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
        }
    }

    /// Create the `licenses` table if it does not exist.
    ///
    /// Records are seeded externally; this only guarantees the schema is
    /// in place before the server starts accepting requests.
    pub async fn ensure_schema(&self) -> ServiceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS licenses (
                license_key TEXT PRIMARY KEY,
                used        BOOLEAN NOT NULL DEFAULT FALSE
            )
        "#;

        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(ddl).execute(pool).await.map_err(|e| {
                    error!("SQLite ensure_schema failed: {e}");
                    ServiceError::Database(format!("database error: {e}"))
                })?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(ddl).execute(pool).await.map_err(|e| {
                    error!("Postgres ensure_schema failed: {e}");
                    ServiceError::Database(format!("database error: {e}"))
                })?;
            }
        }

        Ok(())
    }

    /// Fetch a license record by its key.
    ///
    /// Returns:
    /// - `Ok(Some(LicenseRecord))` if found
    /// - `Ok(None)` if not found
    /// - `Err(ServiceError::Database)` on DB failure
    pub async fn find_license(&self, license_key: &str) -> ServiceResult<Option<LicenseRecord>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                let record = query_as::<_, LicenseRecord>(
                    "SELECT license_key, used FROM licenses WHERE license_key = ?",
                )
                .bind(license_key)
                .fetch_optional(pool)
                .await
                .map_err(|e| {
                    error!("SQLite find_license failed: {e}");
                    ServiceError::Database(format!("database error: {e}"))
                })?;

                Ok(record)
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let record = query_as::<_, LicenseRecord>(
                    "SELECT license_key, used FROM licenses WHERE license_key = $1",
                )
                .bind(license_key)
                .fetch_optional(pool)
                .await
                .map_err(|e| {
                    error!("Postgres find_license failed: {e}");
                    ServiceError::Database(format!("database error: {e}"))
                })?;

                Ok(record)
            }
        }
    }

    /// Set `used = true` on the record matching `license_key`.
    ///
    /// The update targets by key and applies unconditionally, so repeated
    /// calls are idempotent no-ops after the first.
    ///
    /// Returns:
    /// - `Ok(true)` if a row matched
    /// - `Ok(false)` if no matching row was found
    /// - `Err(ServiceError::Database)` on DB failure
    pub async fn mark_used(&self, license_key: &str) -> ServiceResult<bool> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query("UPDATE licenses SET used = TRUE WHERE license_key = ?")
                    .bind(license_key)
                    .execute(pool)
                    .await
                    .map_err(|e| {
                        error!("SQLite mark_used failed: {e}");
                        ServiceError::Database(format!("database error: {e}"))
                    })?
                    .rows_affected()
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query("UPDATE licenses SET used = TRUE WHERE license_key = $1")
                    .bind(license_key)
                    .execute(pool)
                    .await
                    .map_err(|e| {
                        error!("Postgres mark_used failed: {e}");
                        ServiceError::Database(format!("database error: {e}"))
                    })?
                    .rows_affected()
            }
        };

        Ok(rows_affected > 0)
    }

    /// Insert a license record, or update it if the key already exists.
    ///
    /// This is an "upsert" keyed on `license_key`, used for seeding and
    /// tests. The HTTP surface never creates records.
    pub async fn insert_license(&self, record: LicenseRecord) -> ServiceResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(
                    r#"
                    INSERT INTO licenses (license_key, used)
                    VALUES (?, ?)
                    ON CONFLICT(license_key) DO UPDATE SET
                        used = excluded.used
                    "#,
                )
                .bind(&record.license_key)
                .bind(record.used)
                .execute(pool)
                .await
                .map_err(|e| {
                    error!("SQLite insert_license failed: {e}");
                    ServiceError::Database(format!("database error: {e}"))
                })?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    r#"
                    INSERT INTO licenses (license_key, used)
                    VALUES ($1, $2)
                    ON CONFLICT (license_key) DO UPDATE SET
                        used = EXCLUDED.used
                    "#,
                )
                .bind(&record.license_key)
                .bind(record.used)
                .execute(pool)
                .await
                .map_err(|e| {
                    error!("Postgres insert_license failed: {e}");
                    ServiceError::Database(format!("database error: {e}"))
                })?;
            }
        }

        Ok(())
    }

    /// Check database connectivity with a trivial query.
    ///
    /// Used by the health endpoint; never returns an error, a failed
    /// round-trip reports as `false`.
    pub async fn ping(&self) -> bool {
        let result = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query("SELECT 1").execute(pool).await.map(|_| ()),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query("SELECT 1").execute(pool).await.map(|_| ()),
        };

        if let Err(e) = &result {
            error!("Database ping failed: {e}");
        }

        result.is_ok()
    }
}
