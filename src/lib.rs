//! Keymark - a minimal license-key validation server.
//!
//! The service exposes two operations backed by a single `licenses` table:
//!
//! - `GET /validate?license_key=...` - check that a key exists and is unused
//! - `POST /mark_used` - consume a key (one-way `used` flag, idempotent)
//!
//! A supplemental `GET /health` endpoint reports database connectivity.
//!
//! # Features
//!
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//!
//! Records are seeded externally; the HTTP surface never creates or
//! deletes licenses.

pub mod config;
pub mod errors;

pub mod server;
