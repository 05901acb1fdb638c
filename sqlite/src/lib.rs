//! SQLite backend for the LMS schema guard.
//!
//! This crate lets the guard run against a local SQLite database that
//! mirrors the hosted backend's tables:
//!
//! - **`probe`**: [`SqliteProbe`], a head-only [`MetadataProbe`](schema_guard_core::MetadataProbe)
//!   that prepares (but never runs) a zero-row `SELECT`
//! - **`schema`**: SQL for the LMS tables with an optional prefix
//! - **`migration`**: create/drop the LMS tables and report their status
//!
//! # Quick start
//!
//! ```
//! use rusqlite::Connection;
//! use schema_guard_core::{GuardConfig, SchemaGuard};
//! use schema_guard_sqlite::{Migration, SqliteProbe};
//!
//! let mut migration = Migration::new(Connection::open_in_memory().unwrap(), "").unwrap();
//! migration.up().unwrap();
//!
//! let probe = SqliteProbe::new(migration.into_connection(), "").unwrap();
//! let guard = SchemaGuard::new(probe, GuardConfig::default());
//! assert!(guard.check_schema().is_empty());
//! ```

mod error;
mod migration;
mod probe;
mod schema;

pub use error::{Result, SqliteError};
pub use migration::{Migration, TableStatus};
pub use probe::{INVALID_IDENTIFIER, SqliteProbe};
pub use schema::{LMS_TABLES, generate_drop_sql, generate_schema_sql};
