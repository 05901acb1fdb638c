//! Schema-drift detection for the LMS admin backend.
//!
//! The admin screens assume a set of tables (and optionally columns) exist on
//! the hosted backend. This crate checks that assumption cheaply before
//! rendering:
//!
//! - [`MetadataProbe`]: the backend capability, a head-only query against a
//!   table or a single column.
//! - [`classify`]: two-tier interpretation of a probe failure (structured
//!   code first, message pattern second).
//! - [`probe_table`] / [`probe_column`]: probe one element and classify it.
//! - [`SchemaCache`]: the last issue list, reused within a TTL.
//! - [`SchemaGuard`]: walks [`GuardConfig::required_tables`], collects
//!   [`SchemaIssue`]s, and refreshes the cache.
//!
//! Ambiguous failures (permission denied, transport errors) are treated as
//! "present": a spurious warning banner is worse than a missed one.
//!
//! # Example
//!
//! ```
//! use schema_guard_core::*;
//!
//! struct Healthy;
//!
//! impl MetadataProbe for Healthy {
//!     fn query(&self, _table: &str, _column: Option<&str>) -> Result<(), ProbeError> {
//!         Ok(())
//!     }
//! }
//!
//! let guard = SchemaGuard::new(Healthy, GuardConfig::default());
//! assert!(guard.check_schema().is_empty());
//! ```

mod cache;
mod config;
mod guard;
mod probe;
mod types;

pub use cache::{CacheEntry, Clock, ManualClock, SchemaCache, SystemClock};
pub use config::{
    DEFAULT_CACHE_TTL_MS, DEFAULT_REQUIRED_TABLES, GuardConfig, ValidationError,
    is_valid_identifier,
};
pub use guard::{ScanReport, SchemaGuard};
pub use probe::{Classification, MetadataProbe, classify, probe_column, probe_table};
pub use types::*;
