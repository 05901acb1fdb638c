//! PostgREST backend for the LMS schema guard.
//!
//! [`RestProbe`] asks the hosted backend for zero rows of a table (or of one
//! column) and passes any failure back as a coded
//! [`ProbeError`](schema_guard_core::ProbeError) for the guard to classify.
//! PostgREST reports undefined relations as `42P01` / `PGRST205` and
//! undefined columns as `42703` / `PGRST204`; everything else (bad key, row
//! level security, network trouble) ends up indeterminate.
//!
//! # Example
//!
//! ```no_run
//! use schema_guard_core::{GuardConfig, SchemaGuard};
//! use schema_guard_rest::RestProbe;
//!
//! let probe = RestProbe::new("https://project.example.co", "service-key").unwrap();
//! let guard = SchemaGuard::new(probe, GuardConfig::default());
//! for issue in guard.check_schema() {
//!     eprintln!("warning: {issue}");
//! }
//! ```

mod error;
mod probe;

pub use error::{RestError, Result};
pub use probe::{DEFAULT_TIMEOUT, RestProbe, error_from_response, probe_url};
