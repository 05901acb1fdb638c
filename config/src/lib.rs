//! Settings file for the LMS schema guard.
//!
//! A settings file combines the guard configuration (which tables and
//! columns to check, cache TTL) with the backend the guard should probe.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! guard:
//!   required_tables: [teams, profiles, courses, enrollments, learning_plans, content_assets]
//!   required_columns:
//!     courses: [thumbnail_url]
//!   cache_ttl_ms: 60000
//!   parallel: false
//! backend:
//!   kind: rest
//!   url: https://project.example.co
//!   api_key_env: SCHEMA_GUARD_API_KEY
//! ```

mod error;
mod settings;

pub use error::{ConfigError, Result};
pub use settings::{BackendConfig, SETTINGS_VERSION, Settings};
