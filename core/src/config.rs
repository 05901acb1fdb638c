//! Guard configuration: which tables and columns must exist, and how long a
//! result stays cached.
//!
//! Column probing is opt-in. The default configuration lists the LMS tables
//! only and leaves [`GuardConfig::required_columns`] empty.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cache lifetime in milliseconds.
pub const DEFAULT_CACHE_TTL_MS: u64 = 60_000;

/// Tables the admin dashboard cannot render without, in reporting order.
pub const DEFAULT_REQUIRED_TABLES: &[&str] = &[
    "teams",
    "profiles",
    "courses",
    "enrollments",
    "learning_plans",
    "content_assets",
];

/// What the guard checks and how long results are reused.
///
/// # Examples
///
/// ```
/// use schema_guard_core::GuardConfig;
///
/// let config = GuardConfig::default()
///     .with_required_column("courses", "thumbnail_url");
/// assert_eq!(config.required_tables[0], "teams");
/// assert_eq!(config.cache_ttl().as_secs(), 60);
/// assert!(config.validate().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Tables probed on every scan, in the order issues are reported.
    pub required_tables: Vec<String>,
    /// Optional per-table columns, probed only when the table is present.
    pub required_columns: BTreeMap<String, Vec<String>>,
    /// How long a computed issue list is served from cache.
    pub cache_ttl_ms: u64,
    /// Probe tables concurrently. Reported order is unaffected.
    pub parallel: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            required_tables: DEFAULT_REQUIRED_TABLES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            required_columns: BTreeMap::new(),
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            parallel: false,
        }
    }
}

impl GuardConfig {
    /// A configuration over an explicit table list with default TTL.
    pub fn for_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_tables: tables.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_required_column(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.required_columns
            .entry(table.into())
            .or_default()
            .push(column.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = ttl.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Columns configured for `table`, or an empty slice.
    pub fn columns_for(&self, table: &str) -> &[String] {
        self.required_columns
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Checks the configuration for structural mistakes.
    ///
    /// Returns every problem found; an empty vector means the configuration
    /// is usable.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.cache_ttl_ms == 0 {
            errors.push(ValidationError::ZeroTtl);
        }

        let mut seen_tables: HashSet<&str> = HashSet::new();
        for table in &self.required_tables {
            if let Some(err) = check_identifier(table) {
                errors.push(err);
                continue;
            }
            if !seen_tables.insert(table.as_str()) {
                errors.push(ValidationError::DuplicateTable(table.clone()));
            }
        }

        for (table, columns) in &self.required_columns {
            if !seen_tables.contains(table.as_str()) {
                errors.push(ValidationError::ColumnsForUnknownTable(table.clone()));
            }
            let mut seen_columns: HashSet<&str> = HashSet::new();
            for column in columns {
                if let Some(err) = check_identifier(column) {
                    errors.push(err);
                    continue;
                }
                if !seen_columns.insert(column.as_str()) {
                    errors.push(ValidationError::DuplicateColumn(format!("{table}.{column}")));
                }
            }
        }

        errors
    }
}

/// Guard configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("table or column name cannot be empty")]
    EmptyName,
    /// Not of the form `[A-Za-z_][A-Za-z0-9_]*`.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("duplicate required table: {0}")]
    DuplicateTable(String),
    #[error("duplicate required column: {0}")]
    DuplicateColumn(String),
    /// `required_columns` names a table that is not in `required_tables`.
    #[error("columns configured for table not in required_tables: {0}")]
    ColumnsForUnknownTable(String),
    #[error("cache_ttl_ms must be greater than zero")]
    ZeroTtl,
}

/// Returns `true` if `name` is a plain SQL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifier(name: &str) -> Option<ValidationError> {
    if name.trim().is_empty() {
        Some(ValidationError::EmptyName)
    } else if !is_valid_identifier(name) {
        Some(ValidationError::InvalidIdentifier(name.to_string()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GuardConfig::default();
        assert_eq!(
            config.required_tables,
            vec![
                "teams",
                "profiles",
                "courses",
                "enrollments",
                "learning_plans",
                "content_assets"
            ]
        );
        assert!(config.required_columns.is_empty());
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert!(!config.parallel);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_columns_for() {
        let config = GuardConfig::default()
            .with_required_column("profiles", "avatar_url")
            .with_required_column("profiles", "role");
        assert_eq!(config.columns_for("profiles"), ["avatar_url", "role"]);
        assert!(config.columns_for("teams").is_empty());
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut config = GuardConfig::for_tables(["teams", "teams", "bad-name", ""])
            .with_required_column("ghost", "id")
            .with_required_column("teams", "name")
            .with_required_column("teams", "name");
        config.cache_ttl_ms = 0;

        let errors = config.validate();
        assert!(errors.contains(&ValidationError::ZeroTtl));
        assert!(errors.contains(&ValidationError::DuplicateTable("teams".into())));
        assert!(errors.contains(&ValidationError::InvalidIdentifier("bad-name".into())));
        assert!(errors.contains(&ValidationError::EmptyName));
        assert!(errors.contains(&ValidationError::ColumnsForUnknownTable("ghost".into())));
        assert!(errors.contains(&ValidationError::DuplicateColumn("teams.name".into())));
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_valid_identifier("learning_plans"));
        assert!(is_valid_identifier("_private"));
        assert!(!is_valid_identifier("1teams"));
        assert!(!is_valid_identifier("teams;drop"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GuardConfig = serde_json::from_str(r#"{"cache_ttl_ms": 5000}"#).unwrap();
        assert_eq!(config.cache_ttl_ms, 5000);
        assert_eq!(config.required_tables.len(), 6);
    }

    #[test]
    fn test_with_cache_ttl() {
        let config = GuardConfig::default().with_cache_ttl(Duration::from_secs(5));
        assert_eq!(config.cache_ttl_ms, 5000);
    }
}
