//! [`MetadataProbe`] over a SQLite connection.
//!
//! A probe prepares `SELECT <column|*> FROM <prefix><table> LIMIT 0` and
//! never steps it, so no row is ever read. SQLite resolves table and column
//! names at prepare time, which is exactly the signal the guard needs.

use std::sync::Mutex;

use rusqlite::Connection;
use schema_guard_core::{MetadataProbe, ProbeError, is_valid_identifier};
use tracing::trace;

use crate::error::Result;
use crate::schema::validate_prefix;

/// Code reported for names the probe refuses to interpolate into SQL.
pub const INVALID_IDENTIFIER: &str = "invalid_identifier";

/// Head-only probe against a SQLite database.
///
/// # Examples
///
/// ```
/// use rusqlite::Connection;
/// use schema_guard_core::{GuardConfig, SchemaGuard};
/// use schema_guard_sqlite::SqliteProbe;
///
/// let conn = Connection::open_in_memory().unwrap();
/// conn.execute_batch("CREATE TABLE teams (id TEXT PRIMARY KEY);").unwrap();
///
/// let probe = SqliteProbe::new(conn, "").unwrap();
/// let guard = SchemaGuard::new(probe, GuardConfig::for_tables(["teams", "courses"]));
/// let issues: Vec<String> = guard.check_schema().iter().map(|i| i.to_string()).collect();
/// assert_eq!(issues, ["Missing table: courses"]);
/// ```
pub struct SqliteProbe {
    conn: Mutex<Connection>,
    prefix: String,
}

impl SqliteProbe {
    /// Wraps a connection. Table names are looked up as `{prefix}{table}`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`](crate::SqliteError::InvalidPrefix)
    /// if the prefix contains invalid characters.
    pub fn new(conn: Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        Ok(Self {
            conn: Mutex::new(conn),
            prefix,
        })
    }

    /// Opens the database at `path` (creating it if absent).
    pub fn open(path: impl AsRef<std::path::Path>, prefix: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::new(conn, prefix)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Consumes the probe and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl MetadataProbe for SqliteProbe {
    fn query(&self, table: &str, column: Option<&str>) -> std::result::Result<(), ProbeError> {
        if !is_valid_identifier(table) {
            return Err(ProbeError::new(
                INVALID_IDENTIFIER,
                format!("refusing to probe table name '{table}'"),
            ));
        }
        let selection = match column {
            Some(column) if is_valid_identifier(column) => column,
            Some(column) => {
                return Err(ProbeError::new(
                    INVALID_IDENTIFIER,
                    format!("refusing to probe column name '{column}'"),
                ));
            }
            None => "*",
        };

        let sql = format!("SELECT {selection} FROM {}{table} LIMIT 0", self.prefix);
        trace!(%sql, "Preparing probe");

        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.prepare(&sql).map(|_| ()).map_err(probe_error)
    }
}

/// Maps a rusqlite error to a coded [`ProbeError`].
///
/// SQLite reports unresolved names at prepare time either as a plain failure
/// or as an input error carrying the offending offset; both are mapped the
/// same way.
fn probe_error(err: rusqlite::Error) -> ProbeError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, Some(message)) => {
            ProbeError::new(failure_code(failure, message), message.clone())
        }
        rusqlite::Error::SqlInputError { error, msg, .. } => {
            ProbeError::new(failure_code(error, msg), msg.clone())
        }
        rusqlite::Error::SqliteFailure(failure, None) => {
            ProbeError::new(format!("{:?}", failure.code), err.to_string())
        }
        _ => ProbeError::uncoded(err.to_string()),
    }
}

fn failure_code(failure: &rusqlite::ffi::Error, message: &str) -> String {
    if message.starts_with("no such table") {
        "undefined_table".to_string()
    } else if message.starts_with("no such column") {
        "undefined_column".to_string()
    } else {
        format!("{:?}", failure.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_guard_core::{Classification, ProbeKind, classify};

    fn probe_with(sql: &str, prefix: &str) -> SqliteProbe {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(sql).unwrap();
        SqliteProbe::new(conn, prefix).unwrap()
    }

    #[test]
    fn test_existing_table_and_column() {
        let probe = probe_with("CREATE TABLE courses (id TEXT, title TEXT);", "");
        assert!(probe.query("courses", None).is_ok());
        assert!(probe.query("courses", Some("title")).is_ok());
    }

    #[test]
    fn test_missing_table_code() {
        let probe = probe_with("", "");
        let err = probe.query("courses", None).unwrap_err();
        assert_eq!(err.code.as_deref(), Some("undefined_table"));
        assert!(err.message.contains("courses"));
    }

    #[test]
    fn test_missing_column_code() {
        let probe = probe_with("CREATE TABLE courses (id TEXT);", "");
        let err = probe.query("courses", Some("thumbnail_url")).unwrap_err();
        assert_eq!(err.code.as_deref(), Some("undefined_column"));
        assert_eq!(err.message, "no such column: thumbnail_url");
    }

    #[test]
    fn test_input_error_maps_like_failure() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE courses (id TEXT);").unwrap();
        let err = conn
            .prepare("SELECT thumbnail_url FROM courses LIMIT 0")
            .map(|_| ())
            .unwrap_err();
        let mapped = probe_error(err);
        assert_eq!(mapped.code.as_deref(), Some("undefined_column"));
        assert_eq!(
            classify(ProbeKind::Column, &mapped),
            Classification::Missing
        );
    }

    #[test]
    fn test_prefix_is_applied() {
        let probe = probe_with("CREATE TABLE lms_teams (id TEXT);", "lms_");
        assert!(probe.query("teams", None).is_ok());
        assert!(probe.query("lms_teams", None).is_err());
        assert_eq!(probe.prefix(), "lms_");
    }

    #[test]
    fn test_invalid_identifiers_are_not_interpolated() {
        let probe = probe_with("CREATE TABLE teams (id TEXT);", "");
        let err = probe.query("teams; DROP TABLE teams", None).unwrap_err();
        assert_eq!(err.code.as_deref(), Some(INVALID_IDENTIFIER));
        let err = probe.query("teams", Some("id, name")).unwrap_err();
        assert_eq!(err.code.as_deref(), Some(INVALID_IDENTIFIER));

        let conn = probe.into_connection();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='teams'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(SqliteProbe::new(conn, "x;--").is_err());
    }
}
