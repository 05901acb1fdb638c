//! Lifecycle operations for the local LMS tables.
//!
//! Provides [`Migration`] for creating and dropping the tables the admin
//! dashboard expects, and for reporting which of them exist. All mutation
//! operations run inside a transaction.
//!
//! # Example
//!
//! ```no_run
//! use schema_guard_sqlite::Migration;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("lms.db").unwrap();
//! let mut migration = Migration::new(conn, "").unwrap();
//!
//! migration.up().unwrap();
//! for table in migration.status().unwrap() {
//!     println!("{}: {:?}", table.name, table.rows);
//! }
//! ```

use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, SqliteError};
use crate::schema::{LMS_TABLES, generate_drop_sql, generate_schema_sql, validate_prefix};

/// Manages the lifecycle of the LMS tables in a SQLite database.
///
/// # Examples
///
/// ```
/// use schema_guard_sqlite::Migration;
/// use rusqlite::Connection;
///
/// let conn = Connection::open_in_memory().unwrap();
/// let mut migration = Migration::new(conn, "lms_").unwrap();
///
/// migration.up().unwrap();
/// assert!(migration.status().unwrap().iter().all(|t| t.exists));
///
/// migration.down().unwrap();
/// assert!(migration.status().unwrap().iter().all(|t| !t.exists));
/// ```
pub struct Migration {
    conn: Connection,
    prefix: String,
}

impl Migration {
    /// Creates a new migration manager for the given connection and table prefix.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`] if the prefix contains invalid characters.
    pub fn new(conn: Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn, prefix })
    }

    /// Creates all LMS tables and indexes.
    ///
    /// Uses `CREATE TABLE IF NOT EXISTS` so it is safe to call multiple times.
    pub fn up(&mut self) -> Result<()> {
        let sql = generate_schema_sql(&self.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::MigrationError(format!("failed to create tables: {e}")))?;
        tx.commit()?;
        info!(prefix = %self.prefix, "LMS tables created");
        Ok(())
    }

    /// Drops all LMS tables in reverse dependency order.
    ///
    /// Uses `DROP TABLE IF EXISTS` so it is safe to call even if tables
    /// do not exist.
    pub fn down(&mut self) -> Result<()> {
        let sql = generate_drop_sql(&self.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::MigrationError(format!("failed to drop tables: {e}")))?;
        tx.commit()?;
        info!(prefix = %self.prefix, "LMS tables dropped");
        Ok(())
    }

    /// Drops a single LMS table, leaving the rest in place.
    ///
    /// Useful for reproducing partial drift locally.
    pub fn drop_table(&mut self, table: &str) -> Result<()> {
        if !LMS_TABLES.contains(&table) {
            return Err(SqliteError::MigrationError(format!(
                "unknown LMS table '{table}'"
            )));
        }
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}{table};", self.prefix))?;
        Ok(())
    }

    /// Reports, for every LMS table, whether it exists and how many rows it has.
    pub fn status(&self) -> Result<Vec<TableStatus>> {
        LMS_TABLES
            .iter()
            .map(|table| {
                let exists = self.table_exists(table)?;
                let rows = if exists {
                    Some(self.count_rows(table)?)
                } else {
                    None
                };
                Ok(TableStatus {
                    name: table.to_string(),
                    exists,
                    rows,
                })
            })
            .collect()
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the migration and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let table_name = format!("{}{}", self.prefix, table);
        let mut stmt = self.conn.prepare(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        )?;
        let count: i64 = stmt.query_row([&table_name], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn count_rows(&self, table: &str) -> Result<usize> {
        let full_table = format!("{}{}", self.prefix, table);
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT COUNT(*) FROM {full_table}"))?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Existence and size of one LMS table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    /// Unprefixed table name.
    pub name: String,
    pub exists: bool,
    /// Row count, or `None` when the table does not exist.
    pub rows: Option<usize>,
}
