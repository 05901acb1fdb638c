//! SQL generation for the LMS tables with an optional table prefix.
//!
//! Generates `CREATE TABLE` and `CREATE INDEX` statements mirroring the
//! tables the admin dashboard reads. The schema exists so the guard can be
//! exercised against a real database locally; it is not a migration engine.
//!
//! # Table structure
//!
//! - `{prefix}teams`: organisations owning courses and members
//! - `{prefix}profiles`: user profiles with team membership and role
//! - `{prefix}courses`: course catalogue per team
//! - `{prefix}enrollments`: learner progress through a course
//! - `{prefix}learning_plans`: curated course sequences
//! - `{prefix}content_assets`: storage-bucket objects attached to courses
//!
//! # Prefix
//!
//! The prefix may be empty. When set, it must contain only ASCII
//! alphanumerics and underscores.

use crate::error::{Result, SqliteError};

/// LMS tables in dependency order (parents first).
pub const LMS_TABLES: &[&str] = &[
    "teams",
    "profiles",
    "courses",
    "enrollments",
    "learning_plans",
    "content_assets",
];

/// Validates that a table prefix contains only alphanumerics and underscores.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Generates the SQL for all LMS tables and indexes with the given prefix.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix contains characters
/// other than alphanumerics and underscores.
pub fn generate_schema_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
CREATE TABLE IF NOT EXISTS {prefix}teams (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS {prefix}profiles (
    id TEXT PRIMARY KEY,
    team_id TEXT,
    full_name TEXT,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL DEFAULT 'learner' CHECK (role IN ('admin', 'manager', 'learner')),
    avatar_url TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (team_id) REFERENCES {prefix}teams(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS {prefix}courses (
    id TEXT PRIMARY KEY,
    team_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'published', 'archived')),
    thumbnail_url TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (team_id) REFERENCES {prefix}teams(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS {prefix}enrollments (
    id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL,
    profile_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'enrolled',
    progress REAL NOT NULL DEFAULT 0.0,
    enrolled_at TEXT NOT NULL DEFAULT (datetime('now')),
    completed_at TEXT,
    UNIQUE (course_id, profile_id),
    FOREIGN KEY (course_id) REFERENCES {prefix}courses(id) ON DELETE CASCADE,
    FOREIGN KEY (profile_id) REFERENCES {prefix}profiles(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS {prefix}learning_plans (
    id TEXT PRIMARY KEY,
    team_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    course_ids TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (team_id) REFERENCES {prefix}teams(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS {prefix}content_assets (
    id TEXT PRIMARY KEY,
    course_id TEXT,
    bucket TEXT NOT NULL,
    path TEXT NOT NULL,
    mime_type TEXT,
    size_bytes INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (bucket, path),
    FOREIGN KEY (course_id) REFERENCES {prefix}courses(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_{prefix}profiles_team ON {prefix}profiles(team_id);
CREATE INDEX IF NOT EXISTS idx_{prefix}courses_team ON {prefix}courses(team_id);
CREATE INDEX IF NOT EXISTS idx_{prefix}enrollments_profile ON {prefix}enrollments(profile_id);
CREATE INDEX IF NOT EXISTS idx_{prefix}learning_plans_team ON {prefix}learning_plans(team_id);
CREATE INDEX IF NOT EXISTS idx_{prefix}content_assets_course ON {prefix}content_assets(course_id);
"#,
        prefix = prefix
    );

    Ok(sql)
}

/// Generates SQL to drop all LMS tables in reverse dependency order.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix is invalid.
pub fn generate_drop_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql: String = LMS_TABLES
        .iter()
        .rev()
        .map(|table| format!("DROP TABLE IF EXISTS {prefix}{table};\n"))
        .collect();

    Ok(sql)
}
