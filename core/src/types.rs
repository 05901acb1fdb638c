//! Probe and issue types for schema-drift detection.
//!
//! A probe checks one schema element (a table, or a column of a table) and
//! yields a [`ProbeResult`]. Only results whose status is
//! [`ProbeStatus::Missing`] turn into a user-visible [`SchemaIssue`].

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Which kind of schema element a probe checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    Table,
    Column,
}

/// Outcome of probing one schema element.
///
/// # Examples
///
/// ```
/// use schema_guard_core::ProbeStatus;
///
/// assert!(ProbeStatus::Present.is_present());
/// assert!(ProbeStatus::Indeterminate.is_present());
/// assert!(!ProbeStatus::Missing.is_present());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// The query succeeded.
    Present,
    /// The backend reported the element as undefined.
    Missing,
    /// The query failed for a reason that says nothing about the schema
    /// (permissions, transport, malformed request).
    Indeterminate,
}

impl ProbeStatus {
    /// Fail-open view of the status: only a confirmed `Missing` is absent.
    pub fn is_present(self) -> bool {
        !matches!(self, ProbeStatus::Missing)
    }
}

/// The schema element a probe refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeTarget {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl ProbeTarget {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: None,
        }
    }

    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: Some(column.into()),
        }
    }

    pub fn kind(&self) -> ProbeKind {
        if self.column.is_some() {
            ProbeKind::Column
        } else {
            ProbeKind::Table
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}.{}", self.table, column),
            None => f.write_str(&self.table),
        }
    }
}

/// Result of checking a single table or column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub target: ProbeTarget,
    pub kind: ProbeKind,
    pub status: ProbeStatus,
}

impl ProbeResult {
    pub fn new(target: ProbeTarget, status: ProbeStatus) -> Self {
        let kind = target.kind();
        Self {
            target,
            kind,
            status,
        }
    }

    /// Whether the guard treats this element as present.
    pub fn present(&self) -> bool {
        self.status.is_present()
    }
}

/// One missing schema element, rendered as a human-readable warning.
///
/// # Examples
///
/// ```
/// use schema_guard_core::SchemaIssue;
///
/// let issue = SchemaIssue::MissingTable("courses".into());
/// assert_eq!(issue.to_string(), "Missing table: courses");
///
/// let issue = SchemaIssue::MissingColumn {
///     table: "profiles".into(),
///     column: "avatar_url".into(),
/// };
/// assert_eq!(issue.to_string(), "Column profiles.avatar_url not present");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaIssue {
    MissingTable(String),
    MissingColumn { table: String, column: String },
}

impl SchemaIssue {
    /// Builds an issue from a probe result. Returns `None` unless the
    /// element was confirmed missing.
    pub fn from_result(result: &ProbeResult) -> Option<Self> {
        if result.status != ProbeStatus::Missing {
            return None;
        }
        let table = result.target.table.clone();
        Some(match &result.target.column {
            Some(column) => SchemaIssue::MissingColumn {
                table,
                column: column.clone(),
            },
            None => SchemaIssue::MissingTable(table),
        })
    }

    pub fn table(&self) -> &str {
        match self {
            SchemaIssue::MissingTable(table) => table,
            SchemaIssue::MissingColumn { table, .. } => table,
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaIssue::MissingTable(table) => write!(f, "Missing table: {table}"),
            SchemaIssue::MissingColumn { table, column } => {
                write!(f, "Column {table}.{column} not present")
            }
        }
    }
}

impl Serialize for SchemaIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Failure returned by a [`MetadataProbe`](crate::MetadataProbe) query.
///
/// `code` carries the backend's structured classification when one is
/// available (`"undefined_table"`, `"42P01"`, `"PGRST205"`, ...); `message`
/// is free text and serves as the fallback signal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{}", .code.as_deref().map(|c| format!("[{c}] ")).unwrap_or_default(), .message)]
pub struct ProbeError {
    pub code: Option<String>,
    pub message: String,
}

impl ProbeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// An error with no structured code, e.g. a transport failure.
    pub fn uncoded(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_display_and_kind() {
        let t = ProbeTarget::table("teams");
        assert_eq!(t.to_string(), "teams");
        assert_eq!(t.kind(), ProbeKind::Table);

        let c = ProbeTarget::column("courses", "thumbnail_url");
        assert_eq!(c.to_string(), "courses.thumbnail_url");
        assert_eq!(c.kind(), ProbeKind::Column);
    }

    #[test]
    fn test_issue_only_from_missing() {
        let present = ProbeResult::new(ProbeTarget::table("teams"), ProbeStatus::Present);
        let unknown = ProbeResult::new(ProbeTarget::table("teams"), ProbeStatus::Indeterminate);
        let missing = ProbeResult::new(ProbeTarget::table("teams"), ProbeStatus::Missing);

        assert!(SchemaIssue::from_result(&present).is_none());
        assert!(SchemaIssue::from_result(&unknown).is_none());
        assert_eq!(
            SchemaIssue::from_result(&missing),
            Some(SchemaIssue::MissingTable("teams".into()))
        );
    }

    #[test]
    fn test_issue_serializes_as_message() {
        let issues = vec![
            SchemaIssue::MissingTable("enrollments".into()),
            SchemaIssue::MissingColumn {
                table: "courses".into(),
                column: "status".into(),
            },
        ];
        let json = serde_json::to_string(&issues).unwrap();
        assert_eq!(
            json,
            r#"["Missing table: enrollments","Column courses.status not present"]"#
        );
    }

    #[test]
    fn test_probe_error_display() {
        let coded = ProbeError::new("42P01", "relation \"public.teams\" does not exist");
        assert_eq!(
            coded.to_string(),
            "[42P01] relation \"public.teams\" does not exist"
        );
        assert_eq!(ProbeError::uncoded("timed out").to_string(), "timed out");

        let boxed: Box<dyn std::error::Error> = Box::new(coded);
        assert!(boxed.source().is_none());
    }
}
