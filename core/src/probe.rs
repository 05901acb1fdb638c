//! Metadata probing and error classification.
//!
//! A [`MetadataProbe`] runs a head-only query (zero rows) against one table,
//! optionally selecting one column. The table and column probers turn the
//! outcome into a [`ProbeResult`] through [`classify`], which decides whether
//! a failure means "this element does not exist" or "we cannot tell".
//!
//! Classification is two-tier: a structured error code wins when the backend
//! supplies a recognised one; the free-text message is consulted only when
//! the code is absent or unknown. Anything that is not a confirmed miss is
//! [`Classification::Indeterminate`] and is treated as present.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::types::{ProbeError, ProbeKind, ProbeResult, ProbeStatus, ProbeTarget};

/// Codes that mean "relation does not exist".
const UNDEFINED_TABLE_CODES: &[&str] = &["undefined_table", "42P01", "PGRST205"];

/// Codes that mean "column does not exist".
const UNDEFINED_COLUMN_CODES: &[&str] = &["undefined_column", "42703", "PGRST204"];

static MISSING_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)relation\s+.+?\s+does not exist|could not find the table|no such table"#)
        .expect("static regex must compile")
});

static MISSING_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)column\s+.+?\s+does not exist|could not find the \S+ column|no such column"#)
        .expect("static regex must compile")
});

/// Head-only query capability exposed by the backend.
///
/// `query(table, None)` selects `*`; `query(table, Some(column))` selects a
/// single column. Implementations must not fetch row data. Success carries
/// nothing; failure carries the backend's code and message.
pub trait MetadataProbe: Send + Sync {
    fn query(&self, table: &str, column: Option<&str>) -> Result<(), ProbeError>;
}

impl<P: MetadataProbe + ?Sized> MetadataProbe for &P {
    fn query(&self, table: &str, column: Option<&str>) -> Result<(), ProbeError> {
        (**self).query(table, column)
    }
}

impl<P: MetadataProbe + ?Sized> MetadataProbe for Box<P> {
    fn query(&self, table: &str, column: Option<&str>) -> Result<(), ProbeError> {
        (**self).query(table, column)
    }
}

impl<P: MetadataProbe + ?Sized> MetadataProbe for Arc<P> {
    fn query(&self, table: &str, column: Option<&str>) -> Result<(), ProbeError> {
        (**self).query(table, column)
    }
}

/// How a probe failure is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The element is confirmed absent.
    Missing,
    /// The failure does not say anything about the schema.
    Indeterminate,
}

/// Classifies a probe failure for the given element kind.
///
/// # Examples
///
/// ```
/// use schema_guard_core::{Classification, ProbeError, ProbeKind, classify};
///
/// let err = ProbeError::new("42P01", "relation \"public.courses\" does not exist");
/// assert_eq!(classify(ProbeKind::Table, &err), Classification::Missing);
///
/// let denied = ProbeError::new("42501", "permission denied for table courses");
/// assert_eq!(classify(ProbeKind::Table, &denied), Classification::Indeterminate);
///
/// let uncoded = ProbeError::uncoded("column courses.status does not exist");
/// assert_eq!(classify(ProbeKind::Column, &uncoded), Classification::Missing);
/// ```
pub fn classify(kind: ProbeKind, error: &ProbeError) -> Classification {
    let (own_codes, pattern) = match kind {
        ProbeKind::Table => (UNDEFINED_TABLE_CODES, &*MISSING_TABLE_RE),
        ProbeKind::Column => (UNDEFINED_COLUMN_CODES, &*MISSING_COLUMN_RE),
    };

    if let Some(code) = error.code.as_deref() {
        if own_codes.contains(&code) {
            return Classification::Missing;
        }
        if is_structural_code(code) {
            return Classification::Indeterminate;
        }
    }

    if pattern.is_match(&error.message) {
        Classification::Missing
    } else {
        Classification::Indeterminate
    }
}

fn is_structural_code(code: &str) -> bool {
    UNDEFINED_TABLE_CODES.contains(&code) || UNDEFINED_COLUMN_CODES.contains(&code)
}

/// Checks whether `table` exists.
pub fn probe_table<P: MetadataProbe + ?Sized>(probe: &P, table: &str) -> ProbeResult {
    let status = status_of(ProbeKind::Table, probe.query(table, None), table, None);
    ProbeResult::new(ProbeTarget::table(table), status)
}

/// Checks whether `table.column` exists.
///
/// Only meaningful once the table itself is known to be present; a missing
/// table surfaces here as an indeterminate (present) column.
pub fn probe_column<P: MetadataProbe + ?Sized>(
    probe: &P,
    table: &str,
    column: &str,
) -> ProbeResult {
    let status = status_of(
        ProbeKind::Column,
        probe.query(table, Some(column)),
        table,
        Some(column),
    );
    ProbeResult::new(ProbeTarget::column(table, column), status)
}

fn status_of(
    kind: ProbeKind,
    outcome: Result<(), ProbeError>,
    table: &str,
    column: Option<&str>,
) -> ProbeStatus {
    match outcome {
        Ok(()) => ProbeStatus::Present,
        Err(err) => match classify(kind, &err) {
            Classification::Missing => ProbeStatus::Missing,
            Classification::Indeterminate => {
                debug!(table, column, error = %err, "Probe failed, treating as present");
                ProbeStatus::Indeterminate
            }
        },
    }
}
