//! Schema guard: walks the required tables and columns, collects issues, and
//! caches the result.
//!
//! The guard never fails. Every table and column is probed independently and
//! classified on its own, and any failure that is not a confirmed miss counts
//! as present. A scan always ends with a (possibly empty) issue list.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::SchemaCache;
use crate::config::GuardConfig;
use crate::probe::{MetadataProbe, probe_column, probe_table};
use crate::types::{ProbeResult, ProbeStatus, SchemaIssue};

/// Outcome of an uncached scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// RFC 3339 timestamp of when the scan ran.
    pub checked_at: String,
    /// Every probe that was issued, in configured order.
    pub results: Vec<ProbeResult>,
    /// Issues derived from `results`.
    pub issues: Vec<SchemaIssue>,
}

impl ScanReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of probes that failed without a conclusive answer.
    pub fn indeterminate_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == ProbeStatus::Indeterminate)
            .count()
    }
}

/// Detects drift between the configured schema and the live backend.
///
/// # Examples
///
/// ```
/// use schema_guard_core::{GuardConfig, MetadataProbe, ProbeError, SchemaGuard};
///
/// struct NoCourses;
///
/// impl MetadataProbe for NoCourses {
///     fn query(&self, table: &str, _column: Option<&str>) -> Result<(), ProbeError> {
///         if table == "courses" {
///             Err(ProbeError::new("42P01", "relation \"public.courses\" does not exist"))
///         } else {
///             Ok(())
///         }
///     }
/// }
///
/// let guard = SchemaGuard::new(NoCourses, GuardConfig::default());
/// let issues: Vec<String> = guard.check_schema().iter().map(|i| i.to_string()).collect();
/// assert_eq!(issues, ["Missing table: courses"]);
/// ```
pub struct SchemaGuard<P> {
    probe: P,
    config: GuardConfig,
    cache: SchemaCache,
}

impl<P: MetadataProbe> SchemaGuard<P> {
    /// Creates a guard with a wall-clock cache using the configured TTL.
    pub fn new(probe: P, config: GuardConfig) -> Self {
        let cache = SchemaCache::new(config.cache_ttl());
        Self::with_cache(probe, config, cache)
    }

    /// Creates a guard around an existing cache. The cache's own TTL applies.
    pub fn with_cache(probe: P, config: GuardConfig, cache: SchemaCache) -> Self {
        Self {
            probe,
            config,
            cache,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Returns the current issue list, served from cache while fresh.
    ///
    /// An empty list means the schema is healthy.
    pub fn check_schema(&self) -> Vec<SchemaIssue> {
        if let Some(entry) = self.cache.get() {
            debug!(issues = entry.issues.len(), "Schema check served from cache");
            return entry.issues;
        }
        debug!("Schema cache miss, scanning");
        let report = self.scan();
        self.cache.set(report.issues.clone());
        report.issues
    }

    /// Discards any cached result and scans again.
    pub fn refresh(&self) -> Vec<SchemaIssue> {
        self.cache.clear();
        self.check_schema()
    }

    /// Probes every configured table and column, bypassing the cache.
    pub fn scan(&self) -> ScanReport {
        let tables = &self.config.required_tables;
        let per_table: Vec<Vec<ProbeResult>> = if self.config.parallel {
            tables.par_iter().map(|t| self.scan_table(t)).collect()
        } else {
            tables.iter().map(|t| self.scan_table(t)).collect()
        };

        let results: Vec<ProbeResult> = per_table.into_iter().flatten().collect();
        let issues: Vec<SchemaIssue> = results.iter().filter_map(SchemaIssue::from_result).collect();

        for issue in &issues {
            warn!(%issue, "Schema drift detected");
        }
        info!(
            tables = tables.len(),
            probes = results.len(),
            issues = issues.len(),
            "Schema scan complete"
        );

        ScanReport {
            checked_at: chrono::Utc::now().to_rfc3339(),
            results,
            issues,
        }
    }

    fn scan_table(&self, table: &str) -> Vec<ProbeResult> {
        let table_result = probe_table(&self.probe, table);
        if !table_result.present() {
            // No point probing columns of a table that is not there.
            return vec![table_result];
        }

        let columns = self.config.columns_for(table);
        let mut results = Vec::with_capacity(1 + columns.len());
        results.push(table_result);
        results.extend(
            columns
                .iter()
                .map(|column| probe_column(&self.probe, table, column)),
        );
        results
    }
}

impl<P> std::fmt::Debug for SchemaGuard<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaGuard")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProbeError, ProbeKind};

    struct MapProbe {
        missing_tables: Vec<&'static str>,
        missing_columns: Vec<(&'static str, &'static str)>,
    }

    impl MetadataProbe for MapProbe {
        fn query(&self, table: &str, column: Option<&str>) -> Result<(), ProbeError> {
            if self.missing_tables.contains(&table) {
                return Err(ProbeError::new("42P01", format!("relation \"{table}\" does not exist")));
            }
            if let Some(column) = column {
                if self.missing_columns.contains(&(table, column)) {
                    return Err(ProbeError::new(
                        "42703",
                        format!("column {table}.{column} does not exist"),
                    ));
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_scan_records_every_probe() {
        let probe = MapProbe {
            missing_tables: vec!["enrollments"],
            missing_columns: vec![("courses", "status")],
        };
        let config = GuardConfig::for_tables(["courses", "enrollments"])
            .with_required_column("courses", "title")
            .with_required_column("courses", "status")
            .with_required_column("enrollments", "progress");
        let guard = SchemaGuard::new(probe, config);

        let report = guard.scan();
        let targets: Vec<String> = report.results.iter().map(|r| r.target.to_string()).collect();
        assert_eq!(
            targets,
            ["courses", "courses.title", "courses.status", "enrollments"]
        );
        assert_eq!(report.results[2].kind, ProbeKind::Column);
        assert_eq!(
            report.issues,
            vec![
                SchemaIssue::MissingColumn {
                    table: "courses".into(),
                    column: "status".into()
                },
                SchemaIssue::MissingTable("enrollments".into()),
            ]
        );
        assert!(!report.is_healthy());
        assert_eq!(report.indeterminate_count(), 0);
    }

    #[test]
    fn test_parallel_scan_keeps_order() {
        let probe = MapProbe {
            missing_tables: vec!["profiles", "content_assets"],
            missing_columns: vec![],
        };
        let guard = SchemaGuard::new(probe, GuardConfig::default().with_parallel(true));
        let issues: Vec<String> = guard.scan().issues.iter().map(ToString::to_string).collect();
        assert_eq!(
            issues,
            ["Missing table: profiles", "Missing table: content_assets"]
        );
    }

    #[test]
    fn test_refresh_rescans() {
        let probe = MapProbe {
            missing_tables: vec![],
            missing_columns: vec![],
        };
        let guard = SchemaGuard::new(probe, GuardConfig::default());
        assert!(guard.check_schema().is_empty());
        assert!(guard.cache().get().is_some());
        assert!(guard.refresh().is_empty());
        assert!(guard.cache().get().is_some());
    }
}
