//! Time-bounded cache for the last computed issue list.
//!
//! The cache stores one [`CacheEntry`] and hands it out while it is younger
//! than the TTL. Entries are only ever replaced whole, so a reader sees
//! either the previous list or the new one, never a mix.

use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::types::SchemaIssue;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced [`Clock`] for deterministic TTL tests.
///
/// Clones share the same offset, so a test can keep one handle and give
/// another to the cache.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.base + offset
    }
}

/// A computed issue list and the instant it was computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub issues: Vec<SchemaIssue>,
    pub computed_at: Instant,
}

/// Single-entry cache with a fixed TTL.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use schema_guard_core::{ManualClock, SchemaCache, SchemaIssue};
///
/// let clock = ManualClock::new();
/// let cache = SchemaCache::with_clock(Duration::from_secs(60), clock.clone());
///
/// cache.set(vec![SchemaIssue::MissingTable("teams".into())]);
/// assert!(cache.get().is_some());
///
/// clock.advance(Duration::from_secs(60));
/// assert!(cache.get().is_none());
/// ```
pub struct SchemaCache {
    ttl: Duration,
    clock: Box<dyn Clock>,
    entry: RwLock<Option<CacheEntry>>,
}

impl SchemaCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }

    pub fn with_clock(ttl: Duration, clock: impl Clock + 'static) -> Self {
        Self {
            ttl,
            clock: Box::new(clock),
            entry: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the stored entry if it is younger than the TTL.
    pub fn get(&self) -> Option<CacheEntry> {
        let guard = self.entry.read().unwrap_or_else(|e| e.into_inner());
        let entry = guard.as_ref()?;
        let age = self.clock.now().saturating_duration_since(entry.computed_at);
        if age < self.ttl {
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Replaces the stored entry with `issues`, stamped now.
    pub fn set(&self, issues: Vec<SchemaIssue>) {
        let entry = CacheEntry {
            issues,
            computed_at: self.clock.now(),
        };
        *self.entry.write().unwrap_or_else(|e| e.into_inner()) = Some(entry);
    }

    /// Drops the stored entry, forcing the next lookup to miss.
    pub fn clear(&self) {
        *self.entry.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("ttl", &self.ttl)
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issues() -> Vec<SchemaIssue> {
        vec![SchemaIssue::MissingTable("learning_plans".into())]
    }

    #[test]
    fn test_empty_cache_misses() {
        let cache = SchemaCache::new(Duration::from_secs(60));
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_hit_within_ttl() {
        let clock = ManualClock::new();
        let cache = SchemaCache::with_clock(Duration::from_millis(60_000), clock.clone());
        cache.set(issues());

        clock.advance(Duration::from_millis(59_999));
        let entry = cache.get().expect("entry should still be fresh");
        assert_eq!(entry.issues, issues());
    }

    #[test]
    fn test_miss_at_ttl_boundary() {
        let clock = ManualClock::new();
        let cache = SchemaCache::with_clock(Duration::from_millis(60_000), clock.clone());
        cache.set(issues());

        clock.advance(Duration::from_millis(60_000));
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_set_replaces_whole_entry() {
        let clock = ManualClock::new();
        let cache = SchemaCache::with_clock(Duration::from_secs(60), clock.clone());
        cache.set(issues());
        clock.advance(Duration::from_secs(30));
        cache.set(Vec::new());

        // Fresh timestamp from the second set keeps it alive past the first TTL.
        clock.advance(Duration::from_secs(45));
        let entry = cache.get().unwrap();
        assert!(entry.issues.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = SchemaCache::new(Duration::from_secs(60));
        cache.set(issues());
        cache.clear();
        assert!(cache.get().is_none());
    }
}
