//! Short-lived cache of shaped report results.
//!
//! Advisory only: entries expire by age and a miss simply runs the query.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use castormon_core::outcome::Outcome;
use castormon_core::report::ReportData;
use castormon_core::series::GapFill;
use castormon_core::sql::CompiledQuery;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportCacheKey {
    pub instance: String,
    pub report: &'static str,
    pub query: CompiledQuery,
    pub fill: GapFill,
}

#[derive(Debug, Clone)]
struct CachedReport {
    outcome: Outcome<ReportData>,
    stored_at: Instant,
}

pub struct ReportCache {
    ttl: Duration,
    entries: RwLock<HashMap<ReportCacheKey, CachedReport>>,
}

impl ReportCache {
    /// A zero TTL disables the cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get(&self, key: &ReportCacheKey) -> Option<Outcome<ReportData>> {
        if !self.is_enabled() {
            return None;
        }
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.outcome.clone())
    }

    /// Store a result, dropping expired entries first.
    pub fn insert(&self, key: ReportCacheKey, outcome: Outcome<ReportData>) {
        if !self.is_enabled() {
            return;
        }
        let now = Instant::now();
        let ttl = self.ttl;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| now.duration_since(entry.stored_at) <= ttl);
        entries.insert(
            key,
            CachedReport {
                outcome,
                stored_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
