//! Per-series freshness cache.
//!
//! One entry per `(series kind, BA)`. Entries are immutable once stored and
//! swapped as a whole on refresh, so a reader holding an `Arc<CacheEntry>`
//! keeps a complete table even while another caller replaces it. Concurrent
//! refreshes of the same key are allowed; the last write wins.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::data::eia::{DiagnosticKind, FetchOutcome, SeriesQuery, SeriesSource};
use crate::domain::{CacheEntry, SeriesKind};
use crate::error::{EngineError, EngineResult};

/// Source of "now" for freshness decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Test builds only.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    now: parking_lot::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: parking_lot::Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// True while an entry fetched at `fetched_at` may still be served at `now`.
///
/// An entry exactly `max_age` old is already stale.
pub fn is_fresh(fetched_at: DateTime<Utc>, now: DateTime<Utc>, max_age: TimeDelta) -> bool {
    now - fetched_at < max_age
}

type CacheKey = (SeriesKind, String);

#[derive(Debug, Default)]
pub struct FreshnessCache {
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
}

impl FreshnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, kind: SeriesKind, ba: &str) -> Option<Arc<CacheEntry>> {
        self.entries.read().get(&(kind, ba.to_string())).cloned()
    }

    /// Serve the cached table for `query`, refetching it when missing or stale.
    ///
    /// If the refetch comes back unavailable and an older entry exists, the
    /// older entry is served. A malformed payload is never papered over.
    pub fn get_or_refresh(
        &self,
        query: &SeriesQuery,
        max_age: TimeDelta,
        now: DateTime<Utc>,
        source: &dyn SeriesSource,
    ) -> EngineResult<Arc<CacheEntry>> {
        let current = self.entry(query.kind, &query.ba);
        if let Some(entry) = &current {
            if is_fresh(entry.fetched_at, now, max_age) {
                debug!(series = %query.kind, ba = %query.ba, fetched_at = %entry.fetched_at, "cache hit");
                return Ok(Arc::clone(entry));
            }
        }

        match source.fetch(query) {
            FetchOutcome::Data(table) => {
                info!(series = %query.kind, ba = %query.ba, rows = table.len(), "cache refreshed");
                let entry = Arc::new(CacheEntry {
                    table,
                    fetched_at: now,
                    ba: query.ba.clone(),
                });
                self.entries
                    .write()
                    .insert((query.kind, query.ba.clone()), Arc::clone(&entry));
                Ok(entry)
            }
            FetchOutcome::Absent(diag) => match (diag.kind, current) {
                (DiagnosticKind::Malformed, _) => Err(EngineError::MalformedPayload {
                    series: query.kind,
                    reason: diag.message,
                }),
                (DiagnosticKind::Unavailable, Some(stale)) => {
                    warn!(
                        series = %query.kind,
                        ba = %query.ba,
                        fetched_at = %stale.fetched_at,
                        "refresh failed ({}), serving stale entry",
                        diag.message
                    );
                    Ok(stale)
                }
                (DiagnosticKind::Unavailable, None) => Err(EngineError::FetchUnavailable {
                    series: query.kind,
                    ba: query.ba.clone(),
                    reason: diag.message,
                }),
            },
        }
    }

    pub fn invalidate(&self, kind: SeriesKind, ba: &str) {
        self.entries.write().remove(&(kind, ba.to_string()));
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;
    use parking_lot::Mutex;

    use super::*;
    use crate::data::eia::FetchDiagnostic;
    use crate::domain::{Frequency, SeriesTable, TimeSeriesPoint};

    struct CountingSource {
        calls: AtomicUsize,
        outcome: Mutex<FetchOutcome>,
    }

    impl CountingSource {
        fn new(outcome: FetchOutcome) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome: Mutex::new(outcome),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set(&self, outcome: FetchOutcome) {
            *self.outcome.lock() = outcome;
        }
    }

    impl SeriesSource for CountingSource {
        fn fetch(&self, _query: &SeriesQuery) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.lock().clone()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn query() -> SeriesQuery {
        SeriesQuery {
            kind: SeriesKind::Mix,
            ba: "CISO".to_string(),
            start: t0() - TimeDelta::days(5),
            end: t0() + TimeDelta::days(1),
            frequency: Frequency::Hourly,
        }
    }

    fn table(value: f64) -> FetchOutcome {
        FetchOutcome::Data(SeriesTable::new(
            SeriesKind::Mix,
            "CISO",
            vec![TimeSeriesPoint::new(t0(), "solar", value)],
        ))
    }

    #[test]
    fn entry_is_reused_before_max_age_and_refreshed_at_it() {
        let cache = FreshnessCache::new();
        let source = CountingSource::new(table(1.0));
        let max_age = TimeDelta::hours(1);

        cache.get_or_refresh(&query(), max_age, t0(), &source).unwrap();
        assert_eq!(source.calls(), 1);

        let just_before = t0() + TimeDelta::hours(1) - TimeDelta::seconds(1);
        cache.get_or_refresh(&query(), max_age, just_before, &source).unwrap();
        assert_eq!(source.calls(), 1, "entry younger than max age must be reused");

        let at_boundary = t0() + TimeDelta::hours(1);
        let entry = cache.get_or_refresh(&query(), max_age, at_boundary, &source).unwrap();
        assert_eq!(source.calls(), 2, "entry exactly max age old must be refreshed");
        assert_eq!(entry.fetched_at, at_boundary);
    }

    #[test]
    fn freshness_comparison_direction() {
        let max_age = TimeDelta::hours(1);
        assert!(is_fresh(t0(), t0() + TimeDelta::minutes(59), max_age));
        assert!(!is_fresh(t0(), t0() + TimeDelta::minutes(60), max_age));
        assert!(!is_fresh(t0(), t0() + TimeDelta::days(2), max_age));
    }

    #[test]
    fn refresh_replaces_entry_without_touching_held_copy() {
        let cache = FreshnessCache::new();
        let source = CountingSource::new(table(1.0));
        let max_age = TimeDelta::hours(1);

        let old = cache.get_or_refresh(&query(), max_age, t0(), &source).unwrap();
        source.set(table(2.0));
        let new = cache
            .get_or_refresh(&query(), max_age, t0() + TimeDelta::hours(2), &source)
            .unwrap();

        assert_eq!(old.table.points[0].value, 1.0);
        assert_eq!(new.table.points[0].value, 2.0);
        assert_eq!(cache.entry(SeriesKind::Mix, "CISO").unwrap().table.points[0].value, 2.0);
    }

    #[test]
    fn unavailable_refresh_falls_back_to_stale_entry() {
        let cache = FreshnessCache::new();
        let source = CountingSource::new(table(1.0));
        let max_age = TimeDelta::hours(1);
        cache.get_or_refresh(&query(), max_age, t0(), &source).unwrap();

        source.set(FetchOutcome::Absent(FetchDiagnostic::unavailable("timeout")));
        let entry = cache
            .get_or_refresh(&query(), max_age, t0() + TimeDelta::hours(3), &source)
            .unwrap();
        assert_eq!(entry.fetched_at, t0());
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn unavailable_without_entry_is_an_error() {
        let cache = FreshnessCache::new();
        let source = CountingSource::new(FetchOutcome::Absent(FetchDiagnostic::unavailable("down")));
        let err = cache
            .get_or_refresh(&query(), TimeDelta::hours(1), t0(), &source)
            .unwrap_err();
        assert!(matches!(err, EngineError::FetchUnavailable { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn malformed_payload_is_never_masked_by_stale_entry() {
        let cache = FreshnessCache::new();
        let source = CountingSource::new(table(1.0));
        cache.get_or_refresh(&query(), TimeDelta::hours(1), t0(), &source).unwrap();

        source.set(FetchOutcome::Absent(FetchDiagnostic::malformed("no data field")));
        let err = cache
            .get_or_refresh(&query(), TimeDelta::hours(1), t0() + TimeDelta::hours(2), &source)
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedPayload { .. }));
    }

    #[test]
    fn invalidate_forces_refetch() {
        let cache = FreshnessCache::new();
        let source = CountingSource::new(table(1.0));
        cache.get_or_refresh(&query(), TimeDelta::hours(1), t0(), &source).unwrap();
        cache.invalidate(SeriesKind::Mix, "CISO");
        cache.get_or_refresh(&query(), TimeDelta::hours(1), t0(), &source).unwrap();
        assert_eq!(source.calls(), 2);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(t0());
        clock.advance(TimeDelta::minutes(30));
        assert_eq!(clock.now(), t0() + TimeDelta::minutes(30));
        clock.set(t0());
        assert_eq!(clock.now(), t0());
    }
}
