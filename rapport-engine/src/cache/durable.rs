//! Store-backed cache with per-entry expiry.

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use rapport_core::{CacheEntry, CacheEntryStore, CacheError, CacheKey, MatchCache, MatchResult};

/// Lifetime of a durable cache entry.
pub const DEFAULT_DURABLE_TTL: TimeDelta = TimeDelta::hours(1);

/// [`MatchCache`] that persists results through a [`CacheEntryStore`].
///
/// Each write records `expires_at = now + ttl`; reads return only entries
/// whose expiry lies strictly after the read instant.
#[derive(Debug, Clone)]
pub struct DurableCache<S> {
    store: S,
    ttl: TimeDelta,
}

impl<S: CacheEntryStore> DurableCache<S> {
    /// Wrap `store` with the default one hour lifetime.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self::with_ttl(store, DEFAULT_DURABLE_TTL)
    }

    /// Wrap `store` with a custom entry lifetime.
    #[must_use]
    pub const fn with_ttl(store: S, ttl: TimeDelta) -> Self {
        Self { store, ttl }
    }

    /// Entry lifetime applied to writes.
    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Borrow the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn expiry_for(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl<S: CacheEntryStore> MatchCache for DurableCache<S> {
    fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<MatchResult>, CacheError> {
        let entry = self.store.find_fresh_cache_entry(key, now)?;
        Ok(entry.map(CacheEntry::into_result))
    }

    fn put(
        &self,
        key: &CacheKey,
        result: &MatchResult,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry::from_result(key, result, self.expiry_for(now));
        self.store.upsert_cache_entry(&entry)?;
        debug!(
            "cached {} until {}",
            key.composite(),
            entry.expires_at.to_rfc3339()
        );
        Ok(())
    }

    fn invalidate_user(&self, user_id: &str) -> Result<usize, CacheError> {
        self.store.delete_cache_entries_for_user(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rapport_core::{
        Breakdown, Factor, FactorScore, Provenance, TargetType, test_support::MemoryStore,
    };
    use rstest::{fixture, rstest};

    #[fixture]
    fn written_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn result_at(calculated_at: DateTime<Utc>) -> MatchResult {
        MatchResult::new(
            70,
            Breakdown::from([(Factor::Budget, FactorScore::new(70.0, "Fits"))]),
            Vec::new(),
            Provenance {
                target_type: TargetType::Place,
                target_id: "p1".into(),
                calculated_at,
                mode: None,
            },
        )
    }

    #[rstest]
    fn entries_live_for_one_hour(written_at: DateTime<Utc>) {
        let cache = DurableCache::new(MemoryStore::default());
        let key = CacheKey::new("alice", TargetType::Place, "p1", None);
        cache
            .put(&key, &result_at(written_at), written_at)
            .expect("write entry");

        let just_before = written_at + TimeDelta::minutes(59);
        assert_eq!(
            cache.get(&key, just_before).expect("read entry"),
            Some(result_at(written_at))
        );
        let at_expiry = written_at + TimeDelta::hours(1);
        assert_eq!(cache.get(&key, at_expiry).expect("read entry"), None);
    }

    #[rstest]
    fn rewrites_replace_existing_entries(written_at: DateTime<Utc>) {
        let cache = DurableCache::with_ttl(MemoryStore::default(), TimeDelta::minutes(10));
        let key = CacheKey::new("alice", TargetType::Place, "p1", None);
        let later = written_at + TimeDelta::minutes(5);
        cache
            .put(&key, &result_at(written_at), written_at)
            .expect("first write");
        cache.put(&key, &result_at(later), later).expect("second write");

        assert_eq!(cache.store().cached_entries(), 1);
        let read = cache
            .get(&key, written_at + TimeDelta::minutes(12))
            .expect("read entry");
        assert_eq!(read, Some(result_at(later)));
    }

    #[rstest]
    fn invalidation_reports_removed_rows(written_at: DateTime<Utc>) {
        let cache = DurableCache::new(MemoryStore::default());
        for target in ["p1", "p2"] {
            let key = CacheKey::new("alice", TargetType::Place, target, None);
            cache
                .put(&key, &result_at(written_at), written_at)
                .expect("write entry");
        }
        assert_eq!(cache.invalidate_user("alice").expect("invalidate"), 2);
        assert_eq!(cache.invalidate_user("alice").expect("invalidate"), 0);
    }

    #[rstest]
    fn unavailable_backends_surface_errors(written_at: DateTime<Utc>) {
        let store = MemoryStore::default();
        store.set_cache_available(false);
        let cache = DurableCache::new(store);
        let key = CacheKey::new("alice", TargetType::Place, "p1", None);
        assert!(matches!(
            cache.get(&key, written_at),
            Err(CacheError::Unavailable)
        ));
    }
}
