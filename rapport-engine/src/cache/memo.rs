//! Process-local result cache.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use rapport_core::{CacheError, CacheKey, MatchCache, MatchResult};

/// Lifetime of an in-memory entry.
pub const DEFAULT_MEMO_TTL: TimeDelta = TimeDelta::minutes(5);

/// Minimum spacing between sweeps of stale entries.
pub const MEMO_SWEEP_INTERVAL: TimeDelta = TimeDelta::minutes(5);

#[derive(Debug, Clone)]
struct MemoEntry {
    result: MatchResult,
    written_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoState {
    entries: HashMap<CacheKey, MemoEntry>,
    last_sweep: Option<DateTime<Utc>>,
}

/// [`MatchCache`] held in process memory.
///
/// Entries are keyed by the full [`CacheKey`] and served while younger
/// than the configured lifetime. Writes sweep stale entries at most once per
/// [`MEMO_SWEEP_INTERVAL`], so memory stays bounded by the write rate rather
/// than by the number of distinct keys ever seen.
#[derive(Debug)]
pub struct MemoCache {
    state: Mutex<MemoState>,
    ttl: TimeDelta,
    sweep_interval: TimeDelta,
}

impl Default for MemoCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_MEMO_TTL)
    }
}

impl MemoCache {
    /// Create an empty cache with the default five minute lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache with a custom lifetime.
    #[must_use]
    pub fn with_ttl(ttl: TimeDelta) -> Self {
        Self {
            state: Mutex::new(MemoState::default()),
            ttl,
            sweep_interval: MEMO_SWEEP_INTERVAL,
        }
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Number of entries held, fresh or stale.
    ///
    /// # Errors
    /// Returns [`CacheError::Poisoned`] if a writer panicked.
    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.lock()?.entries.len())
    }

    /// Whether the cache holds no entries.
    ///
    /// # Errors
    /// Returns [`CacheError::Poisoned`] if a writer panicked.
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.lock()?.entries.is_empty())
    }

    /// Drop every entry that is stale at `now`, returning how many went.
    ///
    /// # Errors
    /// Returns [`CacheError::Poisoned`] if a writer panicked.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        let mut state = self.lock()?;
        Ok(self.sweep(&mut state, now))
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoState>, CacheError> {
        self.state.lock().map_err(|_| CacheError::Poisoned)
    }

    fn is_fresh(&self, entry: &MemoEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.written_at) < self.ttl
    }

    fn sweep(&self, state: &mut MemoState, now: DateTime<Utc>) -> usize {
        let before = state.entries.len();
        state.entries.retain(|_, entry| self.is_fresh(entry, now));
        state.last_sweep = Some(now);
        let removed = before.saturating_sub(state.entries.len());
        if removed > 0 {
            debug!("swept {removed} stale memo entries");
        }
        removed
    }

    fn sweep_due(&self, state: &MemoState, now: DateTime<Utc>) -> bool {
        state
            .last_sweep
            .is_none_or(|last| now.signed_duration_since(last) >= self.sweep_interval)
    }
}

impl MatchCache for MemoCache {
    fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<MatchResult>, CacheError> {
        let state = self.lock()?;
        Ok(state
            .entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.result.clone()))
    }

    fn put(
        &self,
        key: &CacheKey,
        result: &MatchResult,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let mut state = self.lock()?;
        if self.sweep_due(&state, now) {
            self.sweep(&mut state, now);
        }
        state.entries.insert(
            key.clone(),
            MemoEntry {
                result: result.clone(),
                written_at: now,
            },
        );
        Ok(())
    }

    fn invalidate_user(&self, user_id: &str) -> Result<usize, CacheError> {
        let mut state = self.lock()?;
        let before = state.entries.len();
        state.entries.retain(|key, _| key.user_id != user_id);
        Ok(before.saturating_sub(state.entries.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rapport_core::{Breakdown, Factor, FactorScore, MatchMode, Provenance, TargetType};
    use rstest::{fixture, rstest};

    #[fixture]
    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn result_for(target_id: &str, calculated_at: DateTime<Utc>) -> MatchResult {
        MatchResult::new(
            55,
            Breakdown::from([(Factor::Interests, FactorScore::new(55.0, "Some"))]),
            Vec::new(),
            Provenance {
                target_type: TargetType::User,
                target_id: target_id.into(),
                calculated_at,
                mode: None,
            },
        )
    }

    #[rstest]
    fn entries_expire_after_five_minutes(start: DateTime<Utc>) {
        let cache = MemoCache::new();
        let key = CacheKey::new("alice", TargetType::User, "bob", None);
        cache
            .put(&key, &result_for("bob", start), start)
            .expect("write entry");

        let fresh = cache
            .get(&key, start + TimeDelta::seconds(299))
            .expect("read entry");
        assert!(fresh.is_some());
        let stale = cache
            .get(&key, start + TimeDelta::minutes(5))
            .expect("read entry");
        assert!(stale.is_none());
    }

    #[rstest]
    fn modes_are_cached_separately(start: DateTime<Utc>) {
        let cache = MemoCache::new();
        let travel = CacheKey::new("alice", TargetType::User, "bob", Some(MatchMode::Travel));
        let current = CacheKey::new("alice", TargetType::User, "bob", Some(MatchMode::Current));
        cache
            .put(&travel, &result_for("bob", start), start)
            .expect("write entry");
        assert!(cache.get(&current, start).expect("read entry").is_none());
    }

    #[rstest]
    fn writes_sweep_stale_entries_once_per_interval(start: DateTime<Utc>) {
        let cache = MemoCache::new();
        for target in ["bob", "carol"] {
            let key = CacheKey::new("alice", TargetType::User, target, None);
            cache
                .put(&key, &result_for(target, start), start)
                .expect("write entry");
        }
        assert_eq!(cache.len().expect("count entries"), 2);

        let later = start + TimeDelta::minutes(6);
        let key = CacheKey::new("alice", TargetType::User, "dave", None);
        cache
            .put(&key, &result_for("dave", later), later)
            .expect("write entry");
        assert_eq!(cache.len().expect("count entries"), 1);
    }

    #[rstest]
    fn purge_reports_removed_entries(start: DateTime<Utc>) {
        let cache = MemoCache::new();
        let key = CacheKey::new("alice", TargetType::User, "bob", None);
        cache
            .put(&key, &result_for("bob", start), start)
            .expect("write entry");
        assert_eq!(cache.purge_expired(start).expect("purge"), 0);
        assert_eq!(
            cache
                .purge_expired(start + TimeDelta::hours(1))
                .expect("purge"),
            1
        );
        assert!(cache.is_empty().expect("check emptiness"));
    }

    #[rstest]
    fn keys_with_the_same_flat_form_stay_distinct(start: DateTime<Utc>) {
        let cache = MemoCache::new();
        let user_target = CacheKey::new("a:place:x", TargetType::User, "y", None);
        let place_target = CacheKey::new("a", TargetType::Place, "x:user:y", None);
        assert_eq!(user_target.composite(), place_target.composite());

        cache
            .put(&user_target, &result_for("y", start), start)
            .expect("write entry");
        assert!(cache.get(&place_target, start).expect("read entry").is_none());
        assert_eq!(cache.invalidate_user("a").expect("invalidate"), 0);
        assert!(cache.get(&user_target, start).expect("read entry").is_some());
    }

    #[rstest]
    fn invalidation_only_touches_the_named_user(start: DateTime<Utc>) {
        let cache = MemoCache::new();
        for user in ["alice", "bob"] {
            let key = CacheKey::new(user, TargetType::User, "carol", None);
            cache
                .put(&key, &result_for("carol", start), start)
                .expect("write entry");
        }
        assert_eq!(cache.invalidate_user("alice").expect("invalidate"), 1);
        let survivor = CacheKey::new("bob", TargetType::User, "carol", None);
        assert!(cache.get(&survivor, start).expect("read entry").is_some());
    }
}
