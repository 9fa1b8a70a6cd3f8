//! In-memory store and clock used by unit and behaviour tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    CacheEntry, CacheEntryStore, CacheError, CacheKey, Clock, CurrentCity, PersonaSnapshot,
    PlaceTarget, ProfileStore, StoreError, Target, TargetType, UserProfile, UserTarget,
};

/// In-memory [`ProfileStore`] and [`CacheEntryStore`].
///
/// Either side can be switched off to simulate an outage, and the store
/// counts target fetches so tests can assert on round-trips.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, UserTarget>>,
    places: Mutex<HashMap<String, PlaceTarget>>,
    cache: Mutex<HashMap<CacheKey, CacheEntry>>,
    cache_down: AtomicBool,
    targets_down: AtomicBool,
    target_fetches: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// Store a user with an optional profile and city.
    pub fn insert_user(
        &self,
        id: impl Into<String>,
        profile: Option<UserProfile>,
        current_city: Option<CurrentCity>,
    ) {
        let user = UserTarget {
            id: id.into(),
            profile,
            current_city,
        };
        lock(&self.users).insert(user.id.clone(), user);
    }

    /// Store a place.
    pub fn insert_place(&self, place: PlaceTarget) {
        lock(&self.places).insert(place.id.clone(), place);
    }

    /// Make every cache operation fail with [`CacheError::Unavailable`].
    pub fn set_cache_available(&self, available: bool) {
        self.cache_down.store(!available, Ordering::SeqCst);
    }

    /// Make target fetches fail with [`StoreError::Unavailable`].
    pub fn set_targets_available(&self, available: bool) {
        self.targets_down.store(!available, Ordering::SeqCst);
    }

    /// Number of `fetch_targets` calls served so far.
    #[must_use]
    pub fn target_fetches(&self) -> usize {
        self.target_fetches.load(Ordering::SeqCst)
    }

    /// Number of cache rows currently held, fresh or not.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        lock(&self.cache).len()
    }

    fn check_cache(&self) -> Result<(), CacheError> {
        if self.cache_down.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl ProfileStore for MemoryStore {
    fn fetch_persona(&self, user_id: &str) -> Result<Option<PersonaSnapshot>, StoreError> {
        Ok(lock(&self.users)
            .get(user_id)
            .and_then(|user| user.profile.as_ref())
            .map(PersonaSnapshot::from_profile))
    }

    fn fetch_targets(
        &self,
        target_type: TargetType,
        target_ids: &[String],
    ) -> Result<Vec<Target>, StoreError> {
        self.target_fetches.fetch_add(1, Ordering::SeqCst);
        if self.targets_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        let mut ids: Vec<&String> = target_ids.iter().collect();
        ids.sort_unstable();
        ids.dedup();
        let found = match target_type {
            TargetType::User => {
                let users = lock(&self.users);
                ids.into_iter()
                    .filter_map(|id| users.get(id).cloned().map(Target::User))
                    .collect()
            }
            TargetType::Place => {
                let places = lock(&self.places);
                ids.into_iter()
                    .filter_map(|id| places.get(id).cloned().map(Target::Place))
                    .collect()
            }
        };
        Ok(found)
    }
}

impl CacheEntryStore for MemoryStore {
    fn upsert_cache_entry(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        self.check_cache()?;
        lock(&self.cache).insert(entry.key(), entry.clone());
        Ok(())
    }

    fn find_fresh_cache_entry(
        &self,
        key: &CacheKey,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, CacheError> {
        self.check_cache()?;
        Ok(lock(&self.cache)
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .cloned())
    }

    fn delete_cache_entries_for_user(&self, user_id: &str) -> Result<usize, CacheError> {
        self.check_cache()?;
        let mut cache = lock(&self.cache);
        let before = cache.len();
        cache.retain(|key, _| key.user_id != user_id);
        Ok(before.saturating_sub(cache.len()))
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start the clock at `start`.
    #[must_use]
    pub const fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = lock(&self.now);
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}
