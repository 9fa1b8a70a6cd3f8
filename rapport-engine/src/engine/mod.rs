//! The matching engine: strategy dispatch with result caching.
//!
//! A scoring call resolves the target type, consults the cache, loads the
//! persona and target on a miss, scores them and writes the result back.
//! Cache failures never fail a scoring call; they are logged and the engine
//! behaves as if the cache were empty.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rapport_core::{
    BatchMatchRequest, BatchTarget, CacheKey, Clock, MatchCache, MatchContext, MatchRequest,
    MatchResult, PersonaSnapshot, ProfileStore, SystemClock, Target, TargetType,
};
use rayon::prelude::*;

use crate::{BatchItem, BatchMatches, MatchError, OmissionReason, StrategyRegistry};

/// Scores personas against targets, caching results.
///
/// The engine is generic over its boundaries: a read-only profile store,
/// a result cache and a clock. Every timestamp it produces or compares
/// comes from the clock.
pub struct MatchingEngine<S, C, K = SystemClock>
where
    S: ProfileStore,
    C: MatchCache,
    K: Clock,
{
    store: S,
    cache: C,
    clock: K,
    strategies: StrategyRegistry,
}

impl<S, C> MatchingEngine<S, C, SystemClock>
where
    S: ProfileStore,
    C: MatchCache,
{
    /// Construct an engine reading wall-clock time.
    #[must_use]
    pub fn new(store: S, cache: C) -> Self {
        Self::with_clock(store, cache, SystemClock)
    }
}

/// Batch entry before target resolution.
enum Slot<'a> {
    Ready(BatchItem),
    Miss { entry: &'a BatchTarget, key: CacheKey },
}

impl Slot<'_> {
    const fn is_miss(&self) -> bool {
        matches!(self, Self::Miss { .. })
    }

    fn into_ready(self) -> Option<BatchItem> {
        match self {
            Self::Ready(item) => Some(item),
            Self::Miss { .. } => None,
        }
    }
}

/// Targets loaded for one type in a batch.
enum LoadedTargets {
    Found(HashMap<String, Target>),
    Unavailable,
}

impl<S, C, K> MatchingEngine<S, C, K>
where
    S: ProfileStore,
    C: MatchCache,
    K: Clock,
{
    /// Construct an engine with an explicit clock.
    #[must_use]
    pub fn with_clock(store: S, cache: C, clock: K) -> Self {
        Self {
            store,
            cache,
            clock,
            strategies: StrategyRegistry::default(),
        }
    }

    /// Replace the strategy registry while returning `self`.
    #[must_use]
    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    /// Borrow the profile store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Borrow the result cache.
    #[must_use]
    pub const fn cache(&self) -> &C {
        &self.cache
    }

    /// Borrow the strategy registry.
    #[must_use]
    pub const fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// Score one target for one subject.
    ///
    /// A fresh cached result is returned unchanged. Otherwise the result is
    /// computed, written to the cache and returned; a failing cache write is
    /// logged and does not affect the outcome.
    ///
    /// # Errors
    /// - [`MatchError::UnknownTargetType`] when no strategy handles the type.
    /// - [`MatchError::PersonaNotFound`] when the subject has no profile.
    /// - [`MatchError::TargetNotFound`] when the target id does not resolve.
    /// - [`MatchError::Store`] when loading inputs fails.
    pub fn calculate_match(&self, request: &MatchRequest) -> Result<MatchResult, MatchError> {
        let target_type = self.strategies.resolve(&request.target_type)?;
        let key = CacheKey::new(
            request.user_id.as_str(),
            target_type,
            request.target_id.as_str(),
            request.mode,
        );
        let now = self.clock.now();
        if let Some(hit) = self.cached(&key, now) {
            return Ok(hit);
        }

        let persona = self.persona(&request.user_id)?;
        let target = self
            .store
            .fetch_target(target_type, &request.target_id)?
            .ok_or_else(|| MatchError::TargetNotFound {
                target_type,
                target_id: request.target_id.clone(),
            })?;
        Ok(self.compute_and_store(&persona, &target, &key, now))
    }

    /// Score many targets for one subject.
    ///
    /// The persona is loaded at most once and targets are fetched with one
    /// store call per distinct type. Every entry yields an outcome in request
    /// order: entries with an unknown type, an unresolved id or an
    /// unavailable target type are reported as omitted rather than failing
    /// the batch.
    ///
    /// # Errors
    /// - [`MatchError::PersonaNotFound`] when any entry needs computing and
    ///   the subject has no profile.
    /// - [`MatchError::Store`] when loading the persona fails.
    pub fn calculate_batch_matches(
        &self,
        request: &BatchMatchRequest,
    ) -> Result<BatchMatches, MatchError> {
        let now = self.clock.now();
        let slots: Vec<Slot<'_>> = request
            .requests
            .iter()
            .map(|entry| self.classify(&request.user_id, entry, now))
            .collect();

        if !slots.iter().any(Slot::is_miss) {
            debug!(
                "batch for {} served entirely from cache or omitted",
                request.user_id
            );
            return Ok(BatchMatches {
                items: slots.into_iter().filter_map(Slot::into_ready).collect(),
            });
        }

        let persona = self.persona(&request.user_id)?;
        let loaded = self.load_targets(&slots);
        let items: Vec<BatchItem> = slots
            .into_par_iter()
            .map(|slot| match slot {
                Slot::Ready(item) => item,
                Slot::Miss { entry, key } => self.resolve_miss(&persona, &loaded, entry, &key, now),
            })
            .collect();
        Ok(BatchMatches { items })
    }

    /// Drop every cached result computed for `user_id`.
    ///
    /// Call this after the user's profile changes.
    ///
    /// # Errors
    /// Returns [`MatchError::CacheUnavailable`] when the cache cannot be
    /// modified.
    pub fn invalidate_user_matches(&self, user_id: &str) -> Result<usize, MatchError> {
        let removed = self.cache.invalidate_user(user_id)?;
        info!("invalidated {removed} cached matches for {user_id}");
        Ok(removed)
    }

    fn persona(&self, user_id: &str) -> Result<PersonaSnapshot, MatchError> {
        self.store
            .fetch_persona(user_id)?
            .ok_or_else(|| MatchError::PersonaNotFound {
                user_id: user_id.to_owned(),
            })
    }

    fn cached(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<MatchResult> {
        match self.cache.get(key, now) {
            Ok(Some(hit)) => {
                debug!("cache hit for {}", key.composite());
                Some(hit)
            }
            Ok(None) => {
                debug!("cache miss for {}", key.composite());
                None
            }
            Err(err) => {
                warn!(
                    "cache read failed for {}; computing instead: {err}",
                    key.composite()
                );
                None
            }
        }
    }

    fn compute_and_store(
        &self,
        persona: &PersonaSnapshot,
        target: &Target,
        key: &CacheKey,
        now: DateTime<Utc>,
    ) -> MatchResult {
        let context = MatchContext::at(now).with_mode(key.mode);
        let result = self.strategies.score(persona, target, &context);
        if let Err(err) = self.cache.put(key, &result, now) {
            warn!("failed to cache {}: {err}", key.composite());
        }
        result
    }

    fn classify<'a>(&self, user_id: &str, entry: &'a BatchTarget, now: DateTime<Utc>) -> Slot<'a> {
        let target_type = match self.strategies.resolve(&entry.target_type) {
            Ok(target_type) => target_type,
            Err(err) => {
                debug!("omitting batch entry {}: {err}", entry.target_id);
                return Slot::Ready(BatchItem::omitted(
                    entry,
                    OmissionReason::UnknownTargetType,
                ));
            }
        };
        let key = CacheKey::new(user_id, target_type, entry.target_id.as_str(), entry.mode);
        self.cached(&key, now).map_or_else(
            || Slot::Miss { entry, key },
            |hit| Slot::Ready(BatchItem::Matched(hit)),
        )
    }

    fn load_targets(&self, slots: &[Slot<'_>]) -> HashMap<TargetType, LoadedTargets> {
        let mut wanted: BTreeMap<TargetType, Vec<String>> = BTreeMap::new();
        for slot in slots {
            if let Slot::Miss { key, .. } = slot {
                wanted
                    .entry(key.target_type)
                    .or_default()
                    .push(key.target_id.clone());
            }
        }

        wanted
            .into_iter()
            .map(|(target_type, mut ids)| {
                ids.sort_unstable();
                ids.dedup();
                let loaded = match self.store.fetch_targets(target_type, &ids) {
                    Ok(targets) => LoadedTargets::Found(
                        targets
                            .into_iter()
                            .map(|target| (target.id().to_owned(), target))
                            .collect(),
                    ),
                    Err(err) => {
                        warn!(
                            "failed to load {} {target_type} targets; omitting them: {err}",
                            ids.len()
                        );
                        LoadedTargets::Unavailable
                    }
                };
                (target_type, loaded)
            })
            .collect()
    }

    fn resolve_miss(
        &self,
        persona: &PersonaSnapshot,
        loaded: &HashMap<TargetType, LoadedTargets>,
        entry: &BatchTarget,
        key: &CacheKey,
        now: DateTime<Utc>,
    ) -> BatchItem {
        let Some(LoadedTargets::Found(targets)) = loaded.get(&key.target_type) else {
            return BatchItem::omitted(entry, OmissionReason::StoreUnavailable);
        };
        targets.get(&key.target_id).map_or_else(
            || {
                debug!("omitting unknown {} target {}", key.target_type, key.target_id);
                BatchItem::omitted(entry, OmissionReason::TargetNotFound)
            },
            |target| BatchItem::Matched(self.compute_and_store(persona, target, key, now)),
        )
    }
}

#[cfg(test)]
mod tests;
