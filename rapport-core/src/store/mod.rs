//! Data access traits for personas, targets and cached results.
//!
//! [`ProfileStore`] is the read side the engine fetches scoring inputs from.
//! [`CacheEntryStore`] is the narrow write side a durable result cache is
//! built on. Both are object-safe and `Send + Sync` so a single backend can
//! serve the engine and its cache concurrently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    Breakdown, CacheError, CacheKey, MatchMode, MatchResult, PersonaSnapshot, Provenance, Target,
    TargetType,
};

#[cfg(feature = "store-sqlite")]
mod schema;
#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use schema::{SCHEMA_VERSION, SchemaError, initialise_schema};
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteStore, SqliteStoreError};

/// Errors raised while reading personas or targets.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected a query.
    #[error("store failed to {operation}: {source}")]
    Backend {
        /// Operation being attempted.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A stored JSON document could not be decoded.
    #[error("failed to decode {field} for record {id}: {source}")]
    Decode {
        /// Identifier of the offending record.
        id: String,
        /// Column holding the document.
        field: &'static str,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A stored value could not be encoded.
    #[error("failed to encode {field} for record {id}: {source}")]
    Encode {
        /// Identifier of the offending record.
        id: String,
        /// Column the value was destined for.
        field: &'static str,
        /// JSON encoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock was poisoned")]
    Poisoned,
    /// The store was deliberately made unavailable.
    #[error("store is unavailable")]
    Unavailable,
}

impl StoreError {
    /// Wrap a backend failure with the operation that triggered it.
    pub fn backend<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            operation,
            source: Box::new(source),
        }
    }
}

/// Read access to scoring inputs.
///
/// # Examples
///
/// ```rust
/// use rapport_core::{PersonaSnapshot, ProfileStore, StoreError, Target, TargetType};
///
/// struct EmptyStore;
///
/// impl ProfileStore for EmptyStore {
///     fn fetch_persona(&self, _user_id: &str) -> Result<Option<PersonaSnapshot>, StoreError> {
///         Ok(None)
///     }
///
///     fn fetch_targets(
///         &self,
///         _target_type: TargetType,
///         _target_ids: &[String],
///     ) -> Result<Vec<Target>, StoreError> {
///         Ok(Vec::new())
///     }
/// }
///
/// let store = EmptyStore;
/// assert!(store.fetch_target(TargetType::Place, "p1")?.is_none());
/// # Ok::<(), StoreError>(())
/// ```
pub trait ProfileStore: Send + Sync {
    /// Load and normalise the persona of `user_id`.
    ///
    /// Returns `Ok(None)` when the user is unknown or has no profile.
    fn fetch_persona(&self, user_id: &str) -> Result<Option<PersonaSnapshot>, StoreError>;

    /// Load every target of `target_type` whose id is listed.
    ///
    /// Unknown ids are omitted rather than reported. The returned order is
    /// unspecified.
    fn fetch_targets(
        &self,
        target_type: TargetType,
        target_ids: &[String],
    ) -> Result<Vec<Target>, StoreError>;

    /// Load a single target, returning `Ok(None)` when the id is unknown.
    fn fetch_target(
        &self,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Option<Target>, StoreError> {
        let mut found = self.fetch_targets(target_type, &[target_id.to_owned()])?;
        Ok(found.pop())
    }
}

impl<S: ProfileStore + ?Sized> ProfileStore for Arc<S> {
    fn fetch_persona(&self, user_id: &str) -> Result<Option<PersonaSnapshot>, StoreError> {
        (**self).fetch_persona(user_id)
    }

    fn fetch_targets(
        &self,
        target_type: TargetType,
        target_ids: &[String],
    ) -> Result<Vec<Target>, StoreError> {
        (**self).fetch_targets(target_type, target_ids)
    }

    fn fetch_target(
        &self,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Option<Target>, StoreError> {
        (**self).fetch_target(target_type, target_id)
    }
}

/// A persisted match result with its expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Subject the result was computed for.
    pub user_id: String,
    /// Type of the scored target.
    pub target_type: TargetType,
    /// Identifier of the scored target.
    pub target_id: String,
    /// Matching mode, if any.
    #[serde(default)]
    pub mode: Option<MatchMode>,
    /// Final score.
    pub score: u8,
    /// Per-factor sub-scores.
    pub breakdown: Breakdown,
    /// Reasoning notes.
    pub reasoning: Vec<String>,
    /// Moment the result was computed.
    pub calculated_at: DateTime<Utc>,
    /// Moment after which the entry is stale.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Capture `result` under `key`, expiring at `expires_at`.
    #[must_use]
    pub fn from_result(key: &CacheKey, result: &MatchResult, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id: key.user_id.clone(),
            target_type: key.target_type,
            target_id: key.target_id.clone(),
            mode: key.mode,
            score: result.score,
            breakdown: result.breakdown.clone(),
            reasoning: result.reasoning.clone(),
            calculated_at: result.metadata.calculated_at,
            expires_at,
        }
    }

    /// Composite key the entry is stored under.
    #[must_use]
    pub fn key(&self) -> CacheKey {
        CacheKey::new(
            self.user_id.clone(),
            self.target_type,
            self.target_id.clone(),
            self.mode,
        )
    }

    /// Whether the entry may still be served at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Rebuild the result, re-deriving confidence and `factors_used`.
    #[must_use]
    pub fn into_result(self) -> MatchResult {
        MatchResult::new(
            self.score,
            self.breakdown,
            self.reasoning,
            Provenance {
                target_type: self.target_type,
                target_id: self.target_id,
                calculated_at: self.calculated_at,
                mode: self.mode,
            },
        )
    }
}

/// Persistence for durable cache entries.
///
/// Writes are upserts on the composite key so at most one entry exists per
/// key; the backend must make each upsert atomic.
pub trait CacheEntryStore: Send + Sync {
    /// Insert or replace the entry for `entry.key()`.
    fn upsert_cache_entry(&self, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Return the entry for `key` if it has not expired at `now`.
    fn find_fresh_cache_entry(
        &self,
        key: &CacheKey,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, CacheError>;

    /// Delete every entry for `user_id`, returning how many were removed.
    fn delete_cache_entries_for_user(&self, user_id: &str) -> Result<usize, CacheError>;
}

impl<S: CacheEntryStore + ?Sized> CacheEntryStore for Arc<S> {
    fn upsert_cache_entry(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        (**self).upsert_cache_entry(entry)
    }

    fn find_fresh_cache_entry(
        &self,
        key: &CacheKey,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, CacheError> {
        (**self).find_fresh_cache_entry(key, now)
    }

    fn delete_cache_entries_for_user(&self, user_id: &str) -> Result<usize, CacheError> {
        (**self).delete_cache_entries_for_user(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Factor, FactorScore, test_support::MemoryStore};
    use chrono::{TimeDelta, TimeZone};
    use rstest::{fixture, rstest};

    #[fixture]
    fn computed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn sample_result(calculated_at: DateTime<Utc>) -> MatchResult {
        MatchResult::new(
            67,
            Breakdown::from([(Factor::Budget, FactorScore::new(100.0, "Fits budget"))]),
            vec!["Fits budget".into()],
            Provenance {
                target_type: TargetType::Place,
                target_id: "p1".into(),
                calculated_at,
                mode: None,
            },
        )
    }

    #[rstest]
    fn entries_rebuild_the_original_result(computed_at: DateTime<Utc>) {
        let key = CacheKey::new("u1", TargetType::Place, "p1", None);
        let result = sample_result(computed_at);
        let entry = CacheEntry::from_result(&key, &result, computed_at + TimeDelta::hours(1));

        assert_eq!(entry.key(), key);
        assert_eq!(entry.into_result(), result);
    }

    #[rstest]
    fn entries_expire_at_the_boundary(computed_at: DateTime<Utc>) {
        let key = CacheKey::new("u1", TargetType::Place, "p1", None);
        let expires_at = computed_at + TimeDelta::hours(1);
        let entry = CacheEntry::from_result(&key, &sample_result(computed_at), expires_at);

        assert!(entry.is_fresh(expires_at - TimeDelta::seconds(1)));
        assert!(!entry.is_fresh(expires_at));
    }

    #[rstest]
    fn single_fetch_defers_to_batch_lookup() {
        let store = MemoryStore::default();
        store.insert_place(crate::PlaceTarget::new("p1", ["art"]));

        let found = store
            .fetch_target(TargetType::Place, "p1")
            .expect("fetch place");
        assert!(matches!(found, Some(Target::Place(place)) if place.id == "p1"));
        assert!(
            store
                .fetch_target(TargetType::User, "p1")
                .expect("fetch user")
                .is_none()
        );
    }
}
