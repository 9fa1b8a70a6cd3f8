//! Facade crate for the rapport matching engine.
//!
//! This crate re-exports the domain types, the built-in strategies and the
//! engine, and exposes the SQLite store and test doubles behind feature
//! flags.

#![forbid(unsafe_code)]

pub use rapport_core::{
    BatchMatchRequest, BatchTarget, Breakdown, CacheEntry, CacheEntryStore, CacheError, CacheKey,
    Clock, Confidence, Factor, FactorScore, FactorWeights, MatchCache, MatchContext,
    MatchMetadata, MatchMode, MatchRequest, MatchResult, MatchStrategy, PersonaSnapshot,
    PlaceTarget, ProfileStore, StoreError, SystemClock, Target, TargetType, UnknownTargetType,
    UserProfile, UserTarget,
};
pub use rapport_engine::{
    BatchItem, BatchMatches, DurableCache, MatchError, MatchingEngine, MemoCache, OmissionReason,
    StrategyRegistry,
};
pub use rapport_scorer::{PlaceMatchStrategy, UserMatchStrategy};

#[cfg(feature = "store-sqlite")]
pub use rapport_core::store::{SqliteStore, SqliteStoreError};

#[cfg(feature = "test-support")]
pub use rapport_core::test_support;
