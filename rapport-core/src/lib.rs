//! Core domain types for the rapport matching engine.
//!
//! The crate holds everything a match strategy consumes or produces:
//! normalised personas, typed targets, factor scores and results. It also
//! defines the seams the engine is assembled from: [`MatchStrategy`],
//! [`ProfileStore`], [`CacheEntryStore`], [`MatchCache`] and [`Clock`].
//!
//! A SQLite implementation of both store contracts is available behind the
//! `store-sqlite` feature (enabled by default).

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod cache;
mod clock;
mod factor;
mod persona;
mod profile;
mod request;
mod result;
pub mod store;
mod strategy;
mod target;

pub use cache::{CacheError, CacheKey, MatchCache};
pub use clock::{Clock, SystemClock};
pub use factor::{Factor, FactorScore, FactorWeights, MAX_SCORE, NEUTRAL_SCORE, clamp_score};
pub use persona::{AgeRange, Budget, PersonaSnapshot, SafetyPreference, normalise_tag, normalise_tags};
pub use profile::{PERSONA_BAG_VERSION, PersonaBag, RawAgeRange, StyleField, UserProfile};
pub use request::{BatchMatchRequest, BatchTarget, MatchMode, MatchRequest, UnknownMatchMode};
pub use result::{Breakdown, Confidence, MatchMetadata, MatchResult, Provenance};
pub use store::{CacheEntry, CacheEntryStore, ProfileStore, StoreError};
pub use strategy::{MatchContext, MatchStrategy};
pub use target::{
    Country, CurrentCity, PlaceTarget, Target, TargetType, UnknownTargetType, UserTarget,
    VibeScores,
};

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;
