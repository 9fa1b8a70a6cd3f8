//! Matching engine for rapport.
//!
//! [`MatchingEngine`] dispatches scoring requests to the strategy registered
//! for each target type, caches results through a [`rapport_core::MatchCache`]
//! and scores batches with one persona load and one target fetch per type.
//! Two cache policies ship with the crate: [`DurableCache`] persists results
//! through a [`rapport_core::CacheEntryStore`] for an hour, and [`MemoCache`]
//! keeps them in process memory for five minutes.

#![forbid(unsafe_code)]

mod batch;
mod cache;
mod engine;
mod error;
mod registry;

pub use batch::{BatchItem, BatchMatches, OmissionReason};
pub use cache::{DEFAULT_DURABLE_TTL, DEFAULT_MEMO_TTL, DurableCache, MEMO_SWEEP_INTERVAL, MemoCache};
pub use engine::MatchingEngine;
pub use error::MatchError;
pub use registry::StrategyRegistry;
