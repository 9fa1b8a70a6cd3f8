//! Result cache policies.
//!
//! [`DurableCache`] persists results through a [`rapport_core::CacheEntryStore`]
//! with a one hour lifetime. [`MemoCache`] keeps results in process memory
//! for five minutes and sweeps stale entries as it is written to.

mod durable;
mod memo;

pub use durable::{DEFAULT_DURABLE_TTL, DurableCache};
pub use memo::{DEFAULT_MEMO_TTL, MEMO_SWEEP_INTERVAL, MemoCache};
