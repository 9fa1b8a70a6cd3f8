//! Errors surfaced by the matching engine.

use rapport_core::{CacheError, StoreError, TargetType, UnknownTargetType};
use thiserror::Error;

/// Why a scoring or invalidation call failed.
///
/// Cache failures during scoring are never returned; they are logged and the
/// engine computes without persisting. [`MatchError::CacheUnavailable`] is
/// only produced by explicit cache mutations such as invalidation.
#[derive(Debug, Error)]
pub enum MatchError {
    /// No strategy handles the requested target type.
    #[error(transparent)]
    UnknownTargetType(#[from] UnknownTargetType),
    /// The subject has no usable profile.
    #[error("user '{user_id}' has no usable persona")]
    PersonaNotFound {
        /// Subject that was looked up.
        user_id: String,
    },
    /// The target id did not resolve for its type.
    #[error("{target_type} target '{target_id}' was not found")]
    TargetNotFound {
        /// Requested target type.
        target_type: TargetType,
        /// Requested target id.
        target_id: String,
    },
    /// Reading personas or targets failed.
    #[error("failed to load scoring inputs")]
    Store(#[from] StoreError),
    /// The result cache could not be modified.
    #[error("match cache is unavailable")]
    CacheUnavailable(#[from] CacheError),
}
