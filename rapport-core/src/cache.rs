//! Result cache contract shared by the durable and process-local policies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MatchMode, MatchResult, TargetType};

/// Composite identity of a cached result.
///
/// The mode participates in the key so a `travel` score never answers a
/// `current` request for the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    /// Subject the result was computed for.
    pub user_id: String,
    /// Type of the scored target.
    pub target_type: TargetType,
    /// Identifier of the scored target.
    pub target_id: String,
    /// Matching mode, if any.
    #[serde(default)]
    pub mode: Option<MatchMode>,
}

impl CacheKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        target_type: TargetType,
        target_id: impl Into<String>,
        mode: Option<MatchMode>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            target_type,
            target_id: target_id.into(),
            mode,
        }
    }

    /// Stored representation of the mode; the empty string means "none".
    #[must_use]
    pub const fn mode_label(&self) -> &'static str {
        match self.mode {
            Some(mode) => mode.as_str(),
            None => "",
        }
    }

    /// Flat `user:type:id:mode` label for log and error messages.
    ///
    /// Distinct keys can share a label, so it never identifies an entry.
    ///
    /// # Examples
    /// ```
    /// use rapport_core::{CacheKey, MatchMode, TargetType};
    ///
    /// let key = CacheKey::new("u1", TargetType::User, "u2", Some(MatchMode::Travel));
    /// assert_eq!(key.composite(), "u1:user:u2:travel");
    /// ```
    #[must_use]
    pub fn composite(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.user_id,
            self.target_type,
            self.target_id,
            self.mode_label()
        )
    }
}

/// Errors raised by cache backends.
///
/// The engine never surfaces these from scoring calls; a failing cache is
/// logged and treated as a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store rejected an operation.
    #[error("cache backend failed to {operation}: {source}")]
    Backend {
        /// Operation being attempted.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A stored entry could not be decoded.
    #[error("failed to decode cached {field} for {key}: {source}")]
    Decode {
        /// Composite key of the entry.
        key: String,
        /// Column or field that failed to decode.
        field: &'static str,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A cached value could not be encoded for storage.
    #[error("failed to encode {field} for caching: {source}")]
    Encode {
        /// Field that failed to encode.
        field: &'static str,
        /// JSON encoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A lock guarding cache state was poisoned by a panicking writer.
    #[error("cache lock was poisoned")]
    Poisoned,
    /// The cache was deliberately made unavailable.
    #[error("cache is unavailable")]
    Unavailable,
}

impl CacheError {
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

/// A policy that stores computed match results for later reuse.
///
/// Implementations decide freshness relative to the `now` they are given;
/// an absent or stale entry must be indistinguishable from one that was
/// never written.
pub trait MatchCache: Send + Sync {
    /// Return the fresh result stored under `key`, if any.
    fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<MatchResult>, CacheError>;

    /// Store `result` under `key`, replacing any existing entry.
    fn put(&self, key: &CacheKey, result: &MatchResult, now: DateTime<Utc>)
    -> Result<(), CacheError>;

    /// Remove every entry computed for `user_id`, returning how many went.
    fn invalidate_user(&self, user_id: &str) -> Result<usize, CacheError>;
}

impl<C: MatchCache + ?Sized> MatchCache for std::sync::Arc<C> {
    fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<MatchResult>, CacheError> {
        (**self).get(key, now)
    }

    fn put(
        &self,
        key: &CacheKey,
        result: &MatchResult,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        (**self).put(key, result, now)
    }

    fn invalidate_user(&self, user_id: &str) -> Result<usize, CacheError> {
        (**self).invalidate_user(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "alice:place:p1:")]
    #[case(Some(MatchMode::Current), "alice:place:p1:current")]
    fn composite_key_includes_mode(#[case] mode: Option<MatchMode>, #[case] expected: &str) {
        let key = CacheKey::new("alice", TargetType::Place, "p1", mode);
        assert_eq!(key.composite(), expected);
    }
}
