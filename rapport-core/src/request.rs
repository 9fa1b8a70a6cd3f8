//! Caller-facing scoring requests.
//!
//! Target types travel as raw tags so that an unsupported tag surfaces as
//! [`UnknownTargetType`](crate::UnknownTargetType) at strategy resolution
//! rather than as a decoding failure of the whole request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether a user-to-user match considers where the target is now or where
/// they are travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Match against the target's current situation.
    Current,
    /// Match for an upcoming trip.
    Travel,
}

impl MatchMode {
    /// Return the mode's wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Travel => "travel",
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MatchMode {
    type Err = UnknownMatchMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "travel" => Ok(Self::Travel),
            _ => Err(UnknownMatchMode {
                value: s.to_owned(),
            }),
        }
    }
}

/// A match mode label was not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown match mode '{value}' (expected 'current' or 'travel')")]
pub struct UnknownMatchMode {
    /// The unrecognised label.
    pub value: String,
}

/// Request to score one target for one subject.
///
/// # Examples
/// ```
/// use rapport_core::{MatchMode, MatchRequest};
///
/// let request = MatchRequest::new("alice", "user", "bob").with_mode(MatchMode::Travel);
/// assert_eq!(request.target_type, "user");
/// assert_eq!(request.mode, Some(MatchMode::Travel));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    /// Subject being matched.
    pub user_id: String,
    /// Raw target type tag, e.g. `"place"`.
    pub target_type: String,
    /// Target identifier.
    pub target_id: String,
    /// Matching mode; only meaningful for user targets.
    #[serde(default)]
    pub mode: Option<MatchMode>,
}

impl MatchRequest {
    /// Build a request without a mode.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        target_type: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            target_type: target_type.into(),
            target_id: target_id.into(),
            mode: None,
        }
    }

    /// Set the mode while returning `self`.
    #[must_use]
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Request to score many targets for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMatchRequest {
    /// Subject being matched.
    pub user_id: String,
    /// Targets to score.
    #[serde(default)]
    pub requests: Vec<BatchTarget>,
}

impl BatchMatchRequest {
    /// Start an empty batch for `user_id`.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            requests: Vec::new(),
        }
    }

    /// Append a target while returning `self`.
    #[must_use]
    pub fn with_target(mut self, target: BatchTarget) -> Self {
        self.requests.push(target);
        self
    }
}

/// One entry of a [`BatchMatchRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTarget {
    /// Raw target type tag.
    pub target_type: String,
    /// Target identifier.
    pub target_id: String,
    /// Matching mode; only meaningful for user targets.
    #[serde(default)]
    pub mode: Option<MatchMode>,
}

impl BatchTarget {
    /// Build an entry without a mode.
    #[must_use]
    pub fn new(target_type: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            target_id: target_id.into(),
            mode: None,
        }
    }

    /// Set the mode while returning `self`.
    #[must_use]
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn batch_requests_decode_from_camel_case() {
        let batch: BatchMatchRequest = serde_json::from_str(
            r#"{"userId":"u1","requests":[{"targetType":"place","targetId":"p1"},{"targetType":"user","targetId":"u2","mode":"travel"}]}"#,
        )
        .expect("decode batch");
        assert_eq!(batch.requests.len(), 2);
        assert_eq!(
            batch.requests.get(1).and_then(|entry| entry.mode),
            Some(MatchMode::Travel)
        );
    }

    #[rstest]
    fn unknown_target_types_still_decode() {
        let request: MatchRequest = serde_json::from_str(
            r#"{"userId":"u1","targetType":"country","targetId":"c1"}"#,
        )
        .expect("decode request");
        assert_eq!(request.target_type, "country");
    }

    #[rstest]
    #[case("travel", Ok(MatchMode::Travel))]
    #[case("Current", Ok(MatchMode::Current))]
    #[case("later", Err(UnknownMatchMode { value: "later".into() }))]
    fn parses_modes(#[case] raw: &str, #[case] expected: Result<MatchMode, UnknownMatchMode>) {
        assert_eq!(raw.parse::<MatchMode>(), expected);
    }
}
