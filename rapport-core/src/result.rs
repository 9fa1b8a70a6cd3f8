//! Aggregated match output.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Factor, FactorScore, MatchMode, TargetType};

/// Coarse bucket derived from the final score.
///
/// # Examples
/// ```
/// use rapport_core::Confidence;
///
/// assert_eq!(Confidence::from_score(80), Confidence::High);
/// assert_eq!(Confidence::from_score(60), Confidence::Medium);
/// assert_eq!(Confidence::from_score(59), Confidence::Low);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Score below 60.
    Low,
    /// Score from 60 to 79.
    Medium,
    /// Score of 80 or more.
    High,
}

impl Confidence {
    /// Classify a final score.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= 80 {
            Self::High
        } else if score >= 60 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Per-factor sub-scores keyed by factor.
pub type Breakdown = BTreeMap<Factor, FactorScore>;

/// Explainable compatibility score for one subject/target pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Weighted score in `0..=100`.
    pub score: u8,
    /// Bucket derived from `score`.
    pub confidence: Confidence,
    /// Sub-score for every factor the strategy defines.
    pub breakdown: Breakdown,
    /// Short notes on notably strong or weak factors.
    pub reasoning: Vec<String>,
    /// Provenance of the result.
    pub metadata: MatchMetadata,
}

/// Provenance attached to every [`MatchResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    /// Type of the scored target.
    pub target_type: TargetType,
    /// Identifier of the scored target.
    pub target_id: String,
    /// Factors present in the breakdown, in breakdown order.
    pub factors_used: Vec<Factor>,
    /// Moment the score was computed.
    pub calculated_at: DateTime<Utc>,
    /// Matching mode the score was computed under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<MatchMode>,
}

impl MatchResult {
    /// Assemble a result, deriving confidence and `factors_used`.
    #[must_use]
    pub fn new(
        score: u8,
        breakdown: Breakdown,
        reasoning: Vec<String>,
        provenance: Provenance,
    ) -> Self {
        let capped = score.min(100);
        let factors_used = breakdown.keys().copied().collect();
        Self {
            score: capped,
            confidence: Confidence::from_score(capped),
            breakdown,
            reasoning,
            metadata: MatchMetadata {
                target_type: provenance.target_type,
                target_id: provenance.target_id,
                factors_used,
                calculated_at: provenance.calculated_at,
                mode: provenance.mode,
            },
        }
    }
}

/// Inputs for [`MatchMetadata`] that do not depend on the breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Type of the scored target.
    pub target_type: TargetType,
    /// Identifier of the scored target.
    pub target_id: String,
    /// Moment the score was computed.
    pub calculated_at: DateTime<Utc>,
    /// Matching mode, if any.
    pub mode: Option<MatchMode>,
}
