//! Weighted aggregation of factor scores into a final match result.

use log::debug;
use rapport_core::{
    Breakdown, Factor, FactorScore, FactorWeights, MatchResult, Provenance, clamp_score,
};

/// Weighted mean of the breakdown, rounded to an integer score.
///
/// Only factors that appear in both the breakdown and the weight table
/// contribute. When their weights sum to zero the score is zero.
///
/// # Examples
/// ```
/// use rapport_core::{Breakdown, Factor, FactorScore, FactorWeights};
/// use rapport_scorer::weighted_score;
///
/// let weights = FactorWeights::from_entries(&[(Factor::Interests, 0.5), (Factor::Budget, 0.3)]);
/// let breakdown = Breakdown::from([
///     (Factor::Interests, FactorScore::new(50.0, "one shared tag")),
///     (Factor::Budget, FactorScore::new(100.0, "exact fit")),
/// ]);
/// assert_eq!(weighted_score(&breakdown, &weights), 69);
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "aggregation is a weighted arithmetic mean"
)]
pub fn weighted_score(breakdown: &Breakdown, weights: &FactorWeights) -> u8 {
    let (weighted, total) = breakdown
        .iter()
        .filter_map(|(factor, entry)| weights.get(*factor).map(|weight| (entry.score, weight)))
        .fold((0.0_f64, 0.0_f64), |(sum, seen), (score, weight)| {
            (sum + clamp_score(score) * weight, seen + weight)
        });
    if total <= 0.0 {
        return 0;
    }
    to_score(weighted / total)
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "the value is clamped to 0..=100 before conversion"
)]
const fn to_score(value: f64) -> u8 {
    clamp_score(value).round() as u8
}

/// One factor's sub-score plus an optional reasoning note.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    /// Sub-score for the factor.
    pub score: FactorScore,
    /// Note to surface when the factor is notably strong or weak.
    pub note: Option<String>,
}

impl Assessment {
    /// An assessment that adds nothing to the reasoning.
    #[must_use]
    pub const fn quiet(score: FactorScore) -> Self {
        Self { score, note: None }
    }

    /// An assessment that contributes `note` to the reasoning.
    #[must_use]
    pub fn noted(score: FactorScore, note: impl Into<String>) -> Self {
        Self {
            score,
            note: Some(note.into()),
        }
    }
}

/// Collects factor assessments for one scoring call.
#[derive(Debug, Default)]
pub struct FactorSheet {
    breakdown: Breakdown,
    reasoning: Vec<String>,
}

impl FactorSheet {
    /// Start an empty sheet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the assessment for `factor`, replacing any earlier one.
    pub fn record(&mut self, factor: Factor, assessment: Assessment) {
        let Assessment { score, note } = assessment;
        self.breakdown.insert(factor, score);
        if let Some(text) = note {
            self.reasoning.push(text);
        }
    }

    /// Aggregate the sheet into a result.
    ///
    /// Factors in `weights` that were never recorded are filled with a
    /// neutral score so the denominator stays defined.
    #[must_use]
    pub fn finish(mut self, weights: &FactorWeights, provenance: Provenance) -> MatchResult {
        for factor in weights.factors() {
            self.breakdown.entry(factor).or_insert_with(|| {
                debug!("factor {factor} was not assessed; scoring it neutrally");
                FactorScore::neutral("Not assessed")
            });
        }
        let score = weighted_score(&self.breakdown, weights);
        MatchResult::new(score, self.breakdown, self.reasoning, provenance)
    }
}
