//! Named scoring signals and their per-factor outputs.
//!
//! A [`Factor`] identifies one signal (shared languages, budget fit, ...).
//! Strategies emit one [`FactorScore`] per factor and weight them with a
//! [`FactorWeights`] table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Upper bound of every factor and aggregate score.
pub const MAX_SCORE: f64 = 100.0;

/// Score assigned when the data behind a factor is absent.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// One named scoring signal.
///
/// # Examples
/// ```
/// use rapport_core::Factor;
///
/// assert_eq!(Factor::TravelStyle.as_str(), "travelStyle");
/// assert_eq!(Factor::Budget.to_string(), "budget");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Factor {
    /// Languages both parties speak.
    Languages,
    /// Compatibility of primary travel styles.
    TravelStyle,
    /// Overlap between interests (or interests and place tags).
    Interests,
    /// Target age relative to the preferred range.
    Age,
    /// Whether the target's whereabouts are known.
    Location,
    /// Fit between budget tier and price level.
    Budget,
    /// Ambience signals reported for a place.
    Vibe,
}

impl Factor {
    /// Return the factor's wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Languages => "languages",
            Self::TravelStyle => "travelStyle",
            Self::Interests => "interests",
            Self::Age => "age",
            Self::Location => "location",
            Self::Budget => "budget",
            Self::Vibe => "vibe",
        }
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-score for a single factor with its explanation.
///
/// Construct through [`FactorScore::new`] so the score is clamped into
/// `0.0..=100.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorScore {
    /// Score in `0.0..=100.0`.
    pub score: f64,
    /// Human-readable account of how the score was reached.
    pub explanation: String,
    /// Raw value the score was derived from, when useful to callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Values both sides have in common.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared: Vec<String>,
}

impl FactorScore {
    /// Build a factor score, clamping `score` into range.
    ///
    /// Non-finite scores collapse to `0.0`.
    ///
    /// # Examples
    /// ```
    /// use rapport_core::FactorScore;
    ///
    /// assert_eq!(FactorScore::new(140.0, "capped").score, 100.0);
    /// assert_eq!(FactorScore::new(f64::NAN, "broken").score, 0.0);
    /// ```
    #[must_use]
    pub fn new(score: f64, explanation: impl Into<String>) -> Self {
        Self {
            score: clamp_score(score),
            explanation: explanation.into(),
            value: None,
            shared: Vec::new(),
        }
    }

    /// Neutral score used when the underlying data is absent.
    #[must_use]
    pub fn neutral(explanation: impl Into<String>) -> Self {
        Self::new(NEUTRAL_SCORE, explanation)
    }

    /// Attach the raw value behind the score.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Attach the values both sides share.
    #[must_use]
    pub fn with_shared(mut self, shared: Vec<String>) -> Self {
        self.shared = shared;
        self
    }
}

/// Clamp a raw score into `0.0..=100.0`, mapping non-finite input to `0.0`.
#[must_use]
pub const fn clamp_score(score: f64) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }
    score.clamp(0.0, MAX_SCORE)
}

/// Static weight table owned by a strategy.
///
/// Weights need not sum to one; aggregation divides by the total weight of
/// the factors actually present. Negative or non-finite weights are stored
/// as `0.0`.
///
/// # Examples
/// ```
/// use rapport_core::{Factor, FactorWeights};
///
/// let weights = FactorWeights::from_entries(&[(Factor::Budget, 0.3), (Factor::Vibe, -1.0)]);
/// assert_eq!(weights.get(Factor::Budget), Some(0.3));
/// assert_eq!(weights.get(Factor::Vibe), Some(0.0));
/// assert!(weights.get(Factor::Age).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FactorWeights {
    weights: BTreeMap<Factor, f64>,
}

impl FactorWeights {
    /// Build a table from `(factor, weight)` pairs. Later entries win.
    #[must_use]
    pub fn from_entries(entries: &[(Factor, f64)]) -> Self {
        let mut table = Self::default();
        for &(factor, weight) in entries {
            table.set(factor, weight);
        }
        table
    }

    /// Insert or replace the weight for `factor`.
    pub fn set(&mut self, factor: Factor, weight: f64) {
        let sanitised = if weight.is_finite() {
            weight.max(0.0)
        } else {
            0.0
        };
        self.weights.insert(factor, sanitised);
    }

    /// Return the weight for `factor`, if the table defines one.
    #[must_use]
    pub fn get(&self, factor: Factor) -> Option<f64> {
        self.weights.get(&factor).copied()
    }

    /// Iterate over factors and weights in factor order.
    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        self.weights.iter().map(|(factor, weight)| (*factor, *weight))
    }

    /// Factors the table defines.
    pub fn factors(&self) -> impl Iterator<Item = Factor> + '_ {
        self.weights.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-5.0, 0.0)]
    #[case(0.0, 0.0)]
    #[case(62.5, 62.5)]
    #[case(100.0, 100.0)]
    #[case(250.0, 100.0)]
    #[case(f64::INFINITY, 0.0)]
    fn clamps_scores(#[case] raw: f64, #[case] expected: f64) {
        assert_eq!(clamp_score(raw), expected);
    }

    #[rstest]
    fn factor_names_round_trip_through_serde() {
        let encoded = serde_json::to_string(&Factor::TravelStyle).expect("encode factor");
        assert_eq!(encoded, "\"travelStyle\"");
        let decoded: Factor = serde_json::from_str(&encoded).expect("decode factor");
        assert_eq!(decoded, Factor::TravelStyle);
    }

    #[rstest]
    fn later_entries_replace_earlier_weights() {
        let weights = FactorWeights::from_entries(&[(Factor::Age, 0.1), (Factor::Age, 0.4)]);
        assert_eq!(weights.get(Factor::Age), Some(0.4));
        assert_eq!(weights.factors().count(), 1);
    }

    #[rstest]
    fn shared_values_are_omitted_from_json_when_empty() {
        let score = FactorScore::neutral("no data");
        let json = serde_json::to_value(&score).expect("encode factor score");
        assert!(json.get("shared").is_none());
        assert!(json.get("value").is_none());
    }
}
