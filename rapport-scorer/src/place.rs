//! Relevance of a place to a subject's persona.

use rapport_core::{
    Budget, Factor, FactorScore, FactorWeights, MatchContext, MatchResult, MatchStrategy,
    PersonaSnapshot, PlaceTarget, Provenance, TargetType, VibeScores, normalise_tags,
};

use crate::aggregate::{Assessment, FactorSheet};
use crate::overlap::shared_values;

/// Default weights for place matching.
pub const PLACE_WEIGHTS: [(Factor, f64); 3] = [
    (Factor::Interests, 0.50),
    (Factor::Budget, 0.30),
    (Factor::Vibe, 0.20),
];

/// Score used when a place reports no usable ambience data.
const DEFAULT_VIBE_SCORE: f64 = 60.0;
const VIBE_SCALE: f64 = 10.0;
const STANDOUT_VIBE_SCORE: f64 = 80.0;

/// Scores a place against the subject's persona.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
///
/// use chrono::Utc;
/// use rapport_core::{Budget, Confidence, MatchContext, MatchStrategy, PersonaSnapshot, PlaceTarget};
/// use rapport_scorer::PlaceMatchStrategy;
///
/// let persona = PersonaSnapshot {
///     budget: Some(Budget::MidRange),
///     interests: BTreeSet::from(["art".to_owned(), "coffee".to_owned()]),
///     ..PersonaSnapshot::default()
/// };
/// let place = PlaceTarget::new("cafe-1", ["coffee", "music"]).with_price_level(2);
///
/// let result = PlaceMatchStrategy::default().calculate(&persona, &place, &MatchContext::at(Utc::now()));
/// assert_eq!(result.score, 67);
/// assert_eq!(result.confidence, Confidence::Medium);
/// ```
#[derive(Debug, Clone)]
pub struct PlaceMatchStrategy {
    weights: FactorWeights,
}

impl Default for PlaceMatchStrategy {
    fn default() -> Self {
        Self {
            weights: FactorWeights::from_entries(&PLACE_WEIGHTS),
        }
    }
}

impl PlaceMatchStrategy {
    /// Use an alternative weight table.
    #[must_use]
    pub const fn with_weights(weights: FactorWeights) -> Self {
        Self { weights }
    }
}

impl MatchStrategy for PlaceMatchStrategy {
    type Target = PlaceTarget;
    const TARGET_TYPE: TargetType = TargetType::Place;

    fn weights(&self) -> &FactorWeights {
        &self.weights
    }

    fn calculate(
        &self,
        persona: &PersonaSnapshot,
        target: &PlaceTarget,
        context: &MatchContext,
    ) -> MatchResult {
        let mut sheet = FactorSheet::new();
        sheet.record(Factor::Interests, assess_tags(persona, target));
        sheet.record(Factor::Budget, assess_budget(persona.budget, target.price_level));
        sheet.record(Factor::Vibe, assess_vibe(target.vibe_scores.as_ref()));
        sheet.finish(
            &self.weights,
            Provenance {
                target_type: Self::TARGET_TYPE,
                target_id: target.id.clone(),
                calculated_at: context.now,
                mode: context.mode,
            },
        )
    }
}

fn assess_tags(persona: &PersonaSnapshot, place: &PlaceTarget) -> Assessment {
    let tags = normalise_tags(&place.tags);
    if persona.interests.is_empty() || tags.is_empty() {
        return Assessment::quiet(FactorScore::neutral("Interest or tag data unavailable"));
    }
    let shared = shared_values(&persona.interests, &tags);
    if shared.is_empty() {
        return Assessment::quiet(FactorScore::new(0.0, "No overlap with your interests"));
    }
    let larger = persona.interests.len().max(tags.len());
    let note = format!("Perfect for {} lovers", shared.join(" & "));
    let score = FactorScore::new(
        overlap_ratio(shared.len(), larger),
        format!("Matches {} of your interests", shared.len()),
    )
    .with_value(shared.len())
    .with_shared(shared);
    Assessment::noted(score, note)
}

#[expect(
    clippy::float_arithmetic,
    reason = "tag overlap is scored as a percentage"
)]
fn overlap_ratio(shared: usize, larger: usize) -> f64 {
    let numerator = f64::from(u32::try_from(shared).unwrap_or(u32::MAX));
    let denominator = f64::from(u32::try_from(larger).unwrap_or(u32::MAX));
    if denominator <= 0.0 {
        return 0.0;
    }
    (100.0 * numerator / denominator).round()
}

fn assess_budget(budget: Option<Budget>, price_level: Option<u8>) -> Assessment {
    let (Some(tier), Some(price)) = (budget, price_level) else {
        return Assessment::quiet(FactorScore::neutral("Budget or price unknown"));
    };
    let preferred = tier.price_level();
    let score = match preferred.abs_diff(price) {
        0 => 100.0,
        1 => 70.0,
        2 => 30.0,
        _ => 0.0,
    };
    let entry = FactorScore::new(
        score,
        format!("Price level {price} for a {tier} budget (ideal {preferred})"),
    )
    .with_value(price);
    if price == preferred {
        Assessment::noted(entry, format!("Fits your {tier} budget"))
    } else if price > preferred && score <= 30.0 {
        Assessment::noted(entry, format!("Too expensive for {tier} budget"))
    } else {
        Assessment::quiet(entry)
    }
}

fn assess_vibe(vibe: Option<&VibeScores>) -> Assessment {
    let Some(scores) = vibe else {
        return Assessment::quiet(FactorScore::new(DEFAULT_VIBE_SCORE, "No vibe data"));
    };
    let Some(average) = mean(scores.values()) else {
        return Assessment::quiet(FactorScore::new(
            DEFAULT_VIBE_SCORE,
            "No specific vibe data",
        ));
    };
    let entry = FactorScore::new(scaled(average), format!("Average vibe {average:.1}/10"))
        .with_value(average);
    if entry.score >= STANDOUT_VIBE_SCORE {
        Assessment::noted(entry, "Great atmosphere")
    } else {
        Assessment::quiet(entry)
    }
}

#[expect(clippy::float_arithmetic, reason = "vibe axes are averaged")]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0_f64, 0_u32), |(sum, count), value| {
        (sum + value, count.saturating_add(1))
    });
    (count > 0).then(|| sum / f64::from(count))
}

#[expect(clippy::float_arithmetic, reason = "vibe averages use a 0..=10 scale")]
fn scaled(average: f64) -> f64 {
    average * VIBE_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rapport_core::Confidence;
    use rstest::{fixture, rstest};
    use std::collections::BTreeSet;

    #[fixture]
    fn context() -> MatchContext {
        MatchContext::at(
            Utc.with_ymd_and_hms(2026, 2, 14, 18, 0, 0)
                .single()
                .expect("valid timestamp"),
        )
    }

    fn persona(budget: Option<Budget>, interests: &[&str]) -> PersonaSnapshot {
        PersonaSnapshot {
            budget,
            interests: interests.iter().map(|tag| (*tag).to_owned()).collect::<BTreeSet<_>>(),
            ..PersonaSnapshot::default()
        }
    }

    fn factor(result: &MatchResult, factor: Factor) -> f64 {
        result
            .breakdown
            .get(&factor)
            .map(|entry| entry.score)
            .expect("factor should be scored")
    }

    #[rstest]
    fn coffee_lover_at_a_mid_range_cafe(context: MatchContext) {
        let place = PlaceTarget::new("cafe", ["Coffee", "music"]).with_price_level(2);
        let result = PlaceMatchStrategy::default().calculate(
            &persona(Some(Budget::MidRange), &["art", "coffee"]),
            &place,
            &context,
        );

        assert_eq!(factor(&result, Factor::Interests), 50.0);
        assert_eq!(factor(&result, Factor::Budget), 100.0);
        assert_eq!(factor(&result, Factor::Vibe), 60.0);
        assert_eq!(result.score, 67);
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(
            result.reasoning,
            vec![
                "Perfect for coffee lovers".to_owned(),
                "Fits your mid-range budget".to_owned()
            ]
        );
    }

    #[rstest]
    #[case(Budget::MidRange, 2, 100.0)]
    #[case(Budget::MidRange, 3, 70.0)]
    #[case(Budget::Budget, 3, 30.0)]
    #[case(Budget::Budget, 4, 0.0)]
    #[case(Budget::Luxury, 1, 0.0)]
    fn budget_penalty_ladder(#[case] budget: Budget, #[case] price: u8, #[case] expected: f64) {
        let assessment = assess_budget(Some(budget), Some(price));
        assert_eq!(assessment.score.score, expected);
    }

    #[rstest]
    fn expensive_places_are_called_out() {
        let assessment = assess_budget(Some(Budget::Budget), Some(4));
        assert_eq!(
            assessment.note.as_deref(),
            Some("Too expensive for budget budget")
        );
    }

    #[rstest]
    #[case(None, 60.0)]
    #[case(Some(VibeScores::default()), 60.0)]
    #[case(Some(VibeScores { overall: Some(8.5), ..VibeScores::default() }), 85.0)]
    #[case(Some(VibeScores { quiet: Some(4.0), local: Some(6.0), ..VibeScores::default() }), 50.0)]
    #[case(Some(VibeScores { overall: Some(14.0), ..VibeScores::default() }), 100.0)]
    fn vibe_averages_present_axes(#[case] vibe: Option<VibeScores>, #[case] expected: f64) {
        assert_eq!(assess_vibe(vibe.as_ref()).score.score, expected);
    }

    #[rstest]
    fn empty_tags_score_neutrally(context: MatchContext) {
        let place = PlaceTarget::new("blank", Vec::<String>::new());
        let result = PlaceMatchStrategy::default().calculate(
            &persona(None, &["art"]),
            &place,
            &context,
        );
        assert_eq!(factor(&result, Factor::Interests), 50.0);
        assert_eq!(factor(&result, Factor::Budget), 50.0);
    }

    #[rstest]
    fn disjoint_tags_score_zero(context: MatchContext) {
        let place = PlaceTarget::new("club", ["techno"]);
        let result = PlaceMatchStrategy::default().calculate(
            &persona(None, &["art"]),
            &place,
            &context,
        );
        assert_eq!(factor(&result, Factor::Interests), 0.0);
    }
}
