//! Compatibility between two users as travel companions.

use chrono::NaiveDate;
use rapport_core::{
    Factor, FactorScore, FactorWeights, MatchContext, MatchResult, MatchStrategy, PersonaSnapshot,
    Provenance, TargetType, UserTarget,
};

use crate::aggregate::{Assessment, FactorSheet};
use crate::overlap::{capped_points, shared_values};

/// Default weights for user-to-user matching.
pub const USER_WEIGHTS: [(Factor, f64); 5] = [
    (Factor::Languages, 0.30),
    (Factor::TravelStyle, 0.25),
    (Factor::Interests, 0.20),
    (Factor::Age, 0.15),
    (Factor::Location, 0.10),
];

/// Travel style pairs that are treated as an outright clash, in either order.
const STYLE_CLASHES: [(&str, &str); 1] = [("luxury", "backpacker")];

const POINTS_PER_LANGUAGE: u32 = 20;
const POINTS_PER_INTEREST: u32 = 25;
const SAME_STYLE_SCORE: f64 = 100.0;
const COMPATIBLE_STYLE_SCORE: f64 = 60.0;
const AGE_PENALTY_PER_YEAR: u32 = 5;
const KNOWN_LOCATION_SCORE: f64 = 70.0;

/// Scores another user against the subject's persona.
///
/// Languages, travel style, interests, age and location are assessed. The
/// target's persona bag is normalised the same way as the subject's, so
/// casing and whitespace never affect overlap.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use rapport_core::{MatchContext, MatchStrategy, PersonaSnapshot, UserTarget};
/// use rapport_scorer::UserMatchStrategy;
///
/// let strategy = UserMatchStrategy::default();
/// let result = strategy.calculate(
///     &PersonaSnapshot::default(),
///     &UserTarget::new("bob"),
///     &MatchContext::at(Utc::now()),
/// );
/// assert_eq!(result.score, 50);
/// assert_eq!(result.metadata.factors_used.len(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct UserMatchStrategy {
    weights: FactorWeights,
}

impl Default for UserMatchStrategy {
    fn default() -> Self {
        Self {
            weights: FactorWeights::from_entries(&USER_WEIGHTS),
        }
    }
}

impl UserMatchStrategy {
    /// Use an alternative weight table.
    #[must_use]
    pub const fn with_weights(weights: FactorWeights) -> Self {
        Self { weights }
    }
}

impl MatchStrategy for UserMatchStrategy {
    type Target = UserTarget;
    const TARGET_TYPE: TargetType = TargetType::User;

    fn weights(&self) -> &FactorWeights {
        &self.weights
    }

    fn calculate(
        &self,
        persona: &PersonaSnapshot,
        target: &UserTarget,
        context: &MatchContext,
    ) -> MatchResult {
        let other = target
            .profile
            .as_ref()
            .map(PersonaSnapshot::from_profile)
            .unwrap_or_default();
        let birthday = target.profile.as_ref().and_then(|profile| profile.birthday);

        let mut sheet = FactorSheet::new();
        sheet.record(Factor::Languages, assess_languages(persona, &other));
        sheet.record(Factor::TravelStyle, assess_travel_style(persona, &other));
        sheet.record(Factor::Interests, assess_interests(persona, &other));
        sheet.record(Factor::Age, assess_age(persona, birthday, context));
        sheet.record(Factor::Location, assess_location(target));
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

fn assess_languages(persona: &PersonaSnapshot, other: &PersonaSnapshot) -> Assessment {
    if persona.languages.is_empty() || other.languages.is_empty() {
        return Assessment::quiet(FactorScore::neutral("Language data unavailable"));
    }
    let shared = shared_values(&persona.languages, &other.languages);
    if shared.is_empty() {
        return Assessment::noted(
            FactorScore::new(0.0, "No common languages"),
            "No common languages",
        );
    }
    let text = format!("Can communicate in {}", shared.join(", "));
    let score = FactorScore::new(capped_points(shared.len(), POINTS_PER_LANGUAGE), &text)
        .with_value(shared.len())
        .with_shared(shared);
    Assessment::noted(score, text)
}

fn assess_travel_style(persona: &PersonaSnapshot, other: &PersonaSnapshot) -> Assessment {
    let (Some(mine), Some(theirs)) = (persona.primary_style(), other.primary_style()) else {
        return Assessment::quiet(FactorScore::neutral("Travel style unknown"));
    };
    let (left, right) = (mine.to_lowercase(), theirs.to_lowercase());
    if left == right {
        let text = format!("Both travel as {mine}");
        return Assessment::noted(FactorScore::new(SAME_STYLE_SCORE, &text), text);
    }
    let clash = STYLE_CLASHES.iter().any(|&(a, b)| {
        (left == a && right == b) || (left == b && right == a)
    });
    if clash {
        let text = format!("Travel styles clash ({mine} vs {theirs})");
        return Assessment::noted(FactorScore::new(0.0, &text), text);
    }
    Assessment::quiet(FactorScore::new(
        COMPATIBLE_STYLE_SCORE,
        format!("Different but compatible styles ({mine} and {theirs})"),
    ))
}

fn assess_interests(persona: &PersonaSnapshot, other: &PersonaSnapshot) -> Assessment {
    if persona.interests.is_empty() || other.interests.is_empty() {
        return Assessment::quiet(FactorScore::neutral("Interest data unavailable"));
    }
    let shared = shared_values(&persona.interests, &other.interests);
    if shared.is_empty() {
        return Assessment::noted(
            FactorScore::new(0.0, "No shared interests"),
            "No shared interests",
        );
    }
    let text = format!("Shared interests: {}", shared.join(", "));
    let score = FactorScore::new(capped_points(shared.len(), POINTS_PER_INTEREST), &text)
        .with_value(shared.len())
        .with_shared(shared);
    Assessment::noted(score, text)
}

fn assess_age(
    persona: &PersonaSnapshot,
    birthday: Option<NaiveDate>,
    context: &MatchContext,
) -> Assessment {
    let Some(range) = persona.age_range else {
        return Assessment::quiet(FactorScore::neutral("No preferred age range"));
    };
    let Some(age) = birthday.and_then(|born| context.now.date_naive().years_since(born)) else {
        return Assessment::quiet(FactorScore::neutral("Age unknown"));
    };
    let distance = range.distance(age);
    if distance == 0 {
        let text = format!("Age {age} is within the preferred range");
        return Assessment::noted(FactorScore::new(100.0, &text).with_value(age), text);
    }
    let penalty = distance.saturating_mul(AGE_PENALTY_PER_YEAR).min(100);
    let score = FactorScore::new(
        f64::from(100 - penalty),
        format!(
            "Age {age} is {distance} years outside {}-{}",
            range.min(),
            range.max()
        ),
    )
    .with_value(age);
    Assessment::quiet(score)
}

fn assess_location(target: &UserTarget) -> Assessment {
    match target.current_city.as_ref() {
        Some(city) if city.is_resolvable() => Assessment::quiet(FactorScore::new(
            KNOWN_LOCATION_SCORE,
            format!("Based in {}", city.label()),
        )),
        _ => Assessment::quiet(FactorScore::neutral("Location unknown")),
    }
}
