//! Dispatch from target types to their strategies.

use rapport_core::{
    FactorWeights, MatchContext, MatchResult, MatchStrategy, PersonaSnapshot, Target, TargetType,
    UnknownTargetType,
};
use rapport_scorer::{PlaceMatchStrategy, UserMatchStrategy};

/// One strategy per [`TargetType`].
///
/// Dispatch matches exhaustively on [`Target`], so a new target type does
/// not compile until a strategy is registered for it.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    user: UserMatchStrategy,
    place: PlaceMatchStrategy,
}

impl StrategyRegistry {
    /// Register explicit strategies, e.g. with custom weights.
    #[must_use]
    pub const fn new(user: UserMatchStrategy, place: PlaceMatchStrategy) -> Self {
        Self { user, place }
    }

    /// Resolve a raw target type tag.
    ///
    /// # Errors
    /// Returns [`UnknownTargetType`] when no strategy handles the tag.
    ///
    /// # Examples
    /// ```
    /// use rapport_core::TargetType;
    /// use rapport_engine::StrategyRegistry;
    ///
    /// let registry = StrategyRegistry::default();
    /// assert_eq!(registry.resolve("place"), Ok(TargetType::Place));
    /// assert!(registry.resolve("country").is_err());
    /// ```
    #[expect(
        clippy::unused_self,
        reason = "resolution stays a registry method so callers go through one dispatch point"
    )]
    pub fn resolve(&self, raw: &str) -> Result<TargetType, UnknownTargetType> {
        raw.parse()
    }

    /// Weight table used for `target_type`.
    #[must_use]
    pub fn weights(&self, target_type: TargetType) -> &FactorWeights {
        match target_type {
            TargetType::User => self.user.weights(),
            TargetType::Place => self.place.weights(),
        }
    }

    /// Score `target` with the strategy registered for its type.
    #[must_use]
    pub fn score(
        &self,
        persona: &PersonaSnapshot,
        target: &Target,
        context: &MatchContext,
    ) -> MatchResult {
        match target {
            Target::User(user) => self.user.calculate(persona, user, context),
            Target::Place(place) => self.place.calculate(persona, place, context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rapport_core::{Factor, FactorWeights, PlaceTarget, UserTarget};
    use rstest::rstest;

    #[rstest]
    #[case(TargetType::User, Factor::Languages)]
    #[case(TargetType::Place, Factor::Budget)]
    fn weights_follow_the_target_type(#[case] target_type: TargetType, #[case] factor: Factor) {
        let registry = StrategyRegistry::default();
        assert!(registry.weights(target_type).get(factor).is_some());
    }

    #[rstest]
    #[case("user", Some(TargetType::User))]
    #[case(" Place ", Some(TargetType::Place))]
    #[case("country", None)]
    fn resolves_registered_tags(#[case] raw: &str, #[case] expected: Option<TargetType>) {
        assert_eq!(StrategyRegistry::default().resolve(raw).ok(), expected);
    }

    #[rstest]
    fn dispatch_uses_the_target_shape() {
        let registry = StrategyRegistry::default();
        let now = Utc
            .with_ymd_and_hms(2026, 2, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp");
        let context = MatchContext::at(now);
        let persona = PersonaSnapshot::default();

        let place = registry.score(
            &persona,
            &Target::Place(PlaceTarget::new("p1", ["art"])),
            &context,
        );
        let user = registry.score(&persona, &Target::User(UserTarget::new("u1")), &context);
        assert_eq!(place.metadata.target_type, TargetType::Place);
        assert_eq!(user.metadata.target_type, TargetType::User);
    }

    #[rstest]
    fn custom_weights_change_the_outcome() {
        let place_only_vibe = PlaceMatchStrategy::with_weights(FactorWeights::from_entries(&[
            (Factor::Vibe, 1.0),
        ]));
        let registry = StrategyRegistry::new(UserMatchStrategy::default(), place_only_vibe);
        let now = Utc
            .with_ymd_and_hms(2026, 2, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp");
        let result = registry.score(
            &PersonaSnapshot::default(),
            &Target::Place(PlaceTarget::new("p1", ["art"])),
            &MatchContext::at(now),
        );
        assert_eq!(result.score, 60);
    }
}
