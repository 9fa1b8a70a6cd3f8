//! The contract every match strategy implements.

use chrono::{DateTime, Utc};

use crate::{FactorWeights, MatchMode, MatchResult, PersonaSnapshot, TargetType};

/// Inputs shared by every factor computation in one scoring call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchContext {
    /// Matching mode requested by the caller.
    pub mode: Option<MatchMode>,
    /// Instant the score is computed at; also used to derive ages.
    pub now: DateTime<Utc>,
}

impl MatchContext {
    /// Build a context for `now` with no mode.
    #[must_use]
    pub const fn at(now: DateTime<Utc>) -> Self {
        Self { mode: None, now }
    }

    /// Set the mode while returning `self`.
    #[must_use]
    pub const fn with_mode(mut self, mode: Option<MatchMode>) -> Self {
        self.mode = mode;
        self
    }
}

/// Turn a persona and a target of one type into an explainable score.
///
/// Strategies are pure: everything they need is passed in, they perform no
/// I/O, and identical inputs yield identical results. Implementations must
/// be `Send + Sync` so batches can be scored across threads.
///
/// Every factor named by [`MatchStrategy::weights`] must appear in the
/// returned breakdown. Absent data is scored neutrally rather than omitted.
///
/// # Examples
///
/// ```rust
/// use chrono::Utc;
/// use rapport_core::{
///     Breakdown, Factor, FactorScore, FactorWeights, MatchContext, MatchResult, MatchStrategy,
///     PersonaSnapshot, PlaceTarget, Provenance, TargetType,
/// };
///
/// struct FlatStrategy(FactorWeights);
///
/// impl MatchStrategy for FlatStrategy {
///     type Target = PlaceTarget;
///     const TARGET_TYPE: TargetType = TargetType::Place;
///
///     fn weights(&self) -> &FactorWeights {
///         &self.0
///     }
///
///     fn calculate(
///         &self,
///         _persona: &PersonaSnapshot,
///         target: &PlaceTarget,
///         context: &MatchContext,
///     ) -> MatchResult {
///         let breakdown = Breakdown::from([(Factor::Vibe, FactorScore::neutral("flat"))]);
///         MatchResult::new(
///             50,
///             breakdown,
///             Vec::new(),
///             Provenance {
///                 target_type: Self::TARGET_TYPE,
///                 target_id: target.id.clone(),
///                 calculated_at: context.now,
///                 mode: context.mode,
///             },
///         )
///     }
/// }
///
/// let strategy = FlatStrategy(FactorWeights::from_entries(&[(Factor::Vibe, 1.0)]));
/// let result = strategy.calculate(
///     &PersonaSnapshot::default(),
///     &PlaceTarget::new("p", ["art"]),
///     &MatchContext::at(Utc::now()),
/// );
/// assert_eq!(result.score, 50);
/// ```
pub trait MatchStrategy: Send + Sync {
    /// Target shape the strategy scores.
    type Target;

    /// Target type tag handled by the strategy.
    const TARGET_TYPE: TargetType;

    /// Static weight table for the strategy's factors.
    fn weights(&self) -> &FactorWeights;

    /// Score `target` for `persona`.
    fn calculate(
        &self,
        persona: &PersonaSnapshot,
        target: &Self::Target,
        context: &MatchContext,
    ) -> MatchResult;
}
