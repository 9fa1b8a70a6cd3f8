//! Tests for the `MatchingEngine`.

use super::*;
use chrono::{TimeDelta, TimeZone};
use rapport_core::{
    Confidence, MatchMode, PersonaBag, PlaceTarget, StyleField, UserProfile,
    test_support::{ManualClock, MemoryStore},
};
use rstest::{fixture, rstest};
use std::sync::Arc;

use crate::{DurableCache, MemoCache};

type DurableEngine =
    MatchingEngine<Arc<MemoryStore>, DurableCache<Arc<MemoryStore>>, Arc<ManualClock>>;

struct Harness {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    engine: DurableEngine,
}

fn profile(interests: &[&str], budget: &str, style: &str) -> UserProfile {
    UserProfile {
        languages: Some(vec!["en".into()]),
        persona: Some(PersonaBag {
            interests: Some(interests.iter().map(|tag| (*tag).to_owned()).collect()),
            budget: Some(budget.into()),
            travel_style: Some(StyleField::One(style.into())),
            ..PersonaBag::default()
        }),
        birthday: None,
    }
}

#[fixture]
fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn harness(start: DateTime<Utc>) -> Harness {
    let store = Arc::new(MemoryStore::default());
    store.insert_user(
        "alice",
        Some(profile(&["coffee", "music"], "mid-range", "slow")),
        None,
    );
    store.insert_user(
        "bob",
        Some(profile(&["music", "hiking"], "budget", "slow")),
        None,
    );
    store.insert_user("ghost", None, None);
    store.insert_place(PlaceTarget::new("cafe", ["coffee", "music"]).with_price_level(2));
    store.insert_place(PlaceTarget::new("club", ["dancing"]).with_price_level(4));

    let clock = Arc::new(ManualClock::starting_at(start));
    let engine = MatchingEngine::with_clock(
        Arc::clone(&store),
        DurableCache::new(Arc::clone(&store)),
        Arc::clone(&clock),
    );
    Harness {
        store,
        clock,
        engine,
    }
}

#[rstest]
fn repeated_requests_are_served_from_cache(harness: Harness, start: DateTime<Utc>) {
    let request = MatchRequest::new("alice", "place", "cafe");
    let first = harness.engine.calculate_match(&request).expect("first match");
    harness.clock.advance(TimeDelta::minutes(30));
    let second = harness.engine.calculate_match(&request).expect("second match");

    assert_eq!(first, second);
    assert_eq!(second.metadata.calculated_at, start);
    assert_eq!(harness.store.target_fetches(), 1);
}

#[rstest]
fn stale_entries_are_recomputed(harness: Harness, start: DateTime<Utc>) {
    let request = MatchRequest::new("alice", "place", "cafe");
    harness.engine.calculate_match(&request).expect("first match");
    harness.clock.advance(TimeDelta::hours(1));
    let second = harness.engine.calculate_match(&request).expect("second match");

    assert_eq!(second.metadata.calculated_at, start + TimeDelta::hours(1));
    assert_eq!(harness.store.target_fetches(), 2);
}

#[rstest]
fn modes_do_not_share_cache_entries(harness: Harness) {
    let travel = MatchRequest::new("alice", "user", "bob").with_mode(MatchMode::Travel);
    let current = MatchRequest::new("alice", "user", "bob").with_mode(MatchMode::Current);
    let travel_result = harness.engine.calculate_match(&travel).expect("travel match");
    let current_result = harness.engine.calculate_match(&current).expect("current match");

    assert_eq!(travel_result.metadata.mode, Some(MatchMode::Travel));
    assert_eq!(current_result.metadata.mode, Some(MatchMode::Current));
    assert_eq!(harness.store.cached_entries(), 2);
}

#[rstest]
fn invalidation_forces_recomputation(harness: Harness) {
    let request = MatchRequest::new("alice", "place", "cafe");
    harness.engine.calculate_match(&request).expect("first match");
    let removed = harness
        .engine
        .invalidate_user_matches("alice")
        .expect("invalidate");
    assert_eq!(removed, 1);

    harness.engine.calculate_match(&request).expect("second match");
    assert_eq!(harness.store.target_fetches(), 2);
}

#[rstest]
fn unknown_target_types_are_rejected(harness: Harness) {
    let request = MatchRequest::new("alice", "country", "th");
    let err = harness
        .engine
        .calculate_match(&request)
        .expect_err("country is not a target type");
    assert!(matches!(err, MatchError::UnknownTargetType(ref unknown) if unknown.value == "country"));
}

#[rstest]
#[case("nobody")]
#[case("ghost")]
fn subjects_without_profiles_are_not_found(harness: Harness, #[case] user_id: &str) {
    let request = MatchRequest::new(user_id, "place", "cafe");
    let err = harness
        .engine
        .calculate_match(&request)
        .expect_err("subject has no persona");
    assert!(matches!(err, MatchError::PersonaNotFound { user_id: ref id } if id == user_id));
}

#[rstest]
fn missing_targets_are_reported(harness: Harness) {
    let request = MatchRequest::new("alice", "place", "nowhere");
    let err = harness
        .engine
        .calculate_match(&request)
        .expect_err("place does not exist");
    assert!(matches!(
        err,
        MatchError::TargetNotFound { target_type: TargetType::Place, ref target_id } if target_id == "nowhere"
    ));
}

#[rstest]
fn scoring_survives_an_unavailable_cache(harness: Harness) {
    harness.store.set_cache_available(false);
    let result = harness
        .engine
        .calculate_match(&MatchRequest::new("alice", "place", "cafe"))
        .expect("cache outages do not fail scoring");

    assert_eq!(result.metadata.target_id, "cafe");
    assert_eq!(harness.store.cached_entries(), 0);
}

#[rstest]
fn invalidation_reports_an_unavailable_cache(harness: Harness) {
    harness.store.set_cache_available(false);
    let err = harness
        .engine
        .invalidate_user_matches("alice")
        .expect_err("invalidation needs the cache");
    assert!(matches!(err, MatchError::CacheUnavailable(_)));
}

#[rstest]
fn matching_places_score_above_clashing_ones(harness: Harness) {
    let cafe = harness
        .engine
        .calculate_match(&MatchRequest::new("alice", "place", "cafe"))
        .expect("cafe match");
    let club = harness
        .engine
        .calculate_match(&MatchRequest::new("alice", "place", "club"))
        .expect("club match");
    assert!(cafe.score > club.score);
    assert_eq!(cafe.confidence, Confidence::High);
}

#[rstest]
fn batches_preserve_request_order_and_report_omissions(harness: Harness) {
    let batch = BatchMatchRequest::new("alice")
        .with_target(BatchTarget::new("place", "club"))
        .with_target(BatchTarget::new("country", "th"))
        .with_target(BatchTarget::new("user", "bob"))
        .with_target(BatchTarget::new("place", "nowhere"))
        .with_target(BatchTarget::new("place", "cafe"));
    let outcome = harness
        .engine
        .calculate_batch_matches(&batch)
        .expect("batch match");

    let matched: Vec<&str> = outcome
        .results()
        .map(|result| result.metadata.target_id.as_str())
        .collect();
    assert_eq!(matched, vec!["club", "bob", "cafe"]);
    assert_eq!(
        outcome.omissions().collect::<Vec<_>>(),
        vec![
            ("country", "th", OmissionReason::UnknownTargetType),
            ("place", "nowhere", OmissionReason::TargetNotFound),
        ]
    );
    assert_eq!(outcome.len(), 5);
}

#[rstest]
fn batches_fetch_each_target_type_once(harness: Harness) {
    let batch = BatchMatchRequest::new("alice")
        .with_target(BatchTarget::new("place", "cafe"))
        .with_target(BatchTarget::new("user", "bob"))
        .with_target(BatchTarget::new("place", "club"));
    harness
        .engine
        .calculate_batch_matches(&batch)
        .expect("batch match");
    assert_eq!(harness.store.target_fetches(), 2);
}

#[rstest]
fn batches_reuse_cached_results(harness: Harness) {
    let single = harness
        .engine
        .calculate_match(&MatchRequest::new("alice", "place", "cafe"))
        .expect("single match");
    harness.clock.advance(TimeDelta::minutes(10));

    let batch = BatchMatchRequest::new("alice").with_target(BatchTarget::new("place", "cafe"));
    let outcome = harness
        .engine
        .calculate_batch_matches(&batch)
        .expect("batch match");
    assert_eq!(outcome.into_results(), vec![single]);
    assert_eq!(harness.store.target_fetches(), 1);
}

#[rstest]
fn batches_agree_with_single_calls(harness: Harness) {
    let batch = BatchMatchRequest::new("alice")
        .with_target(BatchTarget::new("place", "cafe"))
        .with_target(BatchTarget::new("user", "bob"));
    let outcome = harness
        .engine
        .calculate_batch_matches(&batch)
        .expect("batch match");
    harness
        .engine
        .invalidate_user_matches("alice")
        .expect("invalidate");

    let cafe = harness
        .engine
        .calculate_match(&MatchRequest::new("alice", "place", "cafe"))
        .expect("cafe match");
    let bob = harness
        .engine
        .calculate_match(&MatchRequest::new("alice", "user", "bob"))
        .expect("bob match");
    assert_eq!(outcome.into_results(), vec![cafe, bob]);
}

#[rstest]
fn unavailable_target_types_are_omitted(harness: Harness) {
    harness.store.set_targets_available(false);
    let batch = BatchMatchRequest::new("alice")
        .with_target(BatchTarget::new("place", "cafe"))
        .with_target(BatchTarget::new("user", "bob"));
    let outcome = harness
        .engine
        .calculate_batch_matches(&batch)
        .expect("batch match");
    let reasons: Vec<OmissionReason> = outcome.omissions().map(|(_, _, reason)| reason).collect();
    assert_eq!(
        reasons,
        vec![OmissionReason::StoreUnavailable, OmissionReason::StoreUnavailable]
    );
}

#[rstest]
fn batches_without_a_persona_fail(harness: Harness) {
    let batch = BatchMatchRequest::new("nobody").with_target(BatchTarget::new("place", "cafe"));
    let err = harness
        .engine
        .calculate_batch_matches(&batch)
        .expect_err("subject has no persona");
    assert!(matches!(err, MatchError::PersonaNotFound { .. }));
}

#[rstest]
fn batches_that_need_no_computation_skip_the_persona(harness: Harness) {
    let batch = BatchMatchRequest::new("nobody").with_target(BatchTarget::new("country", "th"));
    let outcome = harness
        .engine
        .calculate_batch_matches(&batch)
        .expect("nothing to compute");
    assert_eq!(outcome.results().count(), 0);
    assert_eq!(harness.store.target_fetches(), 0);
}

#[rstest]
fn empty_batches_yield_empty_results(harness: Harness) {
    let outcome = harness
        .engine
        .calculate_batch_matches(&BatchMatchRequest::new("alice"))
        .expect("empty batch");
    assert!(outcome.is_empty());
}

#[rstest]
fn memo_cache_serves_repeats_within_five_minutes(start: DateTime<Utc>) {
    let store = Arc::new(MemoryStore::default());
    store.insert_user("alice", Some(profile(&["art"], "budget", "backpacker")), None);
    store.insert_place(PlaceTarget::new("museum", ["art"]).with_price_level(1));
    let clock = Arc::new(ManualClock::starting_at(start));
    let engine = MatchingEngine::with_clock(Arc::clone(&store), MemoCache::new(), Arc::clone(&clock));
    let request = MatchRequest::new("alice", "place", "museum");

    engine.calculate_match(&request).expect("first match");
    clock.advance(TimeDelta::minutes(4));
    engine.calculate_match(&request).expect("second match");
    assert_eq!(store.target_fetches(), 1);

    clock.advance(TimeDelta::minutes(1));
    let refreshed = engine.calculate_match(&request).expect("third match");
    assert_eq!(store.target_fetches(), 2);
    assert_eq!(refreshed.metadata.calculated_at, start + TimeDelta::minutes(5));
}
