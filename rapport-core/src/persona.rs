//! Normalised view of a subject's preferences.
//!
//! [`PersonaSnapshot::from_profile`] is the single place where the loose
//! [`PersonaBag`](crate::PersonaBag) is validated. Strategies only ever see
//! the snapshot, so they never repeat null checks on raw profile data.

use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{PERSONA_BAG_VERSION, UserProfile};

/// Trim and lower-case a tag-like value, rejecting blanks.
///
/// # Examples
/// ```
/// use rapport_core::normalise_tag;
///
/// assert_eq!(normalise_tag("  Street Food "), Some("street food".to_owned()));
/// assert_eq!(normalise_tag("   "), None);
/// ```
#[must_use]
pub fn normalise_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalise a collection of tags into a sorted set.
pub fn normalise_tags<'a, I>(raw: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    raw.into_iter()
        .filter_map(|value| normalise_tag(value))
        .collect()
}

fn label_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Spending tier a subject travels at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Budget {
    /// Cheapest options first.
    #[serde(rename = "budget")]
    Budget,
    /// Comfortable but not extravagant.
    #[serde(rename = "mid-range")]
    MidRange,
    /// Premium options.
    #[serde(rename = "luxury")]
    Luxury,
}

impl Budget {
    /// Parse a stored label leniently (case, `-`, `_` and spaces ignored).
    ///
    /// # Examples
    /// ```
    /// use rapport_core::Budget;
    ///
    /// assert_eq!(Budget::parse("Mid_Range"), Some(Budget::MidRange));
    /// assert_eq!(Budget::parse("lavish"), None);
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match label_key(raw).as_str() {
            "budget" => Some(Self::Budget),
            "midrange" => Some(Self::MidRange),
            "luxury" => Some(Self::Luxury),
            _ => None,
        }
    }

    /// Ordinal price level the tier is comfortable with.
    #[must_use]
    pub const fn price_level(self) -> u8 {
        match self {
            Self::Budget => 1,
            Self::MidRange => 2,
            Self::Luxury => 4,
        }
    }

    /// Return the tier's label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::MidRange => "mid-range",
            Self::Luxury => "luxury",
        }
    }
}

impl std::fmt::Display for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much weight a subject puts on safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyPreference {
    /// Relaxed about safety.
    Low,
    /// Average concern.
    Medium,
    /// Safety is a priority.
    High,
}

impl SafetyPreference {
    /// Parse a stored label leniently.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match label_key(raw).as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Inclusive preferred age range with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    min: u32,
    max: u32,
}

impl AgeRange {
    /// Build a range, returning `None` when `min > max`.
    ///
    /// # Examples
    /// ```
    /// use rapport_core::AgeRange;
    ///
    /// assert!(AgeRange::new(25, 35).is_some());
    /// assert!(AgeRange::new(40, 30).is_none());
    /// ```
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Option<Self> {
        if min > max {
            None
        } else {
            Some(Self { min, max })
        }
    }

    /// Lower bound.
    #[must_use]
    pub const fn min(self) -> u32 {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub const fn max(self) -> u32 {
        self.max
    }

    /// Distance in years from `age` to the nearest bound; zero inside.
    #[must_use]
    pub const fn distance(self, age: u32) -> u32 {
        if age < self.min {
            self.min - age
        } else if age > self.max {
            age - self.max
        } else {
            0
        }
    }
}

/// Subject preferences used as scoring input.
///
/// Built fresh for each scoring call and never persisted on its own.
///
/// # Examples
/// ```
/// use rapport_core::{Budget, PersonaSnapshot, UserProfile};
///
/// let profile: UserProfile = serde_json::from_str(
///     r#"{"languages":["EN"," th "],"persona":{"budget":"Mid-Range","interests":["Food"]}}"#,
/// )?;
/// let persona = PersonaSnapshot::from_profile(&profile);
/// assert_eq!(persona.budget, Some(Budget::MidRange));
/// assert!(persona.languages.contains("th"));
/// assert!(persona.interests.contains("food"));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSnapshot {
    /// Normalised interest tags.
    pub interests: BTreeSet<String>,
    /// Budget tier.
    pub budget: Option<Budget>,
    /// Travel styles, primary first, with original casing.
    pub travel_style: Vec<String>,
    /// Travel rhythm label.
    pub travel_rhythm: Option<String>,
    /// Normalised language names.
    pub languages: BTreeSet<String>,
    /// Preferred companion age range.
    pub age_range: Option<AgeRange>,
    /// Safety preference.
    pub safety_preference: Option<SafetyPreference>,
}

impl PersonaSnapshot {
    /// Normalise a stored profile into a snapshot.
    ///
    /// Unknown budget or safety labels and inverted age ranges are dropped
    /// rather than rejected; the affected factors then score neutrally.
    #[must_use]
    pub fn from_profile(profile: &UserProfile) -> Self {
        let languages = profile
            .languages
            .as_ref()
            .map(normalise_tags)
            .unwrap_or_default();
        let Some(bag) = profile.persona.as_ref() else {
            return Self {
                languages,
                ..Self::default()
            };
        };
        if bag.version > PERSONA_BAG_VERSION {
            debug!(
                "persona bag version {} is newer than supported version {PERSONA_BAG_VERSION}; reading known fields only",
                bag.version
            );
        }

        let budget = bag.budget.as_deref().and_then(|raw| {
            let parsed = Budget::parse(raw);
            if parsed.is_none() {
                debug!("discarding unrecognised budget label '{raw}'");
            }
            parsed
        });
        let age_range = bag.age_range.and_then(|raw| match (raw.min, raw.max) {
            (Some(min), Some(max)) => {
                let range = AgeRange::new(min, max);
                if range.is_none() {
                    debug!("discarding inverted age range {min}..{max}");
                }
                range
            }
            _ => None,
        });

        Self {
            interests: bag
                .interests
                .as_ref()
                .map(normalise_tags)
                .unwrap_or_default(),
            budget,
            travel_style: bag
                .travel_styles()
                .into_iter()
                .map(|style| style.trim().to_owned())
                .filter(|style| !style.is_empty())
                .collect(),
            travel_rhythm: bag
                .travel_rhythm
                .as_deref()
                .map(str::trim)
                .filter(|rhythm| !rhythm.is_empty())
                .map(str::to_owned),
            languages,
            age_range,
            safety_preference: bag
                .safety_preference
                .as_deref()
                .and_then(SafetyPreference::parse),
        }
    }

    /// Primary travel style, if any.
    #[must_use]
    pub fn primary_style(&self) -> Option<&str> {
        self.travel_style.first().map(String::as_str)
    }
}
