//! Stored user profiles and the loosely-structured persona bag.
//!
//! Profiles arrive from the store as JSON documents whose persona section
//! may be partially filled, hold legacy shapes, or be missing entirely.
//! Every field is therefore optional; [`crate::PersonaSnapshot`] performs the
//! one-off normalisation into a strongly typed view.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current version of the persona bag layout.
pub const PERSONA_BAG_VERSION: u32 = 1;

/// A user's stored profile.
///
/// # Examples
/// ```
/// use rapport_core::UserProfile;
///
/// let profile: UserProfile = serde_json::from_str(
///     r#"{"languages":["en"],"persona":{"travelStyle":"Backpacker"},"birthday":"1994-02-01"}"#,
/// )?;
/// assert_eq!(profile.languages.as_deref(), Some(&["en".to_owned()][..]));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    /// Languages the user speaks.
    pub languages: Option<Vec<String>>,
    /// Free-form travel preferences.
    pub persona: Option<PersonaBag>,
    /// Date of birth.
    pub birthday: Option<NaiveDate>,
}

/// Versioned, all-optional persona preferences as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonaBag {
    /// Layout version the bag was written with.
    pub version: u32,
    /// Free-form interest tags.
    pub interests: Option<Vec<String>>,
    /// Budget tier label, e.g. `"mid-range"`.
    pub budget: Option<String>,
    /// Travel styles, most important first.
    pub travel_style: Option<StyleField>,
    /// Preferred travel rhythm, e.g. `"slow"`.
    pub travel_rhythm: Option<String>,
    /// Preferred companion age range.
    pub age_range: Option<RawAgeRange>,
    /// Safety preference label.
    pub safety_preference: Option<String>,
}

impl Default for PersonaBag {
    fn default() -> Self {
        Self {
            version: PERSONA_BAG_VERSION,
            interests: None,
            budget: None,
            travel_style: None,
            travel_rhythm: None,
            age_range: None,
            safety_preference: None,
        }
    }
}

impl PersonaBag {
    /// Travel styles as a list regardless of the stored shape.
    #[must_use]
    pub fn travel_styles(&self) -> Vec<String> {
        self.travel_style
            .as_ref()
            .map(StyleField::to_vec)
            .unwrap_or_default()
    }
}

/// Travel style stored either as a single label or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleField {
    /// A single style label.
    One(String),
    /// Several labels, primary first.
    Many(Vec<String>),
}

impl StyleField {
    /// Return the labels as an owned list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(style) => vec![style.clone()],
            Self::Many(styles) => styles.clone(),
        }
    }
}

/// Age range with nullable bounds, as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAgeRange {
    /// Lower bound, inclusive.
    pub min: Option<u32>,
    /// Upper bound, inclusive.
    pub max: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"travelStyle":"Luxury"}"#, vec!["Luxury"])]
    #[case(r#"{"travelStyle":["Backpacker","Slow"]}"#, vec!["Backpacker", "Slow"])]
    #[case(r#"{}"#, vec![])]
    fn travel_style_accepts_both_shapes(#[case] json: &str, #[case] expected: Vec<&str>) {
        let bag: PersonaBag = serde_json::from_str(json).expect("decode persona bag");
        assert_eq!(bag.travel_styles(), expected);
    }

    #[rstest]
    fn missing_version_defaults_to_current() {
        let bag: PersonaBag = serde_json::from_str("{}").expect("decode persona bag");
        assert_eq!(bag.version, PERSONA_BAG_VERSION);
    }

    #[rstest]
    fn null_fields_decode_as_absent() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"languages":null,"persona":{"ageRange":{"min":null}}}"#)
                .expect("decode profile");
        assert!(profile.languages.is_none());
        let range = profile
            .persona
            .and_then(|bag| bag.age_range)
            .expect("age range should be present");
        assert_eq!(range, RawAgeRange::default());
    }
}
