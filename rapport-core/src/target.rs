//! Entities a persona can be scored against.
//!
//! [`Target`] is a closed sum over the supported [`TargetType`]s, so adding a
//! new kind of target forces every dispatch site to handle it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::UserProfile;

/// Kind of entity being scored.
///
/// # Examples
/// ```
/// use rapport_core::TargetType;
///
/// let parsed: TargetType = "Place".parse()?;
/// assert_eq!(parsed, TargetType::Place);
/// assert!("country".parse::<TargetType>().is_err());
/// # Ok::<(), rapport_core::UnknownTargetType>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// Another user.
    User,
    /// A place such as a café or venue.
    Place,
}

impl TargetType {
    /// Every supported target type.
    pub const ALL: [Self; 2] = [Self::User, Self::Place];

    /// Return the type tag as used on the wire and in the cache.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Place => "place",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetType {
    type Err = UnknownTargetType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "place" => Ok(Self::Place),
            _ => Err(UnknownTargetType {
                value: s.to_owned(),
            }),
        }
    }
}

/// A target type tag had no registered strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no match strategy is registered for target type '{value}'")]
pub struct UnknownTargetType {
    /// The unrecognised tag.
    pub value: String,
}

/// A scoring target, shaped by its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Target {
    /// Another user.
    User(UserTarget),
    /// A place.
    Place(PlaceTarget),
}

impl Target {
    /// Type tag of the target.
    #[must_use]
    pub const fn target_type(&self) -> TargetType {
        match self {
            Self::User(_) => TargetType::User,
            Self::Place(_) => TargetType::Place,
        }
    }

    /// Identifier of the target.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::User(user) => &user.id,
            Self::Place(place) => &place.id,
        }
    }
}

/// Another user considered as a travel companion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTarget {
    /// User identifier.
    pub id: String,
    /// Stored profile, when the user has filled one in.
    #[serde(default)]
    pub profile: Option<UserProfile>,
    /// City the user is currently in.
    #[serde(default)]
    pub current_city: Option<CurrentCity>,
}

impl UserTarget {
    /// Construct a target with no profile or location.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            profile: None,
            current_city: None,
        }
    }
}

/// A user's current city.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentCity {
    /// Identifier of the owning country record.
    #[serde(default)]
    pub country_ref_id: Option<String>,
    /// City name.
    pub name: String,
    /// Owning country, when joined.
    #[serde(default)]
    pub country: Option<Country>,
}

impl CurrentCity {
    /// Whether the city can be tied to a country.
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        let has_ref = self
            .country_ref_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        !self.name.trim().is_empty() && (has_ref || self.country.is_some())
    }

    /// Human-readable "City, Country" label.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.country {
            Some(country) => format!("{}, {}", self.name, country.name),
            None => self.name.clone(),
        }
    }
}

/// A country record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Country {
    /// Display name.
    pub name: String,
    /// ISO country code.
    pub code: String,
}

/// A place scored against a persona.
///
/// # Examples
/// ```
/// use rapport_core::PlaceTarget;
///
/// let place = PlaceTarget::new("cafe-1", ["coffee", "music"]).with_price_level(2);
/// assert_eq!(place.tags.len(), 2);
/// assert_eq!(place.price_level, Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceTarget {
    /// Place identifier.
    pub id: String,
    /// Descriptive tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ordinal price level, typically `1..=4`.
    #[serde(default)]
    pub price_level: Option<u8>,
    /// Ambience signals on a `0..=10` scale.
    #[serde(default)]
    pub vibe_scores: Option<VibeScores>,
    /// Listing categories.
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

impl PlaceTarget {
    /// Construct a place with tags and nothing else.
    #[must_use]
    pub fn new<I, T>(id: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            id: id.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the price level while returning `self`.
    #[must_use]
    pub fn with_price_level(mut self, level: u8) -> Self {
        self.price_level = Some(level);
        self
    }

    /// Set the vibe scores while returning `self`.
    #[must_use]
    pub fn with_vibe_scores(mut self, vibe: VibeScores) -> Self {
        self.vibe_scores = Some(vibe);
        self
    }
}

/// Ambience signals reported for a place.
///
/// Either a single `overall` value or any subset of the named axes may be
/// present.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VibeScores {
    /// Single summary signal.
    pub overall: Option<f64>,
    /// How quiet the place is.
    pub quiet: Option<f64>,
    /// How crowded the place gets.
    pub crowded: Option<f64>,
    /// How tourist-oriented the place is.
    pub touristy: Option<f64>,
    /// How local the clientele is.
    pub local: Option<f64>,
    /// How modern the place feels.
    pub modern: Option<f64>,
    /// How traditional the place feels.
    pub traditional: Option<f64>,
}

impl VibeScores {
    /// Finite values that are present, `overall` first.
    pub fn values(&self) -> impl Iterator<Item = f64> {
        [
            self.overall,
            self.quiet,
            self.crowded,
            self.touristy,
            self.local,
            self.modern,
            self.traditional,
        ]
        .into_iter()
        .flatten()
        .filter(|value| value.is_finite())
    }
}
