//! Match strategies for the rapport engine.
//!
//! Two strategies implement [`MatchStrategy`](rapport_core::MatchStrategy):
//! - [`UserMatchStrategy`] rates another user as a travel companion from
//!   shared languages, travel style, interests, age and location.
//! - [`PlaceMatchStrategy`] rates a place from tag overlap, budget fit and
//!   reported ambience.
//!
//! Both record one [`FactorScore`](rapport_core::FactorScore) per weighted
//! factor on a [`FactorSheet`] and aggregate with [`weighted_score`]. Missing
//! data scores neutrally instead of dropping the factor.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod aggregate;
mod overlap;
mod place;
mod user;

pub use aggregate::{Assessment, FactorSheet, weighted_score};
pub use overlap::shared_values;
pub use place::{PLACE_WEIGHTS, PlaceMatchStrategy};
pub use user::{USER_WEIGHTS, UserMatchStrategy};
