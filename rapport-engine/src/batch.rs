//! Per-request outcomes of a batch scoring call.

use rapport_core::{BatchTarget, MatchResult};
use serde::Serialize;

/// Why a batch entry produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OmissionReason {
    /// No strategy handles the entry's target type.
    UnknownTargetType,
    /// The target id did not resolve.
    TargetNotFound,
    /// Loading targets of the entry's type failed.
    StoreUnavailable,
}

impl OmissionReason {
    /// Return the reason's wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownTargetType => "unknownTargetType",
            Self::TargetNotFound => "targetNotFound",
            Self::StoreUnavailable => "storeUnavailable",
        }
    }
}

impl std::fmt::Display for OmissionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one entry in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BatchItem {
    /// The entry was scored or served from cache.
    Matched(MatchResult),
    /// The entry was skipped without failing the batch.
    Omitted {
        /// Target type tag as requested.
        target_type: String,
        /// Target id as requested.
        target_id: String,
        /// Why the entry was skipped.
        reason: OmissionReason,
    },
}

impl BatchItem {
    pub(crate) fn omitted(request: &BatchTarget, reason: OmissionReason) -> Self {
        Self::Omitted {
            target_type: request.target_type.clone(),
            target_id: request.target_id.clone(),
            reason,
        }
    }

    /// The result, when the entry was matched.
    #[must_use]
    pub const fn result(&self) -> Option<&MatchResult> {
        match self {
            Self::Matched(result) => Some(result),
            Self::Omitted { .. } => None,
        }
    }
}

/// Outcomes of a batch, one per requested entry, in request order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchMatches {
    /// Per-entry outcomes.
    pub items: Vec<BatchItem>,
}

impl BatchMatches {
    /// Results for the entries that resolved, in request order.
    pub fn results(&self) -> impl Iterator<Item = &MatchResult> {
        self.items.iter().filter_map(BatchItem::result)
    }

    /// Consume the batch, keeping only resolved results.
    #[must_use]
    pub fn into_results(self) -> Vec<MatchResult> {
        self.items
            .into_iter()
            .filter_map(|item| match item {
                BatchItem::Matched(result) => Some(result),
                BatchItem::Omitted { .. } => None,
            })
            .collect()
    }

    /// Entries that were skipped, with their reasons.
    pub fn omissions(&self) -> impl Iterator<Item = (&str, &str, OmissionReason)> {
        self.items.iter().filter_map(|item| match item {
            BatchItem::Omitted {
                target_type,
                target_id,
                reason,
            } => Some((target_type.as_str(), target_id.as_str(), *reason)),
            BatchItem::Matched(_) => None,
        })
    }

    /// Number of entries in the batch.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch had no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
