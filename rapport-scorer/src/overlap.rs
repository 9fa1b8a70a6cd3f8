//! Set-overlap helpers shared by the strategies.

use std::collections::BTreeSet;

/// Values present in both sets, in sorted order.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
/// use rapport_scorer::shared_values;
///
/// let left = BTreeSet::from(["food".to_owned(), "hiking".to_owned()]);
/// let right = BTreeSet::from(["food".to_owned(), "music".to_owned()]);
/// assert_eq!(shared_values(&left, &right), vec!["food".to_owned()]);
/// ```
#[must_use]
pub fn shared_values(left: &BTreeSet<String>, right: &BTreeSet<String>) -> Vec<String> {
    left.intersection(right).cloned().collect()
}

/// `count * per_item`, capped at 100, as a factor score.
pub(crate) fn capped_points(count: usize, per_item: u32) -> f64 {
    let bounded = u32::try_from(count).unwrap_or(u32::MAX);
    f64::from(bounded.saturating_mul(per_item).min(100))
}
