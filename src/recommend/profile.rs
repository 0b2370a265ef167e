// Content-based ranking from a user's rating history.
//
// Each rated item that exists in the snapshot contributes its similarity row,
// scaled by the rating value. The mean of those contributions is the user's
// profile: one score per catalog item. Ranking that profile, minus the items
// the user already rated, is the recommendation.

use std::collections::HashSet;

use tracing::debug;

use crate::db::models::{Item, UserRating};
use crate::snapshot::Snapshot;

/// Mean of `value * similarity_row(item)` over every rating whose item is in
/// the snapshot. `None` when the snapshot isn't ready or no rating resolved.
pub fn build_profile(snapshot: &Snapshot, ratings: &[UserRating]) -> Option<Vec<f64>> {
    if !snapshot.is_ready() || ratings.is_empty() {
        return None;
    }

    let mut profile = vec![0.0; snapshot.len()];
    let mut contributing = 0usize;

    for rating in ratings {
        // Ratings can reference items newer than this snapshot
        let Some(idx) = snapshot.index().idx_for(&rating.item_id) else {
            continue;
        };
        if snapshot
            .similarity()
            .accumulate_row(idx, rating.value, &mut profile)
        {
            contributing += 1;
        }
    }

    debug!(
        ratings = ratings.len(),
        contributing, "Built rating profile"
    );

    if contributing == 0 {
        return None;
    }

    let count = contributing as f64;
    for score in &mut profile {
        *score /= count;
    }
    Some(profile)
}

/// Rank the snapshot by profile score (descending, ties by catalog index),
/// drop already-rated items, and return up to `top_n` items.
///
/// `None` means there was no content signal and the caller should fall back.
/// `Some` with fewer than `top_n` (even zero) items is a complete answer.
pub fn rank_by_profile(snapshot: &Snapshot, ratings: &[UserRating], top_n: usize) -> Option<Vec<Item>> {
    let profile = build_profile(snapshot, ratings)?;

    let rated: HashSet<&str> = ratings.iter().map(|r| r.item_id.as_str()).collect();

    let mut order: Vec<usize> = (0..profile.len()).collect();
    order.sort_by(|&a, &b| profile[b].total_cmp(&profile[a]).then_with(|| a.cmp(&b)));

    let index = snapshot.index();
    let items = order
        .into_iter()
        .filter(|&idx| index.id_for(idx).is_some_and(|id| !rated.contains(id)))
        .take(top_n)
        .filter_map(|idx| index.item(idx).cloned())
        .collect();

    Some(items)
}
