// Popularity ranking: the deterministic fallback whenever there is no
// content signal to work with.
//
// The primary path is the catalog store's engagement-sorted query. If the
// store fails or returns nothing, rank the snapshot in memory with a quality
// floor so that a handful of votes can't put a game at the top.

use std::sync::Arc;

use tracing::warn;

use super::{RecommendationSource, Recommendations};
use crate::db::models::Item;
use crate::db::CatalogStore;
use crate::snapshot::Snapshot;

/// In-memory ranking requires strictly more votes than this...
pub const MIN_RATING_COUNT: i64 = 10;
/// ...and at least this average.
pub const MIN_AVERAGE_RATING: f64 = 3.5;

pub struct PopularityRanker {
    catalog: Arc<dyn CatalogStore>,
}

impl PopularityRanker {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// The `top_n` most popular items. Never fails; an empty list means the
    /// catalog is empty or nothing passed the in-memory quality floor.
    pub async fn rank(&self, snapshot: &Snapshot, top_n: usize) -> Recommendations {
        if top_n == 0 {
            return Recommendations {
                items: Vec::new(),
                source: RecommendationSource::Popular,
            };
        }

        let limit = u32::try_from(top_n).unwrap_or(u32::MAX);
        match self.catalog.popular_items(limit).await {
            Ok(items) if !items.is_empty() => {
                return Recommendations {
                    items,
                    source: RecommendationSource::Popular,
                };
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Popular items query failed, ranking snapshot in memory"),
        }

        Recommendations {
            items: rank_in_memory(snapshot.items(), top_n),
            source: RecommendationSource::PopularInMemory,
        }
    }
}

/// Filter by the quality floor, then order by (rating count desc, average
/// desc). Ties keep catalog order.
pub fn rank_in_memory(items: &[Item], top_n: usize) -> Vec<Item> {
    let mut candidates: Vec<(&Item, i64, f64)> = items
        .iter()
        .filter_map(|item| match (item.rating_count, item.average_rating) {
            (Some(count), Some(avg)) if count > MIN_RATING_COUNT && avg >= MIN_AVERAGE_RATING => {
                Some((item, count, avg))
            }
            _ => None,
        })
        .collect();

    // sort_by is stable, so equal keys stay in catalog order
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.2.total_cmp(&a.2)));

    candidates
        .into_iter()
        .take(top_n)
        .map(|(item, _, _)| item.clone())
        .collect()
}
