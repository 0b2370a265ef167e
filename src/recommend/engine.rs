// Engine: the public face of the recommender.
//
// Owns the injected repositories and the live snapshot. The snapshot sits
// behind an `RwLock<Arc<Snapshot>>`: readers clone the Arc and release the
// lock immediately, then rank without holding anything. A reload builds the
// replacement on a blocking thread and publishes it with a single swap, so an
// in-flight request keeps working against the snapshot it started with.
// Reloads are serialized, so publishes land in the order the catalog was read.
//
// Nothing here returns an error for data-quality or availability reasons.
// Store failures are logged and answered from the snapshot, and every answer
// carries a source tag saying so. The only hard errors are configuration
// problems caught in `Engine::new`.

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::popularity::PopularityRanker;
use super::profile::rank_by_profile;
use super::{Lookup, LookupSource, RatedItem, RecommendationSource, Recommendations};
use crate::db::models::{Item, UserRating};
use crate::db::{CatalogStore, InteractionStore};
use crate::snapshot::{Snapshot, SnapshotConfig, SnapshotPipeline, SnapshotStats};

/// Everything the engine needs besides its repositories.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub snapshot: SnapshotConfig,
    /// Upper bound on catalog items read per snapshot (`None` = all)
    pub catalog_limit: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot: SnapshotConfig::default(),
            catalog_limit: Some(5000),
        }
    }
}

pub struct Engine {
    catalog: Arc<dyn CatalogStore>,
    interactions: Arc<dyn InteractionStore>,
    pipeline: SnapshotPipeline,
    catalog_limit: Option<u32>,
    popularity: PopularityRanker,
    snapshot: RwLock<Arc<Snapshot>>,
    reload_lock: tokio::sync::Mutex<()>,
}

impl Engine {
    /// Validate the configuration and create an engine with an empty ("not
    /// ready") snapshot. Call `reload` to build the first real one.
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        interactions: Arc<dyn InteractionStore>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let pipeline =
            SnapshotPipeline::new(&config.snapshot).context("Invalid engine configuration")?;
        Ok(Self {
            popularity: PopularityRanker::new(Arc::clone(&catalog)),
            catalog,
            interactions,
            pipeline,
            catalog_limit: config.catalog_limit,
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
            reload_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// `new` followed by an initial `reload`.
    pub async fn load(
        catalog: Arc<dyn CatalogStore>,
        interactions: Arc<dyn InteractionStore>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let engine = Self::new(catalog, interactions, config)?;
        engine.reload().await?;
        Ok(engine)
    }

    /// The snapshot currently serving reads.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().is_ready()
    }

    pub fn stats(&self) -> SnapshotStats {
        self.snapshot().stats()
    }

    /// Replace the live snapshot. Readers holding the old Arc are unaffected.
    pub fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write() = snapshot;
    }

    pub async fn reload(&self) -> Result<SnapshotStats> {
        self.reload_with_progress(|_, _| {}).await
    }

    /// Read the catalog, build a new snapshot off the async runtime, and swap
    /// it in. If the catalog can't be read the current snapshot stays live.
    /// Returns the stats of whichever snapshot is live afterwards.
    ///
    /// Concurrent reloads queue up; each one reads, builds, and publishes
    /// before the next starts.
    pub async fn reload_with_progress<F>(&self, progress: F) -> Result<SnapshotStats>
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        let _reloading = self.reload_lock.lock().await;
        let items = match self.catalog.list_items(self.catalog_limit).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Catalog read failed, keeping current snapshot");
                return Ok(self.stats());
            }
        };

        info!(items = items.len(), "Building catalog snapshot");
        let pipeline = self.pipeline.clone();
        let snapshot =
            tokio::task::spawn_blocking(move || pipeline.build_with_progress(items, progress))
                .await
                .context("Snapshot build panicked")?;

        let stats = snapshot.stats();
        self.publish(snapshot);
        info!(ready = stats.ready, items = stats.items, "Published catalog snapshot");
        Ok(stats)
    }

    /// Content-based recommendations for a rating history, falling back to
    /// popularity when there is no usable signal.
    pub async fn recommend(&self, ratings: &[UserRating], top_n: usize) -> Recommendations {
        let snapshot = self.snapshot();
        match rank_by_profile(&snapshot, ratings, top_n) {
            Some(items) => Recommendations {
                items,
                source: RecommendationSource::ContentBased,
            },
            None => self.popularity.rank(&snapshot, top_n).await,
        }
    }

    /// Read the user's ratings fresh from the interaction store and
    /// recommend. A failed read counts as no ratings.
    pub async fn recommend_for_user(&self, user_id: &str, top_n: usize) -> Recommendations {
        let ratings = match self.interactions.get_ratings(user_id).await {
            Ok(ratings) => ratings,
            Err(e) => {
                warn!(user_id, error = %e, "Rating read failed, using popularity fallback");
                Vec::new()
            }
        };
        self.recommend(&ratings, top_n).await
    }

    pub async fn popular(&self, top_n: usize) -> Recommendations {
        let snapshot = self.snapshot();
        self.popularity.rank(&snapshot, top_n).await
    }

    /// Exact identifier lookup: catalog store first, snapshot as fallback.
    pub async fn find_by_identifier(&self, id: &str) -> Lookup<Option<Item>> {
        let failed = match self.catalog.item_by_id(id).await {
            Ok(Some(item)) => return Lookup::store(Some(item)),
            Ok(None) => false,
            Err(e) => {
                warn!(id, error = %e, "Catalog lookup failed, checking snapshot");
                true
            }
        };
        let snapshot = self.snapshot();
        let found = snapshot
            .index()
            .idx_for(id)
            .and_then(|idx| snapshot.index().item(idx).cloned());
        Lookup {
            source: fallback_source(found.is_some(), failed, &snapshot),
            value: found,
        }
    }

    /// Case-insensitive name lookup: catalog store first, snapshot as
    /// fallback (first match in catalog order).
    pub async fn find_by_name(&self, name: &str) -> Lookup<Option<Item>> {
        let failed = match self.catalog.item_by_name(name).await {
            Ok(Some(item)) => return Lookup::store(Some(item)),
            Ok(None) => false,
            Err(e) => {
                warn!(name, error = %e, "Catalog lookup failed, checking snapshot");
                true
            }
        };
        let wanted = name.to_lowercase();
        let snapshot = self.snapshot();
        let found = snapshot
            .items()
            .iter()
            .find(|item| item.name.to_lowercase() == wanted)
            .cloned();
        Lookup {
            source: fallback_source(found.is_some(), failed, &snapshot),
            value: found,
        }
    }

    /// Resolve the item and store the rating. False when the item is
    /// unknown, the value isn't a finite number, or the interaction store
    /// refuses the write.
    pub async fn record_rating(&self, user_id: &str, item_id: &str, value: f64) -> bool {
        if !value.is_finite() {
            warn!(user_id, item_id, value, "Non-finite rating ignored");
            return false;
        }
        let Some(item) = self.find_by_identifier(item_id).await.into_inner() else {
            warn!(user_id, item_id, "Rating for unknown item ignored");
            return false;
        };
        match self.interactions.upsert_rating(user_id, &item.id, value).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(user_id, item_id, error = %e, "Rating write failed");
                false
            }
        }
    }

    /// The user's ratings, oldest first, each with its item. Items are
    /// resolved store-first; ratings for items found nowhere are skipped.
    pub async fn rated_items(&self, user_id: &str) -> Lookup<Vec<RatedItem>> {
        let ratings = match self.interactions.get_ratings(user_id).await {
            Ok(ratings) => ratings,
            Err(e) => {
                warn!(user_id, error = %e, "Rating read failed");
                return Lookup {
                    value: Vec::new(),
                    source: LookupSource::Unavailable,
                };
            }
        };

        let mut source = LookupSource::Store;
        let mut rated = Vec::with_capacity(ratings.len());
        for rating in ratings {
            let lookup = self.find_by_identifier(&rating.item_id).await;
            if lookup.source.is_fallback() {
                source = LookupSource::Snapshot;
            }
            match lookup.value {
                Some(item) => rated.push(RatedItem { item, rating }),
                None => debug!(user_id, item_id = %rating.item_id, "Rated item no longer in catalog"),
            }
        }
        Lookup { value: rated, source }
    }

    /// The user's current rating of one item, if any.
    pub async fn rating_for(&self, user_id: &str, item_id: &str) -> Lookup<Option<UserRating>> {
        match self.interactions.get_ratings(user_id).await {
            Ok(ratings) => Lookup::store(ratings.into_iter().find(|r| r.item_id == item_id)),
            Err(e) => {
                warn!(user_id, error = %e, "Rating read failed");
                Lookup {
                    value: None,
                    source: LookupSource::Unavailable,
                }
            }
        }
    }

    /// Substring search over name, developer, and genres. Falls back to the
    /// snapshot when the store is unavailable.
    pub async fn search(&self, query: &str, page: u32, per_page: u32) -> Lookup<(Vec<Item>, u64)> {
        match self.catalog.search(query, page, per_page).await {
            Ok(result) => Lookup::store(result),
            Err(e) => {
                warn!(query, error = %e, "Catalog search failed, searching snapshot");
                let needle = query.to_lowercase();
                let snapshot = self.snapshot();
                let result = paginate(
                    snapshot.items().iter().filter(|item| matches_query(item, &needle)),
                    page,
                    per_page,
                );
                Lookup {
                    value: result,
                    source: fallback_source(false, true, &snapshot),
                }
            }
        }
    }

    /// Items whose primary genre equals `genre`, one page at a time.
    pub async fn items_by_genre(
        &self,
        genre: &str,
        page: u32,
        per_page: u32,
    ) -> Lookup<(Vec<Item>, u64)> {
        match self.catalog.items_by_genre(genre, page, per_page).await {
            Ok(result) => Lookup::store(result),
            Err(e) => {
                warn!(genre, error = %e, "Genre query failed, filtering snapshot");
                let snapshot = self.snapshot();
                let result = paginate(
                    snapshot
                        .items()
                        .iter()
                        .filter(|item| item.primary_genre.as_deref() == Some(genre)),
                    page,
                    per_page,
                );
                Lookup {
                    value: result,
                    source: fallback_source(false, true, &snapshot),
                }
            }
        }
    }

    /// Distinct primary genres, sorted.
    pub async fn genres(&self) -> Lookup<Vec<String>> {
        match self.catalog.genres().await {
            Ok(genres) => Lookup::store(genres),
            Err(e) => {
                warn!(error = %e, "Genre listing failed, using snapshot");
                let snapshot = self.snapshot();
                let mut genres: Vec<String> = snapshot
                    .items()
                    .iter()
                    .filter_map(|item| item.primary_genre.clone())
                    .filter(|genre| !genre.is_empty())
                    .collect();
                genres.sort();
                genres.dedup();
                Lookup {
                    value: genres,
                    source: fallback_source(false, true, &snapshot),
                }
            }
        }
    }
}

/// Source tag for an answer computed from the snapshot after a store miss
/// or failure. A miss the snapshot can't improve on stays the store's answer.
fn fallback_source(found: bool, store_failed: bool, snapshot: &Snapshot) -> LookupSource {
    if found || (store_failed && snapshot.is_ready()) {
        LookupSource::Snapshot
    } else if store_failed {
        LookupSource::Unavailable
    } else {
        LookupSource::Store
    }
}

fn matches_query(item: &Item, needle: &str) -> bool {
    std::iter::once(Some(item.name.as_str()))
        .chain([
            item.developer.as_deref(),
            item.primary_genre.as_deref(),
            item.genres.as_deref(),
        ])
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

fn paginate<'a>(
    matches: impl Iterator<Item = &'a Item>,
    page: u32,
    per_page: u32,
) -> (Vec<Item>, u64) {
    let matches: Vec<&Item> = matches.collect();
    let skip = (page.max(1) as usize - 1) * per_page as usize;
    let items = matches
        .iter()
        .skip(skip)
        .take(per_page as usize)
        .map(|item| (*item).clone())
        .collect();
    (items, matches.len() as u64)
}
