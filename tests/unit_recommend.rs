// Recommendation behavior through the Engine, backed by an in-memory store
// double so no database is involved.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use cartridge::db::models::{Item, UserRating};
use cartridge::db::{CatalogStore, InteractionStore};
use cartridge::recommend::popularity::rank_in_memory;
use cartridge::snapshot::SnapshotConfig;
use cartridge::{Engine, EngineConfig, RecommendationSource};

#[derive(Default)]
struct MemoryStore {
    items: Vec<Item>,
    ratings: Mutex<HashMap<(String, String), f64>>,
}

impl MemoryStore {
    fn with_items(items: Vec<Item>) -> Arc<Self> {
        Arc::new(Self {
            items,
            ..Self::default()
        })
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_items(&self, limit: Option<u32>) -> Result<Vec<Item>> {
        let limit = limit.map_or(usize::MAX, |l| l as usize);
        Ok(self.items.iter().take(limit).cloned().collect())
    }

    async fn popular_items(&self, limit: u32) -> Result<Vec<Item>> {
        let mut items = self.items.clone();
        items.sort_by_key(|item| std::cmp::Reverse(item.rating_count.unwrap_or(0)));
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn item_by_id(&self, id: &str) -> Result<Option<Item>> {
        Ok(self.items.iter().find(|item| item.id == id).cloned())
    }

    async fn item_by_name(&self, name: &str) -> Result<Option<Item>> {
        Ok(self
            .items
            .iter()
            .find(|item| item.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn search(&self, _query: &str, _page: u32, _per_page: u32) -> Result<(Vec<Item>, u64)> {
        Ok((Vec::new(), 0))
    }

    async fn items_by_genre(
        &self,
        _genre: &str,
        _page: u32,
        _per_page: u32,
    ) -> Result<(Vec<Item>, u64)> {
        Ok((Vec::new(), 0))
    }

    async fn genres(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn upsert_items(&self, _items: &[Item]) -> Result<usize> {
        Ok(0)
    }
}

#[async_trait]
impl InteractionStore for MemoryStore {
    async fn get_ratings(&self, user_id: &str) -> Result<Vec<UserRating>> {
        let ratings = self.ratings.lock().unwrap();
        let mut out: Vec<UserRating> = ratings
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|((user, item), value)| UserRating::now(user.clone(), item.clone(), *value))
            .collect();
        out.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(out)
    }

    async fn upsert_rating(&self, user_id: &str, item_id: &str, value: f64) -> Result<bool> {
        self.ratings
            .lock()
            .unwrap()
            .insert((user_id.to_string(), item_id.to_string()), value);
        Ok(true)
    }
}

fn game(id: &str, description: &str, count: i64, avg: f64) -> Item {
    Item {
        description: Some(description.to_string()),
        rating_count: Some(count),
        average_rating: Some(avg),
        ..Item::new(id, id.to_uppercase())
    }
}

fn catalog() -> Vec<Item> {
    vec![
        game("zombie-1", "zombie shooter survival", 400, 4.2),
        game("zombie-2", "zombie survival crafting", 120, 4.0),
        game("dragon-1", "dragon kingdom strategy", 900, 4.6),
        game("dragon-2", "dragon kingdom castle", 50, 3.9),
        game("sudoku", "sudoku puzzle grid", 15, 4.9),
        game("kart", "racing kart drift", 3, 2.0),
    ]
}

async fn engine_over(items: Vec<Item>) -> (Engine, Arc<MemoryStore>) {
    let store = MemoryStore::with_items(items);
    let config = EngineConfig {
        snapshot: SnapshotConfig {
            chunk_size: 2,
            ..SnapshotConfig::default()
        },
        catalog_limit: None,
    };
    let engine = Engine::load(store.clone(), store.clone(), &config)
        .await
        .unwrap();
    (engine, store)
}

fn rating(item: &str, value: f64) -> UserRating {
    UserRating::now("player", item, value)
}

// ============================================================
// Fallback
// ============================================================

#[tokio::test]
async fn no_ratings_equals_popular() {
    let (engine, _) = engine_over(catalog()).await;
    let recs = engine.recommend(&[], 3).await;
    let popular = engine.popular(3).await;
    assert_eq!(recs, popular);
    assert_eq!(recs.source, RecommendationSource::Popular);
    assert_eq!(recs.ids(), vec!["dragon-1", "zombie-1", "zombie-2"]);
}

#[tokio::test]
async fn only_unknown_ratings_equals_popular() {
    let (engine, _) = engine_over(catalog()).await;
    let recs = engine.recommend(&[rating("not-in-catalog", 5.0)], 4).await;
    assert_eq!(recs, engine.popular(4).await);
    assert!(recs.source.is_fallback());
}

#[tokio::test]
async fn empty_catalog_gives_empty_answers() {
    let (engine, _) = engine_over(Vec::new()).await;
    assert!(!engine.is_ready());
    assert!(engine.popular(5).await.is_empty());
    assert!(engine.recommend(&[rating("anything", 4.0)], 5).await.is_empty());
}

// ============================================================
// Content-based ranking
// ============================================================

#[tokio::test]
async fn rated_items_are_excluded() {
    let (engine, _) = engine_over(catalog()).await;
    let ratings = [rating("zombie-1", 5.0), rating("sudoku", 2.0)];
    let recs = engine.recommend(&ratings, 10).await;
    assert_eq!(recs.source, RecommendationSource::ContentBased);
    assert!(!recs.ids().contains(&"zombie-1"));
    assert!(!recs.ids().contains(&"sudoku"));
}

#[tokio::test]
async fn result_is_bounded_by_top_n_and_unrated_count() {
    let (engine, _) = engine_over(catalog()).await;
    let ratings = [rating("zombie-1", 5.0), rating("dragon-1", 4.0)];

    let recs = engine.recommend(&ratings, 2).await;
    assert_eq!(recs.len(), 2);

    let recs = engine.recommend(&ratings, 100).await;
    assert_eq!(recs.len(), catalog().len() - ratings.len());
}

#[tokio::test]
async fn closest_content_ranks_first() {
    let (engine, _) = engine_over(catalog()).await;
    let recs = engine.recommend(&[rating("zombie-1", 5.0)], 3).await;
    assert_eq!(recs.ids()[0], "zombie-2");

    let recs = engine.recommend(&[rating("dragon-2", 5.0)], 3).await;
    assert_eq!(recs.ids()[0], "dragon-1");
}

#[tokio::test]
async fn action_shooter_scenario() {
    let items = vec![
        Item {
            description: Some("action shooter".into()),
            ..Item::new("A", "A")
        },
        Item {
            description: Some("action adventure".into()),
            ..Item::new("B", "B")
        },
        Item {
            description: Some("puzzle".into()),
            ..Item::new("C", "C")
        },
    ];
    let (engine, _) = engine_over(items).await;
    let recs = engine.recommend(&[rating("A", 5.0)], 5).await;
    assert_eq!(recs.ids(), vec!["B", "C"]);
}

#[tokio::test]
async fn rating_everything_yields_empty_content_answer() {
    let items = vec![
        game("a", "zombie shooter", 20, 4.0),
        game("b", "dragon kingdom", 20, 4.0),
    ];
    let (engine, _) = engine_over(items).await;
    let recs = engine
        .recommend(&[rating("a", 5.0), rating("b", 3.0)], 5)
        .await;
    assert!(recs.is_empty());
    assert_eq!(recs.source, RecommendationSource::ContentBased);
}

#[tokio::test]
async fn recommend_for_user_reads_ratings_from_store() {
    let (engine, _) = engine_over(catalog()).await;
    assert!(engine.record_rating("player", "dragon-2", 5.0).await);
    let recs = engine.recommend_for_user("player", 3).await;
    assert_eq!(recs.source, RecommendationSource::ContentBased);
    assert_eq!(recs.ids()[0], "dragon-1");
    assert!(!recs.ids().contains(&"dragon-2"));
}

// ============================================================
// Popularity
// ============================================================

#[tokio::test]
async fn popular_is_ordered_by_rating_count() {
    let (engine, _) = engine_over(catalog()).await;
    let popular = engine.popular(10).await;
    let counts: Vec<i64> = popular
        .items
        .iter()
        .map(|item| item.rating_count.unwrap_or(0))
        .collect();
    assert!(counts.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn popular_zero_is_empty() {
    let (engine, _) = engine_over(catalog()).await;
    assert!(engine.popular(0).await.is_empty());
}

#[test]
fn in_memory_popularity_applies_quality_floor() {
    let ranked = rank_in_memory(&catalog(), 10);
    let ids: Vec<&str> = ranked.iter().map(|item| item.id.as_str()).collect();
    // kart fails both thresholds; everything else clears 10 votes and 3.5
    assert_eq!(
        ids,
        vec!["dragon-1", "zombie-1", "zombie-2", "dragon-2", "sudoku"]
    );
}

// ============================================================
// Reloads
// ============================================================

/// Serves a shorter catalog on the first read, slowly, and the full
/// catalog on every read after that.
struct ShiftingCatalog {
    reads: AtomicUsize,
}

#[async_trait]
impl CatalogStore for ShiftingCatalog {
    async fn list_items(&self, _limit: Option<u32>) -> Result<Vec<Item>> {
        if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            return Ok(catalog()[..2].to_vec());
        }
        Ok(catalog())
    }

    async fn popular_items(&self, _limit: u32) -> Result<Vec<Item>> {
        Ok(Vec::new())
    }

    async fn item_by_id(&self, _id: &str) -> Result<Option<Item>> {
        Ok(None)
    }

    async fn item_by_name(&self, _name: &str) -> Result<Option<Item>> {
        Ok(None)
    }

    async fn search(&self, _query: &str, _page: u32, _per_page: u32) -> Result<(Vec<Item>, u64)> {
        Ok((Vec::new(), 0))
    }

    async fn items_by_genre(
        &self,
        _genre: &str,
        _page: u32,
        _per_page: u32,
    ) -> Result<(Vec<Item>, u64)> {
        Ok((Vec::new(), 0))
    }

    async fn genres(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn upsert_items(&self, _items: &[Item]) -> Result<usize> {
        Ok(0)
    }
}

#[tokio::test]
async fn overlapping_reloads_publish_in_read_order() {
    let catalog_store = Arc::new(ShiftingCatalog {
        reads: AtomicUsize::new(0),
    });
    let engine = Engine::new(
        catalog_store,
        Arc::new(MemoryStore::default()),
        &EngineConfig::default(),
    )
    .unwrap();

    // The first reload reads the stale catalog and is slow about it; the
    // second must not be overwritten by it.
    let (first, second) = tokio::join!(engine.reload(), engine.reload());
    assert_eq!(first.unwrap().items, 2);
    assert_eq!(second.unwrap().items, catalog().len());
    assert_eq!(engine.snapshot().len(), catalog().len());
}
