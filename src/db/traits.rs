// Repository traits: the narrow read/write contracts the engine depends on.
//
// The engine is handed `Arc<dyn CatalogStore>` and `Arc<dyn InteractionStore>`
// at construction and never reaches for a concrete backend. All methods are
// async so a sync backend (rusqlite behind a Mutex) and a native async one fit
// behind the same interface.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{Item, UserRating};

/// Read access to the game catalog (plus a bulk write used for seeding).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All items in catalog order, optionally limited.
    async fn list_items(&self, limit: Option<u32>) -> Result<Vec<Item>>;

    /// Items ordered by engagement (rating count descending).
    async fn popular_items(&self, limit: u32) -> Result<Vec<Item>>;

    /// The one canonical identifier lookup.
    async fn item_by_id(&self, id: &str) -> Result<Option<Item>>;

    /// Case-insensitive exact name lookup.
    async fn item_by_name(&self, name: &str) -> Result<Option<Item>>;

    /// Substring search; returns one page and the total match count.
    async fn search(&self, query: &str, page: u32, per_page: u32) -> Result<(Vec<Item>, u64)>;

    /// One page of items with the given primary genre, and the total.
    async fn items_by_genre(&self, genre: &str, page: u32, per_page: u32)
        -> Result<(Vec<Item>, u64)>;

    /// Distinct primary genres, sorted.
    async fn genres(&self) -> Result<Vec<String>>;

    /// Insert or update items; returns how many were written.
    async fn upsert_items(&self, items: &[Item]) -> Result<usize>;
}

/// The user ratings store. Ratings are read fresh on every request.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn get_ratings(&self, user_id: &str) -> Result<Vec<UserRating>>;

    /// Idempotent per (user, item); last write wins.
    async fn upsert_rating(&self, user_id: &str, item_id: &str, value: f64) -> Result<bool>;
}
