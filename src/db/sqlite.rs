// SqliteStore: rusqlite backend implementing both repository traits.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{Item, UserRating};
use super::traits::{CatalogStore, InteractionStore};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    pub async fn item_count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        super::queries::item_count(&conn)
    }

    /// (distinct users, total ratings)
    pub async fn rating_totals(&self) -> Result<(u64, u64)> {
        let conn = self.conn.lock().await;
        super::queries::rating_totals(&conn)
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn list_items(&self, limit: Option<u32>) -> Result<Vec<Item>> {
        let conn = self.conn.lock().await;
        super::queries::list_items(&conn, limit)
    }

    async fn popular_items(&self, limit: u32) -> Result<Vec<Item>> {
        let conn = self.conn.lock().await;
        super::queries::popular_items(&conn, limit)
    }

    async fn item_by_id(&self, id: &str) -> Result<Option<Item>> {
        let conn = self.conn.lock().await;
        super::queries::item_by_id(&conn, id)
    }

    async fn item_by_name(&self, name: &str) -> Result<Option<Item>> {
        let conn = self.conn.lock().await;
        super::queries::item_by_name(&conn, name)
    }

    async fn search(&self, query: &str, page: u32, per_page: u32) -> Result<(Vec<Item>, u64)> {
        let conn = self.conn.lock().await;
        super::queries::search_items(&conn, query, page, per_page)
    }

    async fn items_by_genre(
        &self,
        genre: &str,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Item>, u64)> {
        let conn = self.conn.lock().await;
        super::queries::items_by_genre(&conn, genre, page, per_page)
    }

    async fn genres(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        super::queries::genres(&conn)
    }

    async fn upsert_items(&self, items: &[Item]) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::upsert_items(&conn, items)
    }
}

#[async_trait]
impl InteractionStore for SqliteStore {
    async fn get_ratings(&self, user_id: &str) -> Result<Vec<UserRating>> {
        let conn = self.conn.lock().await;
        super::queries::get_ratings(&conn, user_id)
    }

    async fn upsert_rating(&self, user_id: &str, item_id: &str, value: f64) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::upsert_rating(&conn, user_id, item_id, value, Utc::now())
    }
}
