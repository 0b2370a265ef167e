// Database queries: CRUD operations for the catalog and ratings tables.
//
// Every SQL statement lives in this module. The rest of the crate sees plain
// Rust functions that take a Connection and return models.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{Item, UserRating};

const ITEM_COLUMNS: &str = "id, name, description, developer, primary_genre, genres,
                            average_rating, rating_count, icon_url";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        developer: row.get(3)?,
        primary_genre: row.get(4)?,
        genres: row.get(5)?,
        average_rating: row.get(6)?,
        rating_count: row.get(7)?,
        icon_url: row.get(8)?,
    })
}

/// Page numbers are 1-based; page 0 is treated as page 1.
fn page_offset(page: u32, per_page: u32) -> i64 {
    i64::from(page.max(1) - 1) * i64::from(per_page)
}

// --- Catalog ---

/// Insert or replace catalog items. Existing rows keep their position in
/// catalog order, so a re-import does not reshuffle snapshot indices.
pub fn upsert_items(conn: &Connection, items: &[Item]) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start catalog import transaction")?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO items (id, name, description, developer, primary_genre, genres,
                                average_rating, rating_count, icon_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                name = ?2,
                description = ?3,
                developer = ?4,
                primary_genre = ?5,
                genres = ?6,
                average_rating = ?7,
                rating_count = ?8,
                icon_url = ?9",
        )?;
        for item in items {
            stmt.execute(params![
                item.id,
                item.name,
                item.description,
                item.developer,
                item.primary_genre,
                item.genres,
                item.average_rating,
                item.rating_count,
                item.icon_url,
            ])?;
        }
    }
    tx.commit()?;
    Ok(items.len())
}

/// All items in catalog (insertion) order, optionally limited.
pub fn list_items(conn: &Connection, limit: Option<u32>) -> Result<Vec<Item>> {
    // SQLite treats a negative LIMIT as "no limit"
    let limit = limit.map_or(-1, i64::from);
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM items ORDER BY rowid LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], item_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Items ordered by engagement (rating count descending). NULL counts sort
/// last; equal counts keep catalog order.
pub fn popular_items(conn: &Connection, limit: u32) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM items
         ORDER BY rating_count DESC, rowid ASC
         LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], item_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Look up one item by its external identifier.
pub fn item_by_id(conn: &Connection, id: &str) -> Result<Option<Item>> {
    let mut stmt = conn.prepare(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"))?;
    Ok(stmt.query_row(params![id], item_from_row).optional()?)
}

/// Look up one item by display name, ignoring ASCII case. When several items
/// share a name the earliest in catalog order wins.
pub fn item_by_name(conn: &Connection, name: &str) -> Result<Option<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM items
         WHERE name = ?1 COLLATE NOCASE
         ORDER BY rowid
         LIMIT 1"
    ))?;
    Ok(stmt.query_row(params![name], item_from_row).optional()?)
}

/// Substring search over name, developer, and genres. Returns one page of
/// matches plus the total match count.
pub fn search_items(
    conn: &Connection,
    query: &str,
    page: u32,
    per_page: u32,
) -> Result<(Vec<Item>, u64)> {
    let needle = query.to_lowercase();
    let filter = "instr(lower(name), ?1) > 0
                  OR instr(lower(developer), ?1) > 0
                  OR instr(lower(primary_genre), ?1) > 0
                  OR instr(lower(genres), ?1) > 0";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM items WHERE {filter}"),
        params![needle],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE {filter}
         ORDER BY rowid
         LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(
        params![needle, per_page, page_offset(page, per_page)],
        item_from_row,
    )?;
    let items = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((items, total.max(0) as u64))
}

/// One page of items whose primary genre matches exactly, plus the total.
pub fn items_by_genre(
    conn: &Connection,
    genre: &str,
    page: u32,
    per_page: u32,
) -> Result<(Vec<Item>, u64)> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM items WHERE primary_genre = ?1",
        params![genre],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE primary_genre = ?1
         ORDER BY rowid
         LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(
        params![genre, per_page, page_offset(page, per_page)],
        item_from_row,
    )?;
    let items = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((items, total.max(0) as u64))
}

/// Distinct primary genres, sorted.
pub fn genres(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT primary_genre FROM items
         WHERE primary_genre IS NOT NULL AND primary_genre != ''
         ORDER BY primary_genre",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
}

pub fn item_count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

// --- Ratings ---

/// All ratings a user has given, oldest first.
pub fn get_ratings(conn: &Connection, user_id: &str) -> Result<Vec<UserRating>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, item_id, value, rated_at FROM ratings
         WHERE user_id = ?1
         ORDER BY rated_at, rowid",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        let rated_at: String = row.get(3)?;
        let timestamp = DateTime::parse_from_rfc3339(&rated_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })?;
        Ok(UserRating {
            user_id: row.get(0)?,
            item_id: row.get(1)?,
            value: row.get(2)?,
            timestamp,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Save or overwrite a user's rating for an item (last write wins).
pub fn upsert_rating(
    conn: &Connection,
    user_id: &str,
    item_id: &str,
    value: f64,
    rated_at: DateTime<Utc>,
) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO ratings (user_id, item_id, value, rated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id, item_id) DO UPDATE SET value = ?3, rated_at = ?4",
        params![user_id, item_id, value, rated_at.to_rfc3339()],
    )?;
    Ok(changed > 0)
}

/// (distinct users, total ratings); for the status display.
pub fn rating_totals(conn: &Connection) -> Result<(u64, u64)> {
    let (users, ratings): (i64, i64) = conn.query_row(
        "SELECT COUNT(DISTINCT user_id), COUNT(*) FROM ratings",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((users.max(0) as u64, ratings.max(0) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn game(id: &str, name: &str, genre: &str, count: Option<i64>) -> Item {
        Item {
            primary_genre: Some(genre.to_string()),
            genres: Some(format!("Games, {genre}")),
            developer: Some("Acme Studio".to_string()),
            rating_count: count,
            average_rating: Some(4.0),
            ..Item::new(id, name)
        }
    }

    #[test]
    fn test_list_items_preserves_insertion_order() {
        let conn = setup();
        upsert_items(
            &conn,
            &[
                game("c", "Chess", "Board", Some(5)),
                game("a", "Arkanoid", "Arcade", Some(50)),
                game("b", "Bejeweled", "Puzzle", Some(500)),
            ],
        )
        .unwrap();
        let ids: Vec<String> = list_items(&conn, None).unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(list_items(&conn, Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_upsert_items_keeps_position_on_update() {
        let conn = setup();
        upsert_items(&conn, &[game("a", "A", "Arcade", Some(1)), game("b", "B", "Puzzle", Some(2))])
            .unwrap();
        upsert_items(&conn, &[game("a", "A2", "Arcade", Some(9))]).unwrap();
        let items = list_items(&conn, None).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "A2");
        assert_eq!(items[0].rating_count, Some(9));
    }

    #[test]
    fn test_popular_items_sorts_by_count_nulls_last() {
        let conn = setup();
        upsert_items(
            &conn,
            &[
                game("none", "None", "Arcade", None),
                game("low", "Low", "Arcade", Some(3)),
                game("high", "High", "Arcade", Some(300)),
            ],
        )
        .unwrap();
        let ids: Vec<String> = popular_items(&conn, 10).unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["high", "low", "none"]);
    }

    #[test]
    fn test_item_by_name_is_case_insensitive() {
        let conn = setup();
        upsert_items(&conn, &[game("a", "Space Invaders", "Arcade", Some(1))]).unwrap();
        let found = item_by_name(&conn, "space INVADERS").unwrap().unwrap();
        assert_eq!(found.id, "a");
        assert!(item_by_name(&conn, "pac-man").unwrap().is_none());
    }

    #[test]
    fn test_search_paginates_and_counts() {
        let conn = setup();
        let items: Vec<Item> = (0..5)
            .map(|i| game(&format!("p{i}"), &format!("Puzzle Quest {i}"), "Puzzle", Some(i)))
            .chain(std::iter::once(game("x", "Racer", "Racing", Some(1))))
            .collect();
        upsert_items(&conn, &items).unwrap();

        let (page1, total) = search_items(&conn, "PUZZLE", 1, 2).unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        let (page3, _) = search_items(&conn, "puzzle", 3, 2).unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].id, "p4");
    }

    #[test]
    fn test_genres_and_items_by_genre() {
        let conn = setup();
        upsert_items(
            &conn,
            &[
                game("a", "A", "Strategy", Some(1)),
                game("b", "B", "Puzzle", Some(1)),
                game("c", "C", "Strategy", Some(1)),
            ],
        )
        .unwrap();
        assert_eq!(genres(&conn).unwrap(), vec!["Puzzle", "Strategy"]);
        let (items, total) = items_by_genre(&conn, "Strategy", 1, 10).unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_upsert_rating_last_write_wins() {
        let conn = setup();
        upsert_rating(&conn, "u1", "a", 3.0, Utc::now()).unwrap();
        upsert_rating(&conn, "u1", "a", 5.0, Utc::now()).unwrap();
        upsert_rating(&conn, "u1", "b", 1.0, Utc::now()).unwrap();
        let ratings = get_ratings(&conn, "u1").unwrap();
        assert_eq!(ratings.len(), 2);
        let a = ratings.iter().find(|r| r.item_id == "a").unwrap();
        assert_eq!(a.value, 5.0);
        assert_eq!(rating_totals(&conn).unwrap(), (1, 2));
    }

    #[test]
    fn test_get_ratings_unknown_user_is_empty() {
        let conn = setup();
        assert!(get_ratings(&conn, "nobody").unwrap().is_empty());
    }
}
