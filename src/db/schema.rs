// Database schema: table creation.
//
// A `schema_version` table records which schema revision created the file so
// future migrations have something to key off.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent; safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- The game catalog. `id` is the external identity (store URL).
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            developer TEXT,
            primary_genre TEXT,
            genres TEXT,                       -- comma-joined genre set
            average_rating REAL,
            rating_count INTEGER,
            icon_url TEXT
        );

        -- One row per (user, item); re-rating overwrites the value.
        CREATE TABLE IF NOT EXISTS ratings (
            user_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            value REAL NOT NULL,
            rated_at TEXT NOT NULL,            -- RFC 3339, UTC
            PRIMARY KEY (user_id, item_id)
        );

        -- Engagement-sorted popularity query
        CREATE INDEX IF NOT EXISTS idx_items_rating_count
            ON items(rating_count);

        -- Case-insensitive name lookup
        CREATE INDEX IF NOT EXISTS idx_items_name_nocase
            ON items(name COLLATE NOCASE);

        CREATE INDEX IF NOT EXISTS idx_items_primary_genre
            ON items(primary_genre);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // schema_version, items, ratings
        assert_eq!(table_count(&conn).unwrap(), 3i64);
    }

    #[test]
    fn test_schema_version_recorded_once() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(versions, vec![1]);
    }

    #[test]
    fn test_ratings_primary_key_rejects_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let insert = "INSERT INTO ratings (user_id, item_id, value, rated_at)
                      VALUES ('u1', 'a', 4.0, '2024-01-01T00:00:00Z')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
