// Database layer: repository traits plus the SQLite backend.
//
// The engine only sees the traits. The SQLite backend uses rusqlite with the
// "bundled" feature so there's no system SQLite dependency; the file lives
// wherever CARTRIDGE_DB_PATH points (defaults to ./cartridge.db).

pub mod models;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod queries;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use traits::{CatalogStore, InteractionStore};

#[cfg(feature = "sqlite")]
use anyhow::{Context, Result};
#[cfg(feature = "sqlite")]
use rusqlite::Connection;
#[cfg(feature = "sqlite")]
use std::path::Path;
#[cfg(feature = "sqlite")]
use std::sync::Arc;

/// Create the catalog database (and its directory) if missing, then make
/// sure every table exists. Used by `cartridge init` and `cartridge import`.
#[cfg(feature = "sqlite")]
pub fn initialize(db_path: &str) -> Result<Connection> {
    let dir = Path::new(db_path).parent().filter(|d| !d.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create {} for the catalog database", dir.display()))?;
    }
    let conn = connect(db_path)?;
    schema::create_tables(&conn)?;
    Ok(conn)
}

/// Open a catalog database that `initialize` already created.
#[cfg(feature = "sqlite")]
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!("No catalog database at {db_path}. Run `cartridge init` first.");
    }
    connect(db_path)
}

/// Readers (recommend, search) and the rating writer share the file, so
/// every connection runs in WAL mode.
#[cfg(feature = "sqlite")]
fn connect(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Cannot open catalog database {db_path}"))?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("Cannot switch catalog database to WAL mode")?;
    Ok(conn)
}

/// Create the database if needed and wrap it as a shared store.
#[cfg(feature = "sqlite")]
pub fn initialize_sqlite(db_path: &str) -> Result<Arc<sqlite::SqliteStore>> {
    Ok(Arc::new(sqlite::SqliteStore::new(initialize(db_path)?)))
}

/// Open an existing database and wrap it as a shared store.
#[cfg(feature = "sqlite")]
pub fn open_sqlite(db_path: &str) -> Result<Arc<sqlite::SqliteStore>> {
    Ok(Arc::new(sqlite::SqliteStore::new(open(db_path)?)))
}
