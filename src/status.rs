// System status display: DB stats and the state of the catalog snapshot.

use anyhow::Result;
use std::path::Path;

use crate::db::sqlite::SqliteStore;
use crate::snapshot::SnapshotStats;

/// Display system status to the terminal.
pub async fn show(store: &SqliteStore, db_path: &str, snapshot: &SnapshotStats) -> Result<()> {
    let file_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_path, file_size);

    let items = store.item_count().await?;
    println!("Catalog: {} games", items);
    if items == 0 {
        println!("  Run `cartridge import <file.json>` to load a catalog");
    }

    let (users, ratings) = store.rating_totals().await?;
    println!("Ratings: {} from {} users", ratings, users);

    if snapshot.ready {
        println!(
            "Snapshot: {} games, {} terms, {} chunks of {} ({} stored similarities, built {})",
            snapshot.items,
            snapshot.vocabulary,
            snapshot.chunks,
            snapshot.chunk_size,
            snapshot.stored_entries,
            snapshot.built_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
    } else {
        println!("Snapshot: not ready (recommendations fall back to popularity)");
    }

    Ok(())
}

/// Check the database exists before trying to open it.
pub fn database_exists(db_path: &str) -> bool {
    Path::new(db_path).exists()
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
