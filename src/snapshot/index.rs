// CatalogIndex: dense positional indices over a deduplicated catalog read.
//
// Every other snapshot structure (feature vectors, similarity rows, profile
// vectors) is addressed by the `idx` handed out here, so the mapping must stay
// a bijection for the lifetime of the snapshot. The index also owns the items
// themselves, which makes it the row store used to hydrate results.

use std::collections::HashMap;

use tracing::warn;

use crate::db::models::Item;

#[derive(Debug, Default)]
pub struct CatalogIndex {
    items: Vec<Item>,
    positions: HashMap<String, usize>,
}

impl CatalogIndex {
    /// Index items in iteration order. Duplicate identifiers keep the first
    /// occurrence; items with an empty identifier are dropped.
    pub fn build(items: impl IntoIterator<Item = Item>) -> Self {
        let mut index = Self::default();
        let mut duplicates = 0usize;
        let mut missing_id = 0usize;

        for item in items {
            if item.id.trim().is_empty() {
                missing_id += 1;
                continue;
            }
            if index.positions.contains_key(&item.id) {
                duplicates += 1;
                continue;
            }
            index.positions.insert(item.id.clone(), index.items.len());
            index.items.push(item);
        }

        if duplicates > 0 {
            warn!(duplicates, "Dropped duplicate catalog identifiers (first occurrence kept)");
        }
        if missing_id > 0 {
            warn!(missing_id, "Dropped catalog items without an identifier");
        }

        index
    }

    pub fn id_for(&self, idx: usize) -> Option<&str> {
        self.items.get(idx).map(|item| item.id.as_str())
    }

    pub fn idx_for(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn item(&self, idx: usize) -> Option<&Item> {
        self.items.get(idx)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_assigns_dense_indices_in_order() {
        let index = CatalogIndex::build(vec![
            Item::new("x", "X"),
            Item::new("y", "Y"),
            Item::new("z", "Z"),
        ]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.idx_for("x"), Some(0));
        assert_eq!(index.idx_for("z"), Some(2));
        assert_eq!(index.id_for(1), Some("y"));
        assert_eq!(index.id_for(3), None);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let index = CatalogIndex::build(vec![
            Item::new("a", "First"),
            Item::new("b", "B"),
            Item::new("a", "Second"),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.item(0).unwrap().name, "First");
        assert_eq!(index.idx_for("b"), Some(1));
    }

    #[test]
    fn test_blank_identifiers_are_dropped() {
        let index = CatalogIndex::build(vec![Item::new("", "Nameless"), Item::new("a", "A")]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.idx_for("a"), Some(0));
    }

    #[test]
    fn test_empty_input_gives_empty_index() {
        let index = CatalogIndex::build(Vec::new());
        assert!(index.is_empty());
        assert_eq!(index.idx_for("anything"), None);
    }

    #[test]
    fn test_mapping_is_a_bijection() {
        let items: Vec<Item> = (0..50)
            .map(|i| Item::new(format!("id-{}", i % 37), format!("Game {i}")))
            .collect();
        let index = CatalogIndex::build(items);
        assert_eq!(index.len(), 37);
        for idx in 0..index.len() {
            let id = index.id_for(idx).unwrap();
            assert_eq!(index.idx_for(id), Some(idx));
        }
    }
}
