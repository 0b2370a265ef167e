// Catalog snapshots: one immutable build of index, vector model, and
// similarity store.
//
// Pipeline: items → CatalogIndex → FeatureComposer → TF-IDF → chunked
// similarity. A snapshot is never mutated after `SnapshotPipeline::build`
// returns; a reload builds a fresh one and the engine swaps it in.

pub mod builder;
pub mod features;
pub mod index;
pub mod store;
pub mod tfidf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::models::Item;
use builder::SimilarityBuilder;
use features::FeatureComposer;
use index::CatalogIndex;
use store::SimilarityStore;
use tfidf::{FeatureVector, TfIdfModel, TfIdfVectorizer};

/// Tunables for snapshot construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotConfig {
    pub chunk_size: usize,
    pub max_features: usize,
    pub description_chars: usize,
    pub parallel: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            chunk_size: builder::DEFAULT_CHUNK_SIZE,
            max_features: tfidf::DEFAULT_MAX_FEATURES,
            description_chars: features::DEFAULT_DESCRIPTION_CHARS,
            parallel: true,
        }
    }
}

/// Validated snapshot pipeline. Construction is the only place a snapshot
/// build can fail; `build` itself always produces a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotPipeline {
    composer: FeatureComposer,
    vectorizer: TfIdfVectorizer,
    similarity: SimilarityBuilder,
}

impl SnapshotPipeline {
    pub fn new(config: &SnapshotConfig) -> Result<Self> {
        Ok(Self {
            composer: FeatureComposer {
                description_chars: config.description_chars,
            },
            vectorizer: TfIdfVectorizer::new(config.max_features)?,
            similarity: SimilarityBuilder::new(config.chunk_size)?.with_parallel(config.parallel),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.similarity.chunk_size()
    }

    pub fn build(&self, items: Vec<Item>) -> Snapshot {
        self.build_with_progress(items, |_, _| {})
    }

    /// Build a snapshot, reporting `(chunks done, chunks total)` while the
    /// similarity store is computed.
    pub fn build_with_progress<F>(&self, items: Vec<Item>, progress: F) -> Snapshot
    where
        F: Fn(usize, usize) + Sync,
    {
        let index = CatalogIndex::build(items);
        if index.is_empty() {
            warn!("Catalog is empty; snapshot is not ready, queries will fall back");
            return Snapshot::empty();
        }

        let documents = self.composer.compose_all(index.items());
        let (model, vectors) = self.vectorizer.clone().fit_transform(&documents);
        let similarity = self.similarity.build_with_progress(&vectors, progress);

        let snapshot = Snapshot {
            index,
            model: Some(model),
            vectors,
            similarity,
            built_at: Utc::now(),
        };
        info!(
            items = snapshot.len(),
            vocabulary = snapshot.stats().vocabulary,
            "Catalog snapshot built"
        );
        snapshot
    }
}

#[derive(Debug)]
pub struct Snapshot {
    index: CatalogIndex,
    model: Option<TfIdfModel>,
    vectors: Vec<FeatureVector>,
    similarity: SimilarityStore,
    built_at: DateTime<Utc>,
}

/// Summary numbers for status output.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStats {
    pub ready: bool,
    pub items: usize,
    pub vocabulary: usize,
    pub chunk_size: usize,
    pub chunks: usize,
    pub stored_entries: usize,
    pub built_at: DateTime<Utc>,
}

impl Snapshot {
    /// The "not ready" snapshot: no items, no similarity blocks.
    pub fn empty() -> Self {
        Self {
            index: CatalogIndex::default(),
            model: None,
            vectors: Vec::new(),
            similarity: SimilarityStore::empty(),
            built_at: Utc::now(),
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.index.is_empty() && !self.similarity.is_empty()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &CatalogIndex {
        &self.index
    }

    pub fn similarity(&self) -> &SimilarityStore {
        &self.similarity
    }

    pub fn model(&self) -> Option<&TfIdfModel> {
        self.model.as_ref()
    }

    pub fn items(&self) -> &[Item] {
        self.index.items()
    }

    /// The strongest feature terms for an item, e.g. to explain why two
    /// games were considered similar.
    pub fn key_terms(&self, id: &str, n: usize) -> Vec<(&str, f64)> {
        let (Some(model), Some(idx)) = (self.model.as_ref(), self.index.idx_for(id)) else {
            return Vec::new();
        };
        self.vectors
            .get(idx)
            .map(|v| model.top_terms(v, n))
            .unwrap_or_default()
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            ready: self.is_ready(),
            items: self.len(),
            vocabulary: self.model.as_ref().map_or(0, TfIdfModel::vocabulary_size),
            chunk_size: self.similarity.chunk_size(),
            chunks: self.similarity.block_count(),
            stored_entries: self.similarity.stored_entries(),
            built_at: self.built_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: &str, genre: &str, description: &str) -> Item {
        Item {
            primary_genre: Some(genre.to_string()),
            description: Some(description.to_string()),
            ..Item::new(id, id.to_uppercase())
        }
    }

    #[test]
    fn test_pipeline_rejects_bad_config() {
        let bad_chunk = SnapshotConfig {
            chunk_size: 0,
            ..SnapshotConfig::default()
        };
        assert!(SnapshotPipeline::new(&bad_chunk).is_err());
        let bad_features = SnapshotConfig {
            max_features: 0,
            ..SnapshotConfig::default()
        };
        assert!(SnapshotPipeline::new(&bad_features).is_err());
    }

    #[test]
    fn test_empty_catalog_gives_unready_snapshot() {
        let pipeline = SnapshotPipeline::new(&SnapshotConfig::default()).unwrap();
        let snapshot = pipeline.build(Vec::new());
        assert!(!snapshot.is_ready());
        assert_eq!(snapshot.stats().chunks, 0);
        assert!(snapshot.similarity().row_for(0).is_none());
    }

    #[test]
    fn test_snapshot_is_index_aligned() {
        let pipeline = SnapshotPipeline::new(&SnapshotConfig {
            chunk_size: 2,
            ..SnapshotConfig::default()
        })
        .unwrap();
        let snapshot = pipeline.build(vec![
            game("a", "Shooter", "zombie survival"),
            game("b", "Strategy", "dragon kingdom"),
            game("a", "Duplicate", "ignored"),
            game("c", "Shooter", "zombie horde"),
        ]);
        assert!(snapshot.is_ready());
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.similarity().len(), 3);
        assert_eq!(snapshot.stats().chunks, 2);

        let a = snapshot.index().idx_for("a").unwrap();
        let c = snapshot.index().idx_for("c").unwrap();
        let b = snapshot.index().idx_for("b").unwrap();
        let row = snapshot.similarity().row_for(a).unwrap();
        assert!(row[c] > row[b]);
    }

    #[test]
    fn test_key_terms_for_known_and_unknown_items() {
        let pipeline = SnapshotPipeline::new(&SnapshotConfig::default()).unwrap();
        let snapshot = pipeline.build(vec![
            game("a", "Shooter", "zombie zombie survival"),
            game("b", "Strategy", "dragon kingdom"),
        ]);
        let terms = snapshot.key_terms("a", 1);
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].0, "zombie");
        assert!(snapshot.key_terms("missing", 3).is_empty());
    }
}
