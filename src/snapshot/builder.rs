// Chunked cosine similarity construction.
//
// The row axis is cut into chunks of `chunk_size` consecutive items. Each
// chunk is scored against the whole corpus independently and compressed into
// its own sparse block, so the largest thing alive during one chunk is that
// chunk's rows, never the full N×N product. Total storage is still O(N²) in
// the worst case (every pair sharing a term).
//
// Scoring goes through an inverted index (term → postings) so a row only
// touches items that share at least one term with it. Because every vector is
// unit length, the accumulated dot product is the cosine similarity.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, info};

use super::store::{SimilarityBatch, SimilarityStore};
use super::tfidf::FeatureVector;

/// Default number of rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct SimilarityBuilder {
    chunk_size: usize,
    parallel: bool,
}

impl SimilarityBuilder {
    /// A chunk size of zero is a configuration error.
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            anyhow::bail!("similarity chunk size must be at least 1");
        }
        Ok(Self {
            chunk_size,
            parallel: false,
        })
    }

    /// Score independent chunks on the rayon pool. Output is identical to
    /// the sequential build.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn build(&self, vectors: &[FeatureVector]) -> SimilarityStore {
        self.build_with_progress(vectors, |_, _| {})
    }

    /// Build the store, calling `progress(done, total)` after each chunk.
    pub fn build_with_progress<F>(&self, vectors: &[FeatureVector], progress: F) -> SimilarityStore
    where
        F: Fn(usize, usize) + Sync,
    {
        let n = vectors.len();
        if n == 0 {
            return SimilarityStore::empty();
        }

        let postings = build_postings(vectors);
        let starts: Vec<usize> = (0..n).step_by(self.chunk_size).collect();
        let total = starts.len();
        let done = AtomicUsize::new(0);

        let score_chunk = |start: usize| {
            let end = (start + self.chunk_size).min(n);
            let block = score_rows(vectors, &postings, start, end);
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(
                start,
                end,
                entries = block.stored_entries(),
                "Scored similarity chunk"
            );
            progress(finished, total);
            block
        };

        let blocks: Vec<SimilarityBatch> = if self.parallel {
            starts.into_par_iter().map(score_chunk).collect()
        } else {
            starts.into_iter().map(score_chunk).collect()
        };

        let store = SimilarityStore::from_blocks(n, self.chunk_size, blocks);
        info!(
            items = n,
            chunks = store.block_count(),
            stored_entries = store.stored_entries(),
            "Built similarity store"
        );
        store
    }
}

/// term index → [(item index, weight)], items ascending.
fn build_postings(vectors: &[FeatureVector]) -> Vec<Vec<(u32, f64)>> {
    let terms = vectors
        .iter()
        .filter_map(|v| v.entries().last().map(|(t, _)| *t as usize + 1))
        .max()
        .unwrap_or(0);
    let mut postings: Vec<Vec<(u32, f64)>> = vec![Vec::new(); terms];
    for (item, vector) in vectors.iter().enumerate() {
        for &(term, weight) in vector.entries() {
            postings[term as usize].push((item as u32, weight));
        }
    }
    postings
}

/// Score rows `start..end` against every item.
fn score_rows(
    vectors: &[FeatureVector],
    postings: &[Vec<(u32, f64)>],
    start: usize,
    end: usize,
) -> SimilarityBatch {
    let mut block = SimilarityBatch::with_start(start);
    let mut acc = vec![0.0f64; vectors.len()];
    let mut touched: Vec<u32> = Vec::new();

    for vector in &vectors[start..end] {
        for &(term, weight) in vector.entries() {
            for &(other, other_weight) in &postings[term as usize] {
                let slot = &mut acc[other as usize];
                if *slot == 0.0 {
                    touched.push(other);
                }
                *slot += weight * other_weight;
            }
        }

        touched.sort_unstable();
        touched.dedup();
        block.push_row(
            touched
                .iter()
                .map(|&col| (col, acc[col as usize]))
                .filter(|(_, value)| *value != 0.0),
        );
        for &col in &touched {
            acc[col as usize] = 0.0;
        }
        touched.clear();
    }

    block
}
