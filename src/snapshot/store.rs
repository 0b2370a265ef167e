// SimilarityStore: the (conceptually N×N) cosine similarity matrix, kept as
// one sparse CSR block per row chunk.
//
// A row is addressed by its catalog index: block = idx / chunk_size,
// offset = idx % chunk_size. Blocks are never mutated after the builder hands
// them over, so the store is freely shared across threads.

/// One chunk of consecutive similarity rows in compressed sparse row form.
/// Column indices within a row are strictly increasing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityBatch {
    /// Catalog index of the first row in this batch
    pub(crate) start: usize,
    /// Row r's entries live in `indices/values[indptr[r]..indptr[r + 1]]`
    pub(crate) indptr: Vec<usize>,
    pub(crate) indices: Vec<u32>,
    pub(crate) values: Vec<f64>,
}

impl SimilarityBatch {
    pub(crate) fn with_start(start: usize) -> Self {
        Self {
            start,
            indptr: vec![0],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Append one row given as ascending (column, value) pairs.
    pub(crate) fn push_row(&mut self, row: impl IntoIterator<Item = (u32, f64)>) {
        for (col, value) in row {
            self.indices.push(col);
            self.values.push(value);
        }
        self.indptr.push(self.indices.len());
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn rows(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    pub fn stored_entries(&self) -> usize {
        self.values.len()
    }

    fn row_range(&self, offset: usize) -> Option<std::ops::Range<usize>> {
        if offset >= self.rows() {
            return None;
        }
        Some(self.indptr[offset]..self.indptr[offset + 1])
    }

    fn get(&self, offset: usize, col: usize) -> Option<f64> {
        let range = self.row_range(offset)?;
        let cols = &self.indices[range.clone()];
        Some(match cols.binary_search(&(col as u32)) {
            Ok(pos) => self.values[range.start + pos],
            Err(_) => 0.0,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityStore {
    len: usize,
    chunk_size: usize,
    blocks: Vec<SimilarityBatch>,
}

impl SimilarityStore {
    /// A store with no blocks; every lookup answers `None`.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_blocks(len: usize, chunk_size: usize, blocks: Vec<SimilarityBatch>) -> Self {
        Self {
            len,
            chunk_size,
            blocks,
        }
    }

    /// Number of rows (and columns).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[SimilarityBatch] {
        &self.blocks
    }

    /// Total non-zero entries across all blocks.
    pub fn stored_entries(&self) -> usize {
        self.blocks.iter().map(SimilarityBatch::stored_entries).sum()
    }

    fn locate(&self, idx: usize) -> Option<(&SimilarityBatch, usize)> {
        if self.blocks.is_empty() || idx >= self.len || self.chunk_size == 0 {
            return None;
        }
        let block = self.blocks.get(idx / self.chunk_size)?;
        Some((block, idx % self.chunk_size))
    }

    /// Materialise row `idx` as a dense vector of length `len()`.
    ///
    /// Returns `None` when the store has no blocks or `idx` is out of range.
    pub fn row_for(&self, idx: usize) -> Option<Vec<f64>> {
        let (block, offset) = self.locate(idx)?;
        let range = block.row_range(offset)?;
        let mut row = vec![0.0; self.len];
        for pos in range {
            row[block.indices[pos] as usize] = block.values[pos];
        }
        Some(row)
    }

    /// Add `weight * row(idx)` into `profile` without materialising the row.
    /// Returns false (and leaves `profile` untouched) if the row is absent or
    /// `profile` has the wrong length.
    pub fn accumulate_row(&self, idx: usize, weight: f64, profile: &mut [f64]) -> bool {
        if profile.len() != self.len {
            return false;
        }
        let Some((block, offset)) = self.locate(idx) else {
            return false;
        };
        let Some(range) = block.row_range(offset) else {
            return false;
        };
        for pos in range {
            profile[block.indices[pos] as usize] += block.values[pos] * weight;
        }
        true
    }

    /// Similarity between items `i` and `j`.
    pub fn similarity(&self, i: usize, j: usize) -> Option<f64> {
        if j >= self.len {
            return None;
        }
        let (block, offset) = self.locate(i)?;
        block.get(offset, j)
    }
}
