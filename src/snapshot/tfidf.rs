// TF-IDF vector space over composed feature text.
//
// Each item's feature string is one document. Words that appear in every
// item (e.g. "games") get downweighted by IDF, while words distinctive to a
// few items carry the similarity signal. The vocabulary is capped so vector
// dimensionality stays fixed no matter how large the catalog grows.
//
// Weighting:
//   tf   = raw count of the term in the document
//   idf  = ln((1 + n_docs) / (1 + df)) + 1
//   w    = tf * idf, then the whole vector is L2-normalised
//
// With unit-length vectors, cosine similarity is a plain dot product.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use regex::Regex;
use stop_words::{get, LANGUAGE};
use tracing::{debug, info};

/// Default vocabulary cap.
pub const DEFAULT_MAX_FEATURES: usize = 2000;

/// Tokens are runs of two or more Unicode word characters.
const TOKEN_PATTERN: &str = r"\b\w\w+\b";

/// A sparse, L2-normalised term-weight vector. Entries are sorted by term
/// index and contain no explicit zeros.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    entries: Vec<(u32, f64)>,
}

impl FeatureVector {
    /// Build from (term, weight) pairs; sorts and drops zero weights.
    pub fn from_entries(mut entries: Vec<(u32, f64)>) -> Self {
        entries.retain(|(_, w)| *w != 0.0);
        entries.sort_by_key(|(term, _)| *term);
        Self { entries }
    }

    pub fn entries(&self) -> &[(u32, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    /// Dot product by merge-joining the two sorted entry lists.
    pub fn dot(&self, other: &FeatureVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (ta, wa) = self.entries[i];
            let (tb, wb) = other.entries[j];
            match ta.cmp(&tb) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for (_, w) in &mut self.entries {
                *w /= norm;
            }
        }
    }
}

/// Lowercases, splits on the token pattern, and removes English stop words.
#[derive(Debug, Clone)]
struct Tokenizer {
    pattern: Regex,
    stop_words: HashSet<String>,
}

impl Tokenizer {
    fn english() -> Result<Self> {
        let pattern = Regex::new(TOKEN_PATTERN).context("Invalid token pattern")?;
        let stop_words: Vec<String> = get(LANGUAGE::English);
        Ok(Self {
            pattern,
            stop_words: stop_words.into_iter().collect(),
        })
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        self.pattern
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.contains(*token))
            .map(str::to_string)
            .collect()
    }
}

/// Fitting parameters for the TF-IDF model.
#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    max_features: usize,
    tokenizer: Tokenizer,
}

impl TfIdfVectorizer {
    /// Create a vectorizer with English stop words and the given vocabulary
    /// cap. A cap of zero is a configuration error.
    pub fn new(max_features: usize) -> Result<Self> {
        if max_features == 0 {
            anyhow::bail!("max_features must be at least 1");
        }
        Ok(Self {
            max_features,
            tokenizer: Tokenizer::english()?,
        })
    }

    /// Learn the vocabulary and IDF weights from `documents` and return the
    /// fitted model together with one vector per document, in input order.
    pub fn fit_transform<S: AsRef<str>>(self, documents: &[S]) -> (TfIdfModel, Vec<FeatureVector>) {
        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| self.tokenizer.tokenize(doc.as_ref()))
            .collect();

        // Corpus frequency (for the vocabulary cap) and document frequency
        // (for IDF) in one pass.
        let mut corpus_freq: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let mut seen: HashSet<&str> = HashSet::new();
            for token in tokens {
                *corpus_freq.entry(token.as_str()).or_insert(0) += 1;
                if seen.insert(token.as_str()) {
                    *doc_freq.entry(token.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(&str, usize)> = corpus_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let candidate_terms = ranked.len();
        ranked.truncate(self.max_features);

        // Term indices follow alphabetical order so the model is independent
        // of hash iteration order.
        let mut terms: Vec<String> = ranked.iter().map(|(t, _)| t.to_string()).collect();
        terms.sort();

        let n_docs = documents.len() as f64;
        let idf: Vec<f64> = terms
            .iter()
            .map(|t| {
                let df = doc_freq.get(t.as_str()).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let vocabulary: HashMap<String, u32> = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();

        let model = TfIdfModel {
            tokenizer: self.tokenizer,
            vocabulary,
            terms,
            idf,
        };

        let vectors: Vec<FeatureVector> = tokenized.iter().map(|t| model.weigh(t)).collect();
        let empty = vectors.iter().filter(|v| v.is_zero()).count();

        info!(
            documents = documents.len(),
            vocabulary = model.vocabulary_size(),
            candidate_terms,
            empty_vectors = empty,
            "Fitted TF-IDF model"
        );

        (model, vectors)
    }
}

/// A fitted TF-IDF model: vocabulary plus per-term IDF weights.
#[derive(Debug, Clone)]
pub struct TfIdfModel {
    tokenizer: Tokenizer,
    vocabulary: HashMap<String, u32>,
    terms: Vec<String>,
    idf: Vec<f64>,
}

impl TfIdfModel {
    /// Project new text into the fitted space. Out-of-vocabulary terms are
    /// ignored.
    pub fn transform(&self, text: &str) -> FeatureVector {
        self.weigh(&self.tokenizer.tokenize(text))
    }

    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    pub fn term(&self, index: u32) -> Option<&str> {
        self.terms.get(index as usize).map(String::as_str)
    }

    pub fn term_index(&self, term: &str) -> Option<u32> {
        self.vocabulary.get(term).copied()
    }

    /// Highest-weighted terms of a vector, for explaining a snapshot entry.
    pub fn top_terms(&self, vector: &FeatureVector, n: usize) -> Vec<(&str, f64)> {
        let mut weighted: Vec<(&str, f64)> = vector
            .entries()
            .iter()
            .filter_map(|&(t, w)| self.term(t).map(|term| (term, w)))
            .collect();
        weighted.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        weighted.truncate(n);
        weighted
    }

    fn weigh(&self, tokens: &[String]) -> FeatureVector {
        let mut counts: HashMap<u32, f64> = HashMap::new();
        for token in tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }
        let entries = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index as usize]))
            .collect();
        let mut vector = FeatureVector::from_entries(entries);
        vector.normalize();
        if vector.is_zero() {
            debug!(tokens = tokens.len(), "Document has no in-vocabulary terms");
        }
        vector
    }
}
