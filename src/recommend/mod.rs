// Recommendation layer: profile ranking, popularity fallback, and the engine
// that ties them to the repositories and the live snapshot.

pub mod engine;
pub mod popularity;
pub mod profile;

use serde::Serialize;

use crate::db::models::{Item, UserRating};

/// Where a ranked answer came from. Callers use this to tell a personalised
/// answer apart from a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Ranked by the user's similarity profile
    ContentBased,
    /// The catalog store's engagement-sorted query
    Popular,
    /// Store unavailable or empty; filtered in-memory ranking over the snapshot
    PopularInMemory,
}

impl RecommendationSource {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, RecommendationSource::ContentBased)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationSource::ContentBased => "content-based",
            RecommendationSource::Popular => "popular",
            RecommendationSource::PopularInMemory => "popular (in-memory fallback)",
        }
    }
}

impl std::fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered list of items plus how it was produced. An empty list is a
/// valid answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub items: Vec<Item>,
    pub source: RecommendationSource,
}

impl Recommendations {
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Where a lookup was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupSource {
    /// The catalog or interaction store answered
    Store,
    /// The store failed; the answer comes from the live snapshot
    Snapshot,
    /// The store failed and the snapshot has nothing to offer
    Unavailable,
}

impl LookupSource {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, LookupSource::Store)
    }
}

/// A lookup answer tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lookup<T> {
    pub value: T,
    pub source: LookupSource,
}

impl<T> Lookup<T> {
    pub fn store(value: T) -> Self {
        Self {
            value,
            source: LookupSource::Store,
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// One of a user's ratings together with the rated item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedItem {
    pub item: Item,
    pub rating: UserRating,
}
