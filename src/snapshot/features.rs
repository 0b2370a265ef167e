// Feature text composition.
//
// Each item becomes one string: primary genre, genre set, the head of the
// description, then the developer. The order is fixed and the description is
// cut to `description_chars` characters, which keeps long store blurbs from
// drowning out the genre terms.

use crate::db::models::Item;

/// Default description budget, in characters.
pub const DEFAULT_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct FeatureComposer {
    pub description_chars: usize,
}

impl Default for FeatureComposer {
    fn default() -> Self {
        Self {
            description_chars: DEFAULT_DESCRIPTION_CHARS,
        }
    }
}

impl FeatureComposer {
    /// Compose the feature text for one item. Missing fields contribute an
    /// empty string, so separators are always present.
    pub fn compose(&self, item: &Item) -> String {
        let description: String = item
            .description
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(self.description_chars)
            .collect();

        [
            item.primary_genre.as_deref().unwrap_or_default(),
            item.genres.as_deref().unwrap_or_default(),
            description.as_str(),
            item.developer.as_deref().unwrap_or_default(),
        ]
        .join(" ")
    }

    pub fn compose_all(&self, items: &[Item]) -> Vec<String> {
        items.iter().map(|item| self.compose(item)).collect()
    }
}
