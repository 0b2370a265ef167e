// Data models: Rust structs that map to database rows.
//
// These are the types that flow through the engine. They're separate from
// the queries so the similarity and ranking code can use them without
// depending on rusqlite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog entry (a game).
///
/// `id` is the external identity (the store page URL in the source data).
/// Text fields are optional because the catalog is allowed to be sparse;
/// the feature composer treats a missing field as an empty string.
///
/// The serde aliases accept the column names used by the raw game dumps, so
/// an `import` file can be either snake_case or the raw dump headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(alias = "URL")]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Description")]
    pub description: Option<String>,
    #[serde(default, alias = "Developer")]
    pub developer: Option<String>,
    #[serde(default, alias = "Primary Genre")]
    pub primary_genre: Option<String>,
    /// Comma-joined genre set, e.g. "Games, Strategy, Puzzle"
    #[serde(default, alias = "Genres")]
    pub genres: Option<String>,
    #[serde(default, alias = "Average User Rating")]
    pub average_rating: Option<f64>,
    #[serde(default, alias = "User Rating Count")]
    pub rating_count: Option<i64>,
    /// Display only; never part of the feature text
    #[serde(default, alias = "Icon URL")]
    pub icon_url: Option<String>,
}

impl Item {
    /// Minimal item with only identity and name set. Handy for tests and
    /// for callers that fill in attributes with struct update syntax.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            developer: None,
            primary_genre: None,
            genres: None,
            average_rating: None,
            rating_count: None,
            icon_url: None,
        }
    }
}

/// Lowest and highest star values a rating may carry.
pub const MIN_RATING_VALUE: f64 = 1.0;
pub const MAX_RATING_VALUE: f64 = 5.0;

/// One rating a user gave an item. The value domain is validated by the
/// caller (see `parse_rating_value`); the engine treats it as an opaque
/// weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRating {
    pub user_id: String,
    pub item_id: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl UserRating {
    /// Build a rating stamped with the current time.
    pub fn now(user_id: impl Into<String>, item_id: impl Into<String>, value: f64) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            value,
            timestamp: Utc::now(),
        }
    }
}

/// Parse a star rating from user input. Accepts finite numbers in
/// `MIN_RATING_VALUE..=MAX_RATING_VALUE`.
pub fn parse_rating_value(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{raw:?} is not a number"))?;
    if !value.is_finite() || !(MIN_RATING_VALUE..=MAX_RATING_VALUE).contains(&value) {
        return Err(format!(
            "rating must be between {MIN_RATING_VALUE} and {MAX_RATING_VALUE}, got {raw}"
        ));
    }
    Ok(value)
}
