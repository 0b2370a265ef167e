// Colored terminal output for recommendation lists, item details, and
// catalog browsing. main.rs delegates all formatting here.

use colored::Colorize;

use crate::db::models::{Item, UserRating};
use crate::recommend::{LookupSource, RatedItem, RecommendationSource, Recommendations};

/// Display a ranked list of recommended (or popular) items.
pub fn display_recommendations(title: &str, recs: &Recommendations) {
    if recs.is_empty() {
        println!("No recommendations available. Import a catalog with `cartridge import` first.");
        return;
    }

    println!(
        "\n{}  {}",
        format!("=== {} ({} games) ===", title, recs.len()).bold(),
        colorize_source(recs.source)
    );
    println!();

    println!(
        "  {:>4}  {:<40} {:<18} {:>6}  {:>9}",
        "Rank".dimmed(),
        "Name".dimmed(),
        "Genre".dimmed(),
        "Rating".dimmed(),
        "Votes".dimmed(),
    );
    println!("  {}", "-".repeat(84).dimmed());

    for (i, item) in recs.items.iter().enumerate() {
        println!(
            "  {:>4}. {:<40} {:<18} {:>6}  {:>9}",
            i + 1,
            super::truncate_chars(&item.name, 37),
            super::truncate_chars(item.primary_genre.as_deref().unwrap_or("-"), 15),
            item.average_rating
                .map(|r| format!("{r:.1}"))
                .unwrap_or_else(|| "-".to_string()),
            item.rating_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    println!();
}

/// Display one item's full details, plus the feature terms that drive its
/// similarity when the snapshot knows it.
pub fn display_item_detail(item: &Item, key_terms: &[(&str, f64)]) {
    println!("\n{}", format!("=== {} ===", item.name).bold());
    println!("  Id: {}", item.id);
    if let Some(dev) = &item.developer {
        println!("  Developer: {dev}");
    }
    if let Some(genre) = &item.primary_genre {
        println!("  Primary genre: {genre}");
    }
    if let Some(genres) = &item.genres {
        println!("  Genres: {genres}");
    }
    match (item.average_rating, item.rating_count) {
        (Some(avg), Some(count)) => println!("  Rating: {avg:.1} from {count} votes"),
        (Some(avg), None) => println!("  Rating: {avg:.1}"),
        _ => println!("  Rating: {}", "not rated".dimmed()),
    }
    if let Some(description) = &item.description {
        println!("\n  {}", super::truncate_chars(description, 300).dimmed());
    }
    if !key_terms.is_empty() {
        let terms: Vec<String> = key_terms
            .iter()
            .map(|(term, weight)| format!("{term} ({weight:.2})"))
            .collect();
        println!("\n  Key terms: {}", terms.join(", "));
    }
    println!();
}

/// Display one page of search results.
pub fn display_search_results(query: &str, items: &[Item], total: u64, page: u32, per_page: u32) {
    if items.is_empty() {
        println!("No games match \"{query}\" on page {page}.");
        return;
    }
    let pages = total.div_ceil(u64::from(per_page.max(1)));
    println!(
        "\n{}",
        format!("=== \"{query}\": {total} matches (page {page} of {pages}) ===").bold()
    );
    for item in items {
        println!(
            "  {:<40} {}",
            super::truncate_chars(&item.name, 37),
            item.id.dimmed()
        );
    }
    println!();
}

/// Display a user's rated games, oldest rating first.
pub fn display_rated_items(user_id: &str, rated: &[RatedItem]) {
    if rated.is_empty() {
        println!("{user_id} hasn't rated any games yet.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Rated by {} ({} games) ===", user_id, rated.len()).bold()
    );
    println!();
    println!(
        "  {:<40} {:<18} {:>5}  {}",
        "Name".dimmed(),
        "Genre".dimmed(),
        "Stars".dimmed(),
        "Rated".dimmed(),
    );
    println!("  {}", "-".repeat(84).dimmed());

    for entry in rated {
        println!(
            "  {:<40} {:<18} {:>5.1}  {}",
            super::truncate_chars(&entry.item.name, 37),
            super::truncate_chars(entry.item.primary_genre.as_deref().unwrap_or("-"), 15),
            entry.rating.value,
            entry.rating.timestamp.format("%Y-%m-%d %H:%M"),
        );
    }
    println!();
}

/// One line with a user's own rating of the item being shown.
pub fn display_user_rating(user_id: &str, rating: Option<&UserRating>) {
    match rating {
        Some(r) => println!(
            "  {user_id} rated this {:.1} on {}",
            r.value,
            r.timestamp.format("%Y-%m-%d")
        ),
        None => println!("  {}", format!("{user_id} hasn't rated this").dimmed()),
    }
}

/// Warn when an answer didn't come from the store.
pub fn display_lookup_source(source: LookupSource) {
    match source {
        LookupSource::Store => {}
        LookupSource::Snapshot => println!(
            "{}",
            "(store unavailable, answered from the in-memory snapshot)".yellow()
        ),
        LookupSource::Unavailable => println!(
            "{}",
            "(store unavailable and no snapshot loaded)".bright_red()
        ),
    }
}

fn colorize_source(source: RecommendationSource) -> colored::ColoredString {
    match source {
        RecommendationSource::ContentBased => source.as_str().green(),
        RecommendationSource::Popular => source.as_str().yellow(),
        RecommendationSource::PopularInMemory => source.as_str().bright_red(),
    }
}
