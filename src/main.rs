use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use cartridge::config::Config;
use cartridge::db::models::{parse_rating_value, Item};
use cartridge::db::sqlite::SqliteStore;
use cartridge::db::CatalogStore;
use cartridge::output::terminal;
use cartridge::Engine;

/// Cartridge: content-based game recommendations.
///
/// Builds a TF-IDF similarity model over your game catalog and recommends
/// games from a user's ratings, falling back to popularity when there is
/// nothing to go on.
#[derive(Parser)]
#[command(name = "cartridge", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Load catalog items from a JSON array (snake_case or raw column names)
    Import {
        /// Path to the JSON file
        path: String,
    },

    /// Recommend games for a user based on their ratings
    Recommend {
        user: String,

        /// How many games to show (default: CARTRIDGE_DEFAULT_RECOMMENDATIONS)
        #[arg(long)]
        top: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the most popular games
    Popular {
        #[arg(long)]
        top: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Record a user's rating for a game
    Rate {
        user: String,
        /// The game's identifier
        item: String,
        /// Stars, 1 to 5
        #[arg(value_parser = parse_rating_value, allow_negative_numbers = true)]
        value: f64,
    },

    /// List the games a user has rated, with their ratings
    Ratings {
        user: String,

        #[arg(long)]
        json: bool,
    },

    /// Show one game's details
    Show {
        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        id: Option<String>,

        /// Case-insensitive name
        #[arg(long)]
        name: Option<String>,

        /// Also show this user's rating of the game
        #[arg(long)]
        user: Option<String>,
    },

    /// Search games by name, developer, or genre
    Search {
        query: String,

        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "12")]
        per_page: u32,
    },

    /// List primary genres, or the games in one genre
    Genres {
        /// Show games in this genre instead of listing genres
        #[arg(long)]
        genre: Option<String>,

        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "12")]
        per_page: u32,
    },

    /// Show system status (DB stats, snapshot size)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cartridge=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Init => {
            info!("Initializing Cartridge database...");
            let store = cartridge::db::initialize_sqlite(&config.db_path)?;
            let table_count = store.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext step: cargo run -- import games.json");
        }

        Commands::Import { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read catalog file {path}"))?;
            let items: Vec<Item> = serde_json::from_str(&raw)
                .with_context(|| format!("{path} is not a JSON array of games"))?;

            let store = cartridge::db::initialize_sqlite(&config.db_path)?;
            let written = store.upsert_items(&items).await?;
            println!("{} {written} games imported from {path}", "✓".green());

            // Build once so configuration or data problems surface now
            let engine = load_engine(&config, &store).await?;
            let stats = engine.stats();
            println!(
                "Snapshot: {} games, {} terms, {} chunks",
                stats.items, stats.vocabulary, stats.chunks
            );
        }

        Commands::Recommend { user, top, json } => {
            let store = cartridge::db::open_sqlite(&config.db_path)?;
            let engine = load_engine(&config, &store).await?;
            let top_n = top.unwrap_or(config.default_recommendations);
            let recs = engine.recommend_for_user(&user, top_n).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&recs)?);
            } else {
                terminal::display_recommendations(&format!("Recommended for {user}"), &recs);
            }
        }

        Commands::Popular { top, json } => {
            let store = cartridge::db::open_sqlite(&config.db_path)?;
            let engine = load_engine(&config, &store).await?;
            let top_n = top.unwrap_or(config.default_recommendations);
            let recs = engine.popular(top_n).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&recs)?);
            } else {
                terminal::display_recommendations("Popular games", &recs);
            }
        }

        Commands::Rate { user, item, value } => {
            let store = cartridge::db::open_sqlite(&config.db_path)?;
            // No snapshot needed: identifier resolution goes to the store first
            let engine = Engine::new(store.clone(), store, &config.engine_config())?;
            if engine.find_by_identifier(&item).await.value.is_none() {
                println!("{} Unknown game: {item}", "✗".red());
            } else if engine.record_rating(&user, &item, value).await {
                println!("{} Rating saved: {user} rated {item} {value}", "✓".green());
            } else {
                println!("{} Could not save rating for {item}", "✗".red());
            }
        }

        Commands::Ratings { user, json } => {
            let store = cartridge::db::open_sqlite(&config.db_path)?;
            let engine = load_engine(&config, &store).await?;
            let rated = engine.rated_items(&user).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&rated)?);
            } else {
                terminal::display_lookup_source(rated.source);
                terminal::display_rated_items(&user, &rated.value);
            }
        }

        Commands::Show { id, name, user } => {
            let store = cartridge::db::open_sqlite(&config.db_path)?;
            let engine = load_engine(&config, &store).await?;
            let found = match (id, name) {
                (Some(id), _) => engine.find_by_identifier(&id).await,
                (None, Some(name)) => engine.find_by_name(&name).await,
                (None, None) => return Ok(()),
            };
            terminal::display_lookup_source(found.source);
            let Some(item) = found.value else {
                println!("No such game.");
                return Ok(());
            };
            let snapshot = engine.snapshot();
            terminal::display_item_detail(&item, &snapshot.key_terms(&item.id, 8));
            if let Some(user) = user {
                let rating = engine.rating_for(&user, &item.id).await;
                terminal::display_user_rating(&user, rating.value.as_ref());
                println!();
            }
        }

        Commands::Search {
            query,
            page,
            per_page,
        } => {
            let store = cartridge::db::open_sqlite(&config.db_path)?;
            let engine = Engine::new(store.clone(), store, &config.engine_config())?;
            let found = engine.search(&query, page, per_page).await;
            terminal::display_lookup_source(found.source);
            let (items, total) = found.value;
            terminal::display_search_results(&query, &items, total, page, per_page);
        }

        Commands::Genres {
            genre,
            page,
            per_page,
        } => {
            let store = cartridge::db::open_sqlite(&config.db_path)?;
            let engine = Engine::new(store.clone(), store, &config.engine_config())?;
            match genre {
                Some(genre) => {
                    let found = engine.items_by_genre(&genre, page, per_page).await;
                    terminal::display_lookup_source(found.source);
                    let (items, total) = found.value;
                    terminal::display_search_results(&genre, &items, total, page, per_page);
                }
                None => {
                    let listed = engine.genres().await;
                    terminal::display_lookup_source(listed.source);
                    let genres = listed.value;
                    if genres.is_empty() {
                        println!("No genres yet. Import a catalog first.");
                    }
                    for genre in genres {
                        println!("  {genre}");
                    }
                }
            }
        }

        Commands::Status => {
            if !cartridge::status::database_exists(&config.db_path) {
                println!("Database: not initialized");
                println!("\nRun `cartridge init` to set up the database.");
                return Ok(());
            }
            let store = cartridge::db::open_sqlite(&config.db_path)?;
            let engine = load_engine(&config, &store).await?;
            cartridge::status::show(&store, &config.db_path, &engine.stats()).await?;
        }
    }

    Ok(())
}

/// Build the engine and its first snapshot, with a progress bar over the
/// similarity chunks.
async fn load_engine(config: &Config, store: &Arc<SqliteStore>) -> Result<Engine> {
    let engine = Engine::new(store.clone(), store.clone(), &config.engine_config())?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("  Building similarity {bar:30} {pos}/{len} chunks")
            .context("Invalid progress bar template")?,
    );
    let progress = bar.clone();
    engine
        .reload_with_progress(move |done, total| {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
        })
        .await?;
    bar.finish_and_clear();

    Ok(engine)
}
