use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::recommend::engine::EngineConfig;
use crate::snapshot::builder::DEFAULT_CHUNK_SIZE;
use crate::snapshot::features::DEFAULT_DESCRIPTION_CHARS;
use crate::snapshot::tfidf::DEFAULT_MAX_FEATURES;
use crate::snapshot::SnapshotConfig;

/// Catalog items read per snapshot unless CARTRIDGE_MAX_ITEMS says otherwise.
pub const DEFAULT_MAX_ITEMS: u32 = 5000;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Every
/// variable has a default, so a bare `cartridge status` works out of the box.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: String,
    /// Catalog read limit per snapshot; `None` reads everything (CARTRIDGE_MAX_ITEMS=0)
    pub max_items: Option<u32>,
    pub chunk_size: usize,
    pub max_features: usize,
    pub description_chars: usize,
    /// Score similarity chunks on the rayon pool
    pub parallel: bool,
    /// How many items `recommend` and `popular` show when --top isn't given
    pub default_recommendations: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let max_items: u32 = parse_var("CARTRIDGE_MAX_ITEMS", DEFAULT_MAX_ITEMS)?;

        Ok(Self {
            db_path: env::var("CARTRIDGE_DB_PATH").unwrap_or_else(|_| "./cartridge.db".to_string()),
            max_items: (max_items > 0).then_some(max_items),
            chunk_size: parse_var("CARTRIDGE_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            max_features: parse_var("CARTRIDGE_MAX_FEATURES", DEFAULT_MAX_FEATURES)?,
            description_chars: parse_var("CARTRIDGE_DESCRIPTION_CHARS", DEFAULT_DESCRIPTION_CHARS)?,
            parallel: parse_flag("CARTRIDGE_PARALLEL", true)?,
            default_recommendations: parse_var("CARTRIDGE_DEFAULT_RECOMMENDATIONS", 12)?,
        })
    }

    /// The engine-facing subset. Range checks (chunk size, vocabulary cap)
    /// happen when the engine is constructed.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            snapshot: SnapshotConfig {
                chunk_size: self.chunk_size,
                max_features: self.max_features,
                description_chars: self.description_chars,
                parallel: self.parallel,
            },
            catalog_limit: self.max_items,
        }
    }
}

/// Parse a numeric env var, using `default` when it's unset or blank.
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a non-negative integer, got {raw:?}")),
        _ => Ok(default),
    }
}

fn parse_flag(name: &str, default: bool) -> Result<bool> {
    match env::var(name).as_deref().map(str::trim) {
        Ok("1") | Ok("true") | Ok("yes") | Ok("on") => Ok(true),
        Ok("0") | Ok("false") | Ok("no") | Ok("off") => Ok(false),
        Ok("") | Err(_) => Ok(default),
        Ok(other) => anyhow::bail!("{name} must be true or false, got {other:?}"),
    }
}
