// Cartridge: content-based game recommendations
//
// This is the library root. `snapshot` turns a catalog read into an immutable
// similarity model, `recommend` ranks against it, and `db` holds the
// repository traits plus the SQLite backend.

pub mod config;
pub mod db;
pub mod output;
pub mod recommend;
pub mod snapshot;

#[cfg(feature = "sqlite")]
pub mod status;

pub use recommend::engine::{Engine, EngineConfig};
pub use recommend::{Lookup, LookupSource, RatedItem, RecommendationSource, Recommendations};
