//! Sorted-set score stores.
//!
//! A `ScoreStore` keeps, per key, a collection of members ordered by a numeric
//! score. The engine only needs three primitives from it: an atomic increment,
//! a weighted union into a destination key, and a descending range read.
//! Equal scores are ranked by member in descending byte order in every backend.

pub mod memory_store;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod sqlite_store;

use std::sync::Arc;

use tracing::info;

use crate::ranking::core::config::{StorageConfig, StoreBackend};
use crate::ranking::core::entry::RankEntry;
#[cfg(not(feature = "redis"))]
use crate::ranking::core::errors::RankingError;
use crate::ranking::core::errors::{RankingResult, StoreResult};

pub use memory_store::MemoryScoreStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisScoreStore;
pub use sqlite_store::SqliteScoreStore;

/// Sorted-set store consumed by the ranking engine.
pub trait ScoreStore: Send + Sync {
    /// Add `delta` to `member` within `key`, creating both if absent.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn increment_member(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64>;

    /// Replace `dest` with the weighted union of `sources`.
    ///
    /// `weights[i]` applies to `sources[i]`. Returns the number of members
    /// written to `dest`.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn union_into(&self, dest: &str, sources: &[String], weights: &[f64]) -> StoreResult<usize>;

    /// Entries of `key` ranked by score descending, inclusive index window.
    ///
    /// Missing keys and out-of-bounds windows yield an empty list.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn range_descending(&self, key: &str, start: usize, stop: usize)
    -> StoreResult<Vec<RankEntry>>;

    /// Drop `key` entirely. Stores without deletion support may ignore this.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn discard(&self, _key: &str) -> StoreResult<()> {
        Ok(())
    }
}

/// Open the backend selected by `config`.
///
/// # Errors
/// Returns an error if the backend cannot be opened or is not compiled in.
pub fn open_store(config: &StorageConfig) -> RankingResult<Arc<dyn ScoreStore>> {
    config.validate()?;
    info!("Opening {} score store", config.backend);

    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryScoreStore::new())),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteScoreStore::open(config)?)),
        #[cfg(feature = "redis")]
        StoreBackend::Redis => Ok(Arc::new(RedisScoreStore::open(&config.redis_url)?)),
        #[cfg(not(feature = "redis"))]
        StoreBackend::Redis => Err(RankingError::InvalidConfig(
            "redis backend requires the `redis` feature".to_string(),
        )),
    }
}

/// Slice `entries` (already sorted) down to an inclusive index window.
pub(crate) fn window(entries: Vec<RankEntry>, start: usize, stop: usize) -> Vec<RankEntry> {
    if start >= entries.len() || stop < start {
        return Vec::new();
    }
    let take = stop.saturating_sub(start).saturating_add(1);
    entries.into_iter().skip(start).take(take).collect()
}
