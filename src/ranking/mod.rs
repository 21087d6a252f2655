//! Time-bucketed leaderboards.
//!
//! This module is organized into:
//! - `core`: Configuration, errors, key sanitizing, date bucketing, entries
//! - `storage`: The sorted-set `ScoreStore` trait and its memory, SQLite and
//!   Redis backends
//! - `engine`: The `RankingEngine` and its named windows

pub mod core;
pub mod engine;
pub mod storage;

// Re-export commonly used types for convenience
pub use self::core::{
    AggregateKeyMode, Clock, DateBuckets, FixedClock, RankEntry, RankRange, RankingConfig,
    RankingError, RankingResult, StorageConfig, StoreBackend, StoreError, StoreResult,
    SystemClock, sanitize,
};
pub use engine::{RankWindow, RankingEngine};
#[cfg(feature = "redis")]
pub use storage::RedisScoreStore;
pub use storage::{MemoryScoreStore, ScoreStore, SqliteScoreStore, open_store};
