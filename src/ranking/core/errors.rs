//! Error types for the ranking subsystem.

use thiserror::Error;

/// Failure raised by a score store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` storage error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Redis storage error.
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    /// A store lock was poisoned by a panicking holder.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
    /// Backend unavailable or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Backend returned a value that cannot be represented.
    #[error("invalid store data: {0}")]
    InvalidData(String),
}

/// Ranking subsystem error type.
#[derive(Debug, Error)]
pub enum RankingError {
    /// Invalid configuration, e.g. an empty namespace.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Caller supplied an argument that fails validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Error surfaced by the score store, passed through untouched.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RankingError {
    /// Whether the caller is at fault (maps to a 4xx-style response).
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Whether the backing store failed (maps to a 5xx-style response).
    #[must_use]
    pub const fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Convenience result alias for ranking operations.
pub type RankingResult<T> = Result<T, RankingError>;
