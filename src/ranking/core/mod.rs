//! Core ranking types: configuration, errors, keys, dates and entries.

pub mod config;
pub mod dates;
pub mod entry;
pub mod errors;
pub mod keys;

pub use config::{AggregateKeyMode, RankingConfig, StorageConfig, StoreBackend};
pub use dates::{Clock, DateBuckets, FixedClock, SystemClock, format_bucket_date};
pub use entry::RankEntry;
pub use errors::{RankingError, RankingResult, StoreError, StoreResult};
pub use keys::{RankRange, bucket_key, sanitize, validate_date};
