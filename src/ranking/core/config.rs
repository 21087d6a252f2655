//! Configuration for the ranking subsystem.

use std::fmt::{Debug, Display};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ranking::core::errors::{RankingError, RankingResult};

/// Environment variable naming a JSON configuration file.
pub const ENV_CONFIG: &str = "RANKBOARD_CONFIG";
/// Environment variable holding the namespace.
pub const ENV_NAMESPACE: &str = "RANKBOARD_NAMESPACE";
/// Environment variable holding the UTC offset in seconds.
pub const ENV_UTC_OFFSET: &str = "RANKBOARD_UTC_OFFSET";
/// Environment variable selecting the aggregate key mode.
pub const ENV_AGGREGATE_KEYS: &str = "RANKBOARD_AGGREGATE_KEYS";
/// Environment variable selecting the store backend.
pub const ENV_BACKEND: &str = "RANKBOARD_BACKEND";
/// Environment variable holding the `SQLite` database path.
pub const ENV_SQLITE_PATH: &str = "RANKBOARD_SQLITE_PATH";
/// Environment variable holding the `SQLite` table name.
pub const ENV_SQLITE_TABLE: &str = "RANKBOARD_SQLITE_TABLE";
/// Environment variable holding the Redis connection URL.
pub const ENV_REDIS_URL: &str = "RANKBOARD_REDIS_URL";

const MAX_OFFSET_SECONDS: u32 = 86_399;

/// Top-level configuration for a ranking engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Leaderboard namespace prefixing every bucket key.
    pub namespace: String,
    /// Offset from UTC used to decide calendar days.
    pub utc_offset_seconds: i32,
    /// How aggregate output keys are named.
    pub aggregate_keys: AggregateKeyMode,
    /// Storage settings.
    pub storage: StorageConfig,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            namespace: "user".to_string(),
            utc_offset_seconds: 0,
            aggregate_keys: AggregateKeyMode::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl RankingConfig {
    /// Create a default config for a namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Set the UTC offset in seconds.
    #[must_use]
    pub const fn with_utc_offset(mut self, seconds: i32) -> Self {
        self.utc_offset_seconds = seconds;
        self
    }

    /// Set the aggregate key mode.
    #[must_use]
    pub const fn with_aggregate_keys(mut self, mode: AggregateKeyMode) -> Self {
        self.aggregate_keys = mode;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any value is out of range or empty.
    pub fn validate(&self) -> RankingResult<()> {
        if self.namespace.trim().is_empty() {
            return Err(RankingError::InvalidConfig(
                "ranking namespace must not be empty".to_string(),
            ));
        }

        if self.utc_offset_seconds.unsigned_abs() > MAX_OFFSET_SECONDS {
            return Err(RankingError::InvalidConfig(format!(
                "utc_offset_seconds must be within ±{MAX_OFFSET_SECONDS}, got {}",
                self.utc_offset_seconds
            )));
        }

        self.storage.validate()
    }

    /// UTC offset as a `chrono` offset.
    ///
    /// # Errors
    /// Returns an error if the offset is out of range.
    pub fn offset(&self) -> RankingResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_seconds).ok_or_else(|| {
            RankingError::InvalidConfig(format!(
                "invalid utc offset: {} seconds",
                self.utc_offset_seconds
            ))
        })
    }

    /// Load configuration from the JSON file named by `RANKBOARD_CONFIG`,
    /// or from the other `RANKBOARD_*` variables when it is unset.
    ///
    /// # Errors
    /// Returns an error if the file or a variable cannot be read, parsed, or
    /// validated.
    pub fn load() -> RankingResult<Self> {
        std::env::var(ENV_CONFIG).map_or_else(
            |_| Self::from_env(),
            |path| {
                info!("Loading configuration from {path}");
                Self::load_json(path)
            },
        )
    }

    /// Load configuration from `RANKBOARD_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable is present but unparseable, or the
    /// resulting config is invalid.
    pub fn from_env() -> RankingResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns an error if a value is present but unparseable, or the
    /// resulting config is invalid.
    pub fn from_lookup<F>(lookup: F) -> RankingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            namespace: load_or(&lookup, ENV_NAMESPACE, defaults.namespace)?,
            utc_offset_seconds: load_or(&lookup, ENV_UTC_OFFSET, defaults.utc_offset_seconds)?,
            aggregate_keys: load_or(&lookup, ENV_AGGREGATE_KEYS, defaults.aggregate_keys)?,
            storage: StorageConfig {
                backend: load_or(&lookup, ENV_BACKEND, defaults.storage.backend)?,
                sqlite_path: load_or(&lookup, ENV_SQLITE_PATH, defaults.storage.sqlite_path)?,
                sqlite_table: load_or(&lookup, ENV_SQLITE_TABLE, defaults.storage.sqlite_table)?,
                redis_url: load_or(&lookup, ENV_REDIS_URL, defaults.storage.redis_url)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load_json(path: impl AsRef<Path>) -> RankingResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            RankingError::InvalidConfig(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| {
            RankingError::InvalidConfig(format!("cannot parse {}: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }
}

fn load_or<F, T>(lookup: &F, key: &str, default: T) -> RankingResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Debug,
    T::Err: Display,
{
    lookup(key).map_or_else(
        || {
            info!("{key} not set, using default: {default:?}");
            Ok(default)
        },
        |raw| {
            raw.trim().parse().map_err(|err| {
                warn!("Invalid {key} value: {err}");
                RankingError::InvalidConfig(format!("invalid {key} value {raw:?}: {err}"))
            })
        },
    )
}

/// Naming strategy for aggregate (multi-day union) output keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKeyMode {
    /// One fixed output key per window, overwritten on each call.
    ///
    /// Concurrent callers of the same window race on the key; each recomputes
    /// the same logical window, so the result is still a valid ranking.
    #[default]
    Shared,
    /// A unique scratch key per call, discarded after the read.
    PerCall,
}

impl FromStr for AggregateKeyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "per_call" | "per-call" | "percall" => Ok(Self::PerCall),
            other => Err(format!("unknown aggregate key mode: {other}")),
        }
    }
}

impl Display for AggregateKeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shared => f.write_str("shared"),
            Self::PerCall => f.write_str("per_call"),
        }
    }
}

/// Score store backend selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-process `DashMap` store; contents are lost on exit.
    #[default]
    Memory,
    /// `SQLite` file store.
    Sqlite,
    /// Redis sorted sets (requires the `redis` feature).
    Redis,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

impl Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Sqlite => f.write_str("sqlite"),
            Self::Redis => f.write_str("redis"),
        }
    }
}

/// Storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to open.
    pub backend: StoreBackend,
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Table holding `(key, member, score)` rows.
    pub sqlite_table: String,
    /// Redis connection URL.
    pub redis_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sqlite_path: PathBuf::from("rankboard.sqlite3"),
            sqlite_table: "rank_scores".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl StorageConfig {
    /// Validate storage settings.
    ///
    /// # Errors
    /// Returns an error if the table name is not a plain identifier or the
    /// selected backend lacks its connection setting.
    pub fn validate(&self) -> RankingResult<()> {
        let table_ok = !self.sqlite_table.is_empty()
            && self
                .sqlite_table
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if !table_ok {
            return Err(RankingError::InvalidConfig(format!(
                "sqlite_table must match [A-Za-z0-9_]+, got {:?}",
                self.sqlite_table
            )));
        }

        if self.backend == StoreBackend::Sqlite && self.sqlite_path.as_os_str().is_empty() {
            return Err(RankingError::InvalidConfig(
                "sqlite_path must not be empty".to_string(),
            ));
        }

        if self.backend == StoreBackend::Redis && self.redis_url.trim().is_empty() {
            return Err(RankingError::InvalidConfig(
                "redis_url must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
