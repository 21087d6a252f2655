//! `SQLite` score store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, params};
use tracing::debug;

use crate::ranking::core::config::StorageConfig;
use crate::ranking::core::entry::RankEntry;
use crate::ranking::core::errors::{StoreError, StoreResult};
use crate::ranking::storage::ScoreStore;

const DEFAULT_TABLE: &str = "rank_scores";

/// `SQLite` implementation of the score store.
///
/// One row per `(key, member)`; the connection is serialized behind a mutex
/// so each operation runs as a single critical section.
pub struct SqliteScoreStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteScoreStore {
    /// Open (or create) the database file named in `config`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn open(config: &StorageConfig) -> StoreResult<Self> {
        let conn = Connection::open(&config.sqlite_path)?;
        debug!(path = %config.sqlite_path.display(), "opened sqlite score store");
        Self::with_connection(conn, &config.sqlite_table)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, DEFAULT_TABLE)
    }

    fn with_connection(conn: Connection, table: &str) -> StoreResult<Self> {
        if table.is_empty() || !table.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(StoreError::InvalidData(format!("invalid table name {table:?}")));
        }

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                set_key TEXT NOT NULL,
                member TEXT NOT NULL,
                score REAL NOT NULL,
                PRIMARY KEY (set_key, member)
            ) WITHOUT ROWID;
            CREATE INDEX IF NOT EXISTS {table}_rank ON {table} (set_key, score DESC, member DESC);"
        ))?;

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|err| StoreError::Poisoned(err.to_string()))
    }
}

fn to_sql_index(value: usize) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidData(format!("index {value} too large")))
}

impl ScoreStore for SqliteScoreStore {
    fn increment_member(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64> {
        let table = &self.table;
        let score = self.lock()?.query_row(
            &format!(
                "INSERT INTO {table} (set_key, member, score) VALUES (?1, ?2, ?3)
                 ON CONFLICT (set_key, member) DO UPDATE SET score = score + excluded.score
                 RETURNING score"
            ),
            params![key, member, delta],
            |row| row.get::<_, f64>(0),
        )?;
        Ok(score)
    }

    fn union_into(&self, dest: &str, sources: &[String], weights: &[f64]) -> StoreResult<usize> {
        if sources.len() != weights.len() {
            return Err(StoreError::InvalidData(format!(
                "{} source keys but {} weights",
                sources.len(),
                weights.len()
            )));
        }

        let table = &self.table;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut merged: HashMap<String, f64> = HashMap::new();
        {
            let mut select =
                tx.prepare_cached(&format!("SELECT member, score FROM {table} WHERE set_key = ?1"))?;
            for (source, weight) in sources.iter().zip(weights) {
                let rows = select.query_map(params![source], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                })?;
                for row in rows {
                    let (member, score) = row?;
                    *merged.entry(member).or_insert(0.0) += score * weight;
                }
            }
        }

        tx.execute(&format!("DELETE FROM {table} WHERE set_key = ?1"), params![dest])?;
        {
            let mut insert = tx.prepare_cached(&format!(
                "INSERT INTO {table} (set_key, member, score) VALUES (?1, ?2, ?3)"
            ))?;
            for (member, score) in &merged {
                insert.execute(params![dest, member, score])?;
            }
        }
        tx.commit()?;
        drop(conn);

        debug!(dest, sources = sources.len(), members = merged.len(), "union stored");
        Ok(merged.len())
    }

    fn range_descending(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> StoreResult<Vec<RankEntry>> {
        if stop < start {
            return Ok(Vec::new());
        }
        let limit = to_sql_index(stop - start)?.saturating_add(1);
        let offset = to_sql_index(start)?;

        let table = &self.table;
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT member, score FROM {table} WHERE set_key = ?1
             ORDER BY score DESC, member DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt.query_map(params![key, limit, offset], |row| {
            Ok(RankEntry::new(row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn discard(&self, key: &str) -> StoreResult<()> {
        let table = &self.table;
        self.lock()?
            .execute(&format!("DELETE FROM {table} WHERE set_key = ?1"), params![key])?;
        Ok(())
    }
}
