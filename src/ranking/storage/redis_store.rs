//! Redis sorted-set score store.
//!
//! Maps the store primitives one-to-one onto `ZINCRBY`, `ZUNIONSTORE … WEIGHTS`
//! and `ZREVRANGE … WITHSCORES`. Redis already orders equal scores by member
//! in reverse byte order for `ZREVRANGE`, which the other backends mirror.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use redis::{Client, Cmd, Connection};
use tracing::debug;

use crate::ranking::core::entry::RankEntry;
use crate::ranking::core::errors::{StoreError, StoreResult};
use crate::ranking::storage::ScoreStore;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Redis implementation of the score store over one blocking connection.
pub struct RedisScoreStore {
    conn: Mutex<Connection>,
}

impl RedisScoreStore {
    /// Connect to the Redis server at `url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the server is unreachable.
    pub fn open(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let conn = client.get_connection_with_timeout(CONNECT_TIMEOUT)?;
        debug!(url, "connected redis score store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|err| StoreError::Poisoned(err.to_string()))
    }
}

fn union_cmd(dest: &str, sources: &[String], weights: &[f64]) -> Cmd {
    let mut cmd = redis::cmd("ZUNIONSTORE");
    cmd.arg(dest).arg(sources.len()).arg(sources).arg("WEIGHTS").arg(weights);
    cmd
}

fn range_cmd(key: &str, start: usize, stop: usize) -> Cmd {
    let mut cmd = redis::cmd("ZREVRANGE");
    cmd.arg(key).arg(start).arg(stop).arg("WITHSCORES");
    cmd
}

impl ScoreStore for RedisScoreStore {
    fn increment_member(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64> {
        let score = redis::cmd("ZINCRBY")
            .arg(key)
            .arg(delta)
            .arg(member)
            .query::<f64>(&mut *self.lock()?)?;
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

        let count = union_cmd(dest, sources, weights).query::<usize>(&mut *self.lock()?)?;
        debug!(dest, sources = sources.len(), members = count, "union stored");
        Ok(count)
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
        let rows = range_cmd(key, start, stop).query::<Vec<(String, f64)>>(&mut *self.lock()?)?;
        Ok(rows.into_iter().map(RankEntry::from).collect())
    }

    fn discard(&self, key: &str) -> StoreResult<()> {
        redis::cmd("DEL").arg(key).query::<()>(&mut *self.lock()?)?;
        Ok(())
    }
}
