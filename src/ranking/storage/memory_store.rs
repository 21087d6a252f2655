//! In-process score store.

use std::collections::HashMap;

use dashmap::DashMap;
use tracing::debug;

use crate::ranking::core::entry::{RankEntry, sort_descending};
use crate::ranking::core::errors::{StoreError, StoreResult};
use crate::ranking::storage::{ScoreStore, window};

/// Thread-safe in-memory sorted-set store.
///
/// Each key maps to a member→score table. Increments hold the key's shard
/// lock for the whole read-modify-write, so concurrent increments on the same
/// member never lose updates.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    sets: DashMap<String, HashMap<String, f64>>,
}

impl MemoryScoreStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current score of `member` in `key`, if present.
    #[must_use]
    pub fn score(&self, key: &str, member: &str) -> Option<f64> {
        self.sets
            .get(key)
            .and_then(|set| set.get(member).copied())
    }

    /// Whether `key` exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.sets.contains_key(key)
    }
}

impl ScoreStore for MemoryScoreStore {
    fn increment_member(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64> {
        let mut set = self.sets.entry(key.to_string()).or_default();
        let score = set.entry(member.to_string()).or_insert(0.0);
        *score += delta;
        Ok(*score)
    }

    fn union_into(&self, dest: &str, sources: &[String], weights: &[f64]) -> StoreResult<usize> {
        if sources.len() != weights.len() {
            return Err(StoreError::InvalidData(format!(
                "{} source keys but {} weights",
                sources.len(),
                weights.len()
            )));
        }

        // Snapshot before touching `dest`; it may be one of the sources and
        // holding a read guard while inserting into the same shard deadlocks.
        let mut merged: HashMap<String, f64> = HashMap::new();
        for (source, weight) in sources.iter().zip(weights) {
            if let Some(set) = self.sets.get(source) {
                for (member, score) in set.iter() {
                    *merged.entry(member.clone()).or_insert(0.0) += score * weight;
                }
            }
        }

        let count = merged.len();
        if merged.is_empty() {
            self.sets.remove(dest);
        } else {
            self.sets.insert(dest.to_string(), merged);
        }
        debug!(dest, sources = sources.len(), members = count, "union stored");
        Ok(count)
    }

    fn range_descending(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> StoreResult<Vec<RankEntry>> {
        let mut entries: Vec<RankEntry> = match self.sets.get(key) {
            Some(set) => set
                .iter()
                .map(|(member, score)| RankEntry::new(member.clone(), *score))
                .collect(),
            None => return Ok(Vec::new()),
        };
        sort_descending(&mut entries);
        Ok(window(entries, start, stop))
    }

    fn discard(&self, key: &str) -> StoreResult<()> {
        self.sets.remove(key);
        Ok(())
    }
}
