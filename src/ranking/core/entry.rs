//! Ranked result rows.

use serde::{Deserialize, Serialize};

/// A member and its score, as returned by ranking queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    /// Sanitized member identity.
    pub member: String,
    /// Cumulative score.
    pub score: f64,
}

impl RankEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(member: impl Into<String>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

impl From<(String, f64)> for RankEntry {
    fn from((member, score): (String, f64)) -> Self {
        Self { member, score }
    }
}

/// Sort entries by score descending, ties by member descending.
///
/// This is the order a Redis sorted set yields from `ZREVRANGE`, so every
/// backend ranks equal scores the same way.
pub fn sort_descending(entries: &mut [RankEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.member.cmp(&a.member))
    });
}
