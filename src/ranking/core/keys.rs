//! Store key construction and argument validation.
//!
//! Every bucket key has the shape `{namespace}:{YYYYMMDD}`. The colon is the
//! separator reserved for the engine, so caller-supplied segments (member
//! identities and output keys) are sanitized down to `[A-Za-z0-9_]` before they
//! reach the store. Dates are validated rather than sanitized.

use crate::ranking::core::errors::{RankingError, RankingResult};

/// Separator between a namespace and a bucket date.
pub const KEY_SEPARATOR: char = ':';

/// Number of characters in a `YYYYMMDD` bucket date.
pub const DATE_LEN: usize = 8;

/// Strip every character outside `[A-Za-z0-9_]`.
///
/// Never fails; the result may be empty.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .collect()
}

/// Whether `date` is exactly eight ASCII digits.
#[must_use]
pub fn is_bucket_date(date: &str) -> bool {
    date.len() == DATE_LEN && date.bytes().all(|b| b.is_ascii_digit())
}

/// Validate a caller-supplied `YYYYMMDD` date.
///
/// # Errors
/// Returns `InvalidArgument` naming the offending value.
pub fn validate_date(date: &str) -> RankingResult<()> {
    if is_bucket_date(date) {
        Ok(())
    } else {
        Err(RankingError::InvalidArgument(format!(
            "malformed date {date:?}, expected YYYYMMDD"
        )))
    }
}

/// Build the bucket key for a namespace and date.
#[must_use]
pub fn bucket_key(namespace: &str, date: &str) -> String {
    format!("{namespace}{KEY_SEPARATOR}{date}")
}

/// Validated inclusive rank window `[start, stop]`, 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankRange {
    start: usize,
    stop: usize,
}

impl RankRange {
    /// The top ten positions, `[0, 9]`.
    pub const TOP_TEN: Self = Self { start: 0, stop: 9 };

    /// Validate a rank window.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `start < 0` or `stop < start`.
    pub fn new(start: i64, stop: i64) -> RankingResult<Self> {
        if start < 0 || stop < start {
            return Err(RankingError::InvalidArgument(format!(
                "invalid rank range [{start}, {stop}]"
            )));
        }
        let to_index = |value: i64| {
            usize::try_from(value).map_err(|_| {
                RankingError::InvalidArgument(format!("rank index {value} out of range"))
            })
        };
        Ok(Self {
            start: to_index(start)?,
            stop: to_index(stop)?,
        })
    }

    /// First rank index (inclusive).
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Last rank index (inclusive).
    #[must_use]
    pub const fn stop(&self) -> usize {
        self.stop
    }
}
