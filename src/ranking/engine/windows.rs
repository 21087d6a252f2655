//! Named ranking windows.

use std::fmt;
use std::str::FromStr;

use crate::ranking::core::errors::RankingError;
use crate::ranking::core::keys::is_bucket_date;

/// Output key for the current-week aggregate.
pub const CURRENT_WEEK_KEY: &str = "rank:current_week";

/// Output key for the current-month aggregate.
pub const CURRENT_MONTH_KEY: &str = "rank:current_month";

/// Output key for an aggregate over the last `n` days.
#[must_use]
pub fn last_days_key(n: u32) -> String {
    format!("rank:days_{n}")
}

/// A time window to rank over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RankWindow {
    /// The day before today.
    Yesterday,
    /// Monday through Sunday of the current week.
    CurrentWeek,
    /// Every day of the current month.
    CurrentMonth,
    /// The `n` days ending yesterday.
    LastDays(u32),
    /// One explicit `YYYYMMDD` day.
    Date(String),
}

impl FromStr for RankWindow {
    type Err = RankingError;

    /// Parse `yesterday`, `week`, `month`, `days:N` or a `YYYYMMDD` date.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        match raw.to_ascii_lowercase().as_str() {
            "yesterday" => return Ok(Self::Yesterday),
            "week" | "current_week" => return Ok(Self::CurrentWeek),
            "month" | "current_month" => return Ok(Self::CurrentMonth),
            _ => {}
        }

        if let Some(days) = raw.strip_prefix("days:").or_else(|| raw.strip_prefix("days_")) {
            return days.parse().map(Self::LastDays).map_err(|_| {
                RankingError::InvalidArgument(format!("invalid day count in window {raw:?}"))
            });
        }

        if is_bucket_date(raw) {
            return Ok(Self::Date(raw.to_string()));
        }

        Err(RankingError::InvalidArgument(format!(
            "unknown ranking window {raw:?}, expected yesterday, week, month, days:N or YYYYMMDD"
        )))
    }
}

impl fmt::Display for RankWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yesterday => f.write_str("yesterday"),
            Self::CurrentWeek => f.write_str("week"),
            Self::CurrentMonth => f.write_str("month"),
            Self::LastDays(n) => write!(f, "days:{n}"),
            Self::Date(date) => f.write_str(date),
        }
    }
}
