//! Ranking engine and named windows.

pub mod core;
pub mod windows;

pub use self::core::RankingEngine;
pub use windows::{CURRENT_MONTH_KEY, CURRENT_WEEK_KEY, RankWindow, last_days_key};
