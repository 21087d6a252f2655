//! Ranking engine orchestration.

use std::fmt;
use std::sync::Arc;

use chrono::FixedOffset;
use tracing::debug;
use uuid::Uuid;

use crate::ranking::core::config::{AggregateKeyMode, RankingConfig};
use crate::ranking::core::dates::{Clock, DateBuckets};
use crate::ranking::core::entry::RankEntry;
use crate::ranking::core::errors::{RankingError, RankingResult};
use crate::ranking::core::keys::{RankRange, bucket_key, sanitize, validate_date};
use crate::ranking::engine::windows::{
    CURRENT_MONTH_KEY, CURRENT_WEEK_KEY, RankWindow, last_days_key,
};
use crate::ranking::storage::ScoreStore;

/// Time-bucketed leaderboard over a sorted-set store.
///
/// Scores land in one bucket per calendar day (`{namespace}:{YYYYMMDD}`).
/// Multi-day rankings union the relevant buckets into an output key and read
/// the top of it. The engine keeps no state besides its namespace, clock and
/// store handle; validation always happens before the first store call.
pub struct RankingEngine {
    namespace: String,
    store: Arc<dyn ScoreStore>,
    buckets: DateBuckets,
    aggregate_keys: AggregateKeyMode,
}

impl fmt::Debug for RankingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankingEngine")
            .field("namespace", &self.namespace)
            .field("offset", &self.buckets.offset())
            .field("aggregate_keys", &self.aggregate_keys)
            .finish_non_exhaustive()
    }
}

impl RankingEngine {
    /// Create an engine on the system clock in UTC with shared output keys.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the namespace is blank.
    pub fn new(namespace: impl Into<String>, store: Arc<dyn ScoreStore>) -> RankingResult<Self> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(RankingError::InvalidConfig(
                "ranking namespace must not be empty".to_string(),
            ));
        }

        Ok(Self {
            namespace,
            store,
            buckets: DateBuckets::system_utc(),
            aggregate_keys: AggregateKeyMode::default(),
        })
    }

    /// Create an engine from a validated config.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the config fails validation.
    pub fn from_config(config: &RankingConfig, store: Arc<dyn ScoreStore>) -> RankingResult<Self> {
        config.validate()?;
        Ok(Self::new(config.namespace.clone(), store)?
            .with_offset(config.offset()?)
            .with_aggregate_keys(config.aggregate_keys))
    }

    /// Replace the clock used to decide "now".
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.buckets = self.buckets.with_clock(clock);
        self
    }

    /// Replace the UTC offset used to decide calendar days.
    #[must_use]
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.buckets = self.buckets.with_offset(offset);
        self
    }

    /// Replace the aggregate key strategy.
    #[must_use]
    pub const fn with_aggregate_keys(mut self, mode: AggregateKeyMode) -> Self {
        self.aggregate_keys = mode;
        self
    }

    /// Leaderboard namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key of the bucket receiving today's scores.
    #[must_use]
    pub fn today_key(&self) -> String {
        bucket_key(&self.namespace, &self.buckets.today())
    }

    /// Add `delta` to `identity` in today's bucket and return the new score.
    ///
    /// The emptiness check runs on the trimmed raw identity, before
    /// sanitizing; an identity made only of punctuation is accepted and lands
    /// on the empty member.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for a blank identity or a non-positive delta,
    /// and passes store failures through.
    pub fn add_score(&self, identity: impl fmt::Display, delta: i64) -> RankingResult<f64> {
        let identity = identity.to_string();
        if identity.trim().is_empty() {
            return Err(RankingError::InvalidArgument(
                "identity must not be empty".to_string(),
            ));
        }
        if delta <= 0 {
            return Err(RankingError::InvalidArgument(format!(
                "score delta must be a positive integer, got {delta}"
            )));
        }

        let member = sanitize(&identity);
        if member.is_empty() {
            debug!(identity = %identity, "identity sanitized to an empty member");
        }

        let key = self.today_key();
        #[allow(clippy::cast_precision_loss)]
        let score = self.store.increment_member(&key, &member, delta as f64)?;
        debug!(key = %key, member = %member, delta, score, "score added");
        Ok(score)
    }

    /// Add one point to `identity` in today's bucket.
    ///
    /// # Errors
    /// Same as [`Self::add_score`].
    pub fn increment(&self, identity: impl fmt::Display) -> RankingResult<f64> {
        self.add_score(identity, 1)
    }

    /// Ranking of a single day, inclusive window `[start, stop]`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for a malformed date or range, and passes
    /// store failures through.
    pub fn top_for_date(&self, date: &str, start: i64, stop: i64) -> RankingResult<Vec<RankEntry>> {
        validate_date(date)?;
        self.rank_day(date, RankRange::new(start, stop)?)
    }

    /// Top ten of yesterday.
    ///
    /// # Errors
    /// Passes store failures through.
    pub fn top_yesterday(&self) -> RankingResult<Vec<RankEntry>> {
        self.top(&RankWindow::Yesterday)
    }

    /// Ranking of the union of several days, stored under `output_key`.
    ///
    /// Every day weighs 1. The output key is sanitized; with
    /// [`AggregateKeyMode::PerCall`] it also gets a unique suffix and is
    /// discarded after the read.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty date list, the first malformed
    /// date, or a malformed range, and passes store failures through.
    pub fn top_for_window<S: AsRef<str>>(
        &self,
        dates: &[S],
        output_key: &str,
        start: i64,
        stop: i64,
    ) -> RankingResult<Vec<RankEntry>> {
        if dates.is_empty() {
            return Err(empty_dates());
        }
        for date in dates {
            validate_date(date.as_ref())?;
        }
        self.rank_days(dates, output_key, RankRange::new(start, stop)?)
    }

    /// Top ten of the current week (Monday through Sunday).
    ///
    /// # Errors
    /// Passes store failures through.
    pub fn top_current_week(&self) -> RankingResult<Vec<RankEntry>> {
        self.top(&RankWindow::CurrentWeek)
    }

    /// Top ten of the current month.
    ///
    /// # Errors
    /// Passes store failures through.
    pub fn top_current_month(&self) -> RankingResult<Vec<RankEntry>> {
        self.top(&RankWindow::CurrentMonth)
    }

    /// Ranking over the `n` days ending yesterday.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `n` is zero, reaches back before year 0,
    /// or the range is malformed, and passes store failures through.
    pub fn top_last_n_days(&self, n: u32, start: i64, stop: i64) -> RankingResult<Vec<RankEntry>> {
        self.top_window(&RankWindow::LastDays(n), start, stop)
    }

    /// Top ten over the `n` days ending yesterday.
    ///
    /// # Errors
    /// Same as [`Self::top_last_n_days`].
    pub fn top_last_n_days_top10(&self, n: u32) -> RankingResult<Vec<RankEntry>> {
        self.top(&RankWindow::LastDays(n))
    }

    /// Top ten of a named window.
    ///
    /// # Errors
    /// Same as the window's dedicated method.
    pub fn top(&self, window: &RankWindow) -> RankingResult<Vec<RankEntry>> {
        self.rank(window, RankRange::TOP_TEN)
    }

    /// Ranking of a named window with an explicit range.
    ///
    /// # Errors
    /// Same as the window's dedicated method.
    pub fn top_window(
        &self,
        window: &RankWindow,
        start: i64,
        stop: i64,
    ) -> RankingResult<Vec<RankEntry>> {
        self.rank(window, RankRange::new(start, stop)?)
    }

    fn rank(&self, window: &RankWindow, range: RankRange) -> RankingResult<Vec<RankEntry>> {
        match window {
            RankWindow::Yesterday => self.rank_day(&self.buckets.yesterday(), range),
            RankWindow::CurrentWeek => {
                self.rank_days(&self.buckets.current_week_dates(), CURRENT_WEEK_KEY, range)
            }
            RankWindow::CurrentMonth => {
                self.rank_days(&self.buckets.current_month_dates(), CURRENT_MONTH_KEY, range)
            }
            RankWindow::LastDays(n) => {
                let dates = self.last_n_days(*n)?;
                self.rank_days(&dates, &last_days_key(*n), range)
            }
            RankWindow::Date(date) => {
                validate_date(date)?;
                self.rank_day(date, range)
            }
        }
    }

    fn last_n_days(&self, n: u32) -> RankingResult<Vec<String>> {
        if n == 0 {
            return Err(empty_dates());
        }
        self.buckets
            .last_n_days(n)
            .ok_or_else(|| RankingError::InvalidArgument(format!("day count {n} too large")))
    }

    fn rank_day(&self, date: &str, range: RankRange) -> RankingResult<Vec<RankEntry>> {
        self.read_range(&bucket_key(&self.namespace, date), range)
    }

    fn rank_days<S: AsRef<str>>(
        &self,
        dates: &[S],
        output_key: &str,
        range: RankRange,
    ) -> RankingResult<Vec<RankEntry>> {
        let sources: Vec<String> = dates
            .iter()
            .map(|date| bucket_key(&self.namespace, date.as_ref()))
            .collect();
        let weights = vec![1.0; sources.len()];
        let dest = self.aggregate_key(output_key);

        let members = self.store.union_into(&dest, &sources, &weights)?;
        debug!(dest = %dest, days = sources.len(), members, "window aggregated");

        match self.aggregate_keys {
            AggregateKeyMode::Shared => self.read_range(&dest, range),
            AggregateKeyMode::PerCall => {
                let ranked = self.read_range(&dest, range);
                let cleanup = self.store.discard(&dest);
                let ranked = ranked?;
                cleanup?;
                Ok(ranked)
            }
        }
    }

    fn aggregate_key(&self, output_key: &str) -> String {
        let base = sanitize(output_key);
        match self.aggregate_keys {
            AggregateKeyMode::Shared => base,
            AggregateKeyMode::PerCall => format!("{base}_{}", Uuid::new_v4().simple()),
        }
    }

    fn read_range(&self, key: &str, range: RankRange) -> RankingResult<Vec<RankEntry>> {
        Ok(self
            .store
            .range_descending(key, range.start(), range.stop())?)
    }
}

fn empty_dates() -> RankingError {
    RankingError::InvalidArgument("date list must not be empty".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Offset, Utc};

    use super::*;
    use crate::ranking::core::dates::FixedClock;
    use crate::ranking::core::errors::{StoreError, StoreResult};
    use crate::ranking::storage::{MemoryScoreStore, SqliteScoreStore};

    /// Store double recording every call and optionally failing them.
    #[derive(Default)]
    struct SpyStore {
        inner: MemoryScoreStore,
        calls: AtomicUsize,
        log: Mutex<Vec<String>>,
        fail_with: Option<&'static str>,
    }

    impl SpyStore {
        fn failing(message: &'static str) -> Self {
            Self {
                fail_with: Some(message),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn record(&self, entry: String) -> StoreResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(entry);
            match self.fail_with {
                Some(message) => Err(StoreError::Unavailable(message.to_string())),
                None => Ok(()),
            }
        }
    }

    impl ScoreStore for SpyStore {
        fn increment_member(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64> {
            self.record(format!("zincrby {key} {delta} {member}"))?;
            self.inner.increment_member(key, member, delta)
        }

        fn union_into(
            &self,
            dest: &str,
            sources: &[String],
            weights: &[f64],
        ) -> StoreResult<usize> {
            self.record(format!("zunionstore {dest} {} {weights:?}", sources.join(",")))?;
            self.inner.union_into(dest, sources, weights)
        }

        fn range_descending(
            &self,
            key: &str,
            start: usize,
            stop: usize,
        ) -> StoreResult<Vec<RankEntry>> {
            self.record(format!("zrevrange {key} {start} {stop}"))?;
            self.inner.range_descending(key, start, stop)
        }

        fn discard(&self, key: &str) -> StoreResult<()> {
            self.record(format!("del {key}"))?;
            self.inner.discard(key)
        }
    }

    fn engine_at(store: Arc<dyn ScoreStore>, year: i32, month: u32, day: u32) -> RankingEngine {
        let clock = FixedClock::at_date(year, month, day).unwrap();
        RankingEngine::new("test_rank", store)
            .unwrap()
            .with_clock(Arc::new(clock))
    }

    fn seed(store: &dyn ScoreStore, key: &str, rows: &[(&str, f64)]) {
        for (member, score) in rows {
            store.increment_member(key, member, *score).unwrap();
        }
    }

    #[test]
    fn test_blank_namespace_rejected() {
        let store: Arc<dyn ScoreStore> = Arc::new(MemoryScoreStore::new());
        for namespace in ["", "   ", "\t\n"] {
            let err = RankingEngine::new(namespace, Arc::clone(&store)).unwrap_err();
            assert!(matches!(err, RankingError::InvalidConfig(_)));
        }
    }

    #[test]
    fn test_add_score_targets_today_bucket() {
        let spy = Arc::new(SpyStore::default());
        let engine = engine_at(spy.clone(), 2023, 10, 10);

        assert_eq!(engine.add_score("test_user_1", 100).unwrap(), 100.0);
        assert_eq!(engine.add_score("test_user_1", 5).unwrap(), 105.0);
        assert_eq!(spy.log()[0], "zincrby test_rank:20231010 100 test_user_1");
    }

    #[test]
    fn test_add_score_sanitizes_identity() {
        let spy = Arc::new(SpyStore::default());
        let engine = engine_at(spy.clone(), 2023, 10, 10);

        engine.add_score("test-user@1!", 100).unwrap();
        assert_eq!(spy.log(), vec!["zincrby test_rank:20231010 100 testuser1"]);
    }

    #[test]
    fn test_add_score_accepts_numeric_identity() {
        let store = Arc::new(MemoryScoreStore::new());
        let engine = engine_at(store.clone(), 2023, 10, 10);

        engine.increment(42_u64).unwrap();
        engine.increment(42_u64).unwrap();
        assert_eq!(store.score("test_rank:20231010", "42"), Some(2.0));
    }

    #[test]
    fn test_add_score_validation_skips_store() {
        let spy = Arc::new(SpyStore::default());
        let engine = engine_at(spy.clone(), 2023, 10, 10);

        let empty = engine.add_score("", 5).unwrap_err();
        assert_eq!(empty.to_string(), "invalid argument: identity must not be empty");
        assert!(engine.add_score("   ", 5).unwrap_err().is_invalid_argument());
        assert!(engine.add_score("x", 0).unwrap_err().is_invalid_argument());
        assert!(engine.add_score("x", -1).unwrap_err().is_invalid_argument());
        assert!(engine.add_score("test_user_2", -50).unwrap_err().is_invalid_argument());
        assert_eq!(spy.calls(), 0);
    }

    #[test]
    fn test_punctuation_identity_lands_on_empty_member() {
        let store = Arc::new(MemoryScoreStore::new());
        let engine = engine_at(store.clone(), 2023, 10, 10);

        assert_eq!(engine.add_score("!!!", 3).unwrap(), 3.0);
        assert_eq!(store.score("test_rank:20231010", ""), Some(3.0));
    }

    #[test]
    fn test_concurrent_adds_sum_up() {
        let store = Arc::new(MemoryScoreStore::new());
        let engine = engine_at(store.clone(), 2023, 10, 10);
        let deltas: Vec<i64> = (1..=40).collect();
        let expected: i64 = deltas.iter().sum();

        std::thread::scope(|scope| {
            for chunk in deltas.chunks(10) {
                let engine = &engine;
                scope.spawn(move || {
                    for delta in chunk {
                        engine.add_score("hot", *delta).unwrap();
                    }
                });
            }
        });

        #[allow(clippy::cast_precision_loss)]
        let expected = expected as f64;
        assert_eq!(store.score("test_rank:20231010", "hot"), Some(expected));
    }

    #[test]
    fn test_top_for_date_reads_bucket() {
        let store = Arc::new(MemoryScoreStore::new());
        seed(
            store.as_ref(),
            "test_rank:20231001",
            &[("user_1", 100.0), ("user_2", 90.0), ("user_3", 80.0)],
        );
        let engine = engine_at(store, 2023, 10, 10);

        let ranked = engine.top_for_date("20231001", 0, 9).unwrap();
        assert_eq!(
            ranked,
            vec![
                RankEntry::new("user_1", 100.0),
                RankEntry::new("user_2", 90.0),
                RankEntry::new("user_3", 80.0),
            ]
        );
        assert!(engine.top_for_date("20231002", 0, 9).unwrap().is_empty());
    }

    #[test]
    fn test_top_for_date_validation() {
        let spy = Arc::new(SpyStore::default());
        let engine = engine_at(spy.clone(), 2023, 10, 10);

        let bad_date = engine.top_for_date("2023-10-01", 0, 9).unwrap_err();
        assert!(bad_date.is_invalid_argument());
        assert!(bad_date.to_string().contains("YYYYMMDD"));

        let bad_range = engine.top_for_date("20231001", 5, 0).unwrap_err();
        assert!(bad_range.is_invalid_argument());
        assert!(engine.top_for_date("20231001", -1, 3).is_err());
        assert_eq!(spy.calls(), 0);
    }

    #[test]
    fn test_top_yesterday_uses_previous_day() {
        let spy = Arc::new(SpyStore::default());
        let engine = engine_at(spy.clone(), 2023, 10, 1);

        engine.top_yesterday().unwrap();
        assert_eq!(spy.log(), vec!["zrevrange test_rank:20230930 0 9"]);
    }

    #[test]
    fn test_top_for_window_unions_days() {
        let spy = Arc::new(SpyStore::default());
        for day in ["test_rank:20231001", "test_rank:20231002"] {
            seed(spy.as_ref(), day, &[("user_1", 100.0), ("user_2", 90.0)]);
        }
        let before = spy.calls();
        let engine = engine_at(spy.clone(), 2023, 10, 10);

        let ranked = engine
            .top_for_window(&["20231001", "20231002"], "rank:test", 0, 9)
            .unwrap();
        assert_eq!(
            ranked,
            vec![RankEntry::new("user_1", 200.0), RankEntry::new("user_2", 180.0)]
        );

        let log = spy.log();
        assert_eq!(
            &log[before..],
            &[
                "zunionstore ranktest test_rank:20231001,test_rank:20231002 [1.0, 1.0]".to_string(),
                "zrevrange ranktest 0 9".to_string(),
            ]
        );
    }

    #[test]
    fn test_top_for_window_sanitizes_output_key() {
        let spy = Arc::new(SpyStore::default());
        let engine = engine_at(spy.clone(), 2023, 10, 10);

        engine
            .top_for_window(&["20231001", "20231002"], "rank:test@1!", 0, 9)
            .unwrap();
        assert!(spy.log()[0].starts_with("zunionstore ranktest1 "));
    }

    #[test]
    fn test_top_for_window_validation() {
        let spy = Arc::new(SpyStore::default());
        let engine = engine_at(spy.clone(), 2023, 10, 10);

        let empty: [&str; 0] = [];
        assert!(engine.top_for_window(&empty, "rank:test", 0, 9).unwrap_err().is_invalid_argument());

        let bad = engine
            .top_for_window(&["20231001", "2023-10-02", "oops"], "rank:test", 0, 9)
            .unwrap_err();
        assert!(bad.to_string().contains("2023-10-02"));
        assert!(!bad.to_string().contains("oops"));

        assert!(engine
            .top_for_window(&["20231001", "20231002"], "rank:test", 5, 0)
            .unwrap_err()
            .is_invalid_argument());
        assert_eq!(spy.calls(), 0);
    }

    #[test]
    fn test_top_current_week_covers_monday_to_sunday() {
        let spy = Arc::new(SpyStore::default());
        let engine = engine_at(spy.clone(), 2023, 10, 10);

        engine.top_current_week().unwrap();
        let log = spy.log();
        assert_eq!(
            log[0],
            "zunionstore rankcurrent_week test_rank:20231009,test_rank:20231010,\
             test_rank:20231011,test_rank:20231012,test_rank:20231013,test_rank:20231014,\
             test_rank:20231015 [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]"
        );
        assert_eq!(log[1], "zrevrange rankcurrent_week 0 9");
    }

    #[test]
    fn test_top_current_month_aggregates_whole_month() {
        let store = Arc::new(MemoryScoreStore::new());
        seed(store.as_ref(), "test_rank:20230201", &[("user_1", 1000.0), ("user_2", 900.0)]);
        seed(store.as_ref(), "test_rank:20230228", &[("user_1", 2000.0), ("user_2", 1800.0)]);
        seed(store.as_ref(), "test_rank:20230301", &[("user_2", 5000.0)]);
        let engine = engine_at(store.clone(), 2023, 2, 15);

        let ranked = engine.top_current_month().unwrap();
        assert_eq!(
            ranked,
            vec![RankEntry::new("user_1", 3000.0), RankEntry::new("user_2", 2700.0)]
        );
        assert!(store.contains_key("rankcurrent_month"));
    }

    #[test]
    fn test_top_last_n_days_excludes_today() {
        let store = Arc::new(MemoryScoreStore::new());
        seed(store.as_ref(), "test_rank:20231009", &[("a", 1.0)]);
        seed(store.as_ref(), "test_rank:20231010", &[("b", 50.0)]);
        let engine = engine_at(store.clone(), 2023, 10, 10);

        let ranked = engine.top_last_n_days_top10(2).unwrap();
        assert_eq!(ranked, vec![RankEntry::new("a", 1.0)]);
        assert!(store.contains_key("rankdays_2"));

        assert!(engine.top_last_n_days(0, 0, 9).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_top_last_n_days_rejects_huge_counts_before_store() {
        let spy = Arc::new(SpyStore::default());
        let engine = engine_at(spy.clone(), 2023, 10, 10);

        for n in [1_000_000, 200_000_000, u32::MAX] {
            let err = engine.top_last_n_days(n, 0, 9).unwrap_err();
            assert_eq!(err.to_string(), format!("invalid argument: day count {n} too large"));
        }
        assert!(engine.top(&RankWindow::LastDays(u32::MAX)).unwrap_err().is_invalid_argument());
        assert_eq!(spy.calls(), 0);
    }

    #[test]
    fn test_top_window_dispatch() {
        let store = Arc::new(MemoryScoreStore::new());
        seed(store.as_ref(), "test_rank:20231009", &[("a", 4.0), ("b", 2.0)]);
        let engine = engine_at(store, 2023, 10, 10);

        let yesterday = engine.top(&RankWindow::Yesterday).unwrap();
        let week = engine.top(&RankWindow::CurrentWeek).unwrap();
        let date = engine.top(&RankWindow::Date("20231009".to_string())).unwrap();
        assert_eq!(yesterday, week);
        assert_eq!(yesterday, date);

        let second = engine.top_window(&RankWindow::LastDays(1), 1, 1).unwrap();
        assert_eq!(second, vec![RankEntry::new("b", 2.0)]);
    }

    #[test]
    fn test_per_call_keys_are_discarded() {
        let spy = Arc::new(SpyStore::default());
        seed(spy.as_ref(), "test_rank:20231001", &[("user_1", 10.0)]);
        let engine = engine_at(spy.clone(), 2023, 10, 10)
            .with_aggregate_keys(AggregateKeyMode::PerCall);

        let ranked = engine.top_for_window(&["20231001"], "rank:test", 0, 9).unwrap();
        assert_eq!(ranked, vec![RankEntry::new("user_1", 10.0)]);

        let log = spy.log();
        let union = log.iter().find(|l| l.starts_with("zunionstore")).unwrap();
        let dest = union.split(' ').nth(1).unwrap().to_string();
        assert!(dest.starts_with("ranktest_"));
        assert!(dest.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_'));
        assert_eq!(log.last().unwrap(), &format!("del {dest}"));
        assert!(!spy.inner.contains_key(&dest));
    }

    #[test]
    fn test_store_errors_pass_through() {
        let spy = Arc::new(SpyStore::failing("Redis error"));
        let engine = engine_at(spy, 2023, 10, 10);

        let results = [
            engine.add_score("test_user_1", 100).map(|_| ()),
            engine.top_for_date("20231001", 0, 9).map(|_| ()),
            engine.top_yesterday().map(|_| ()),
            engine.top_for_window(&["20231001", "20231002"], "rank:test", 0, 9).map(|_| ()),
            engine.top_current_week().map(|_| ()),
            engine.top_current_month().map(|_| ()),
            engine.top_last_n_days(3, 0, 9).map(|_| ()),
        ];
        for result in results {
            match result {
                Err(RankingError::Store(StoreError::Unavailable(message))) => {
                    assert_eq!(message, "Redis error");
                }
                other => panic!("expected store failure, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_from_config_applies_offset_and_mode() {
        let config = RankingConfig::new("article")
            .with_utc_offset(8 * 3600)
            .with_aggregate_keys(AggregateKeyMode::PerCall);
        let clock = FixedClock::at_date(2023, 10, 10).unwrap();
        clock.set(clock.now() + chrono::Duration::hours(20));
        let engine = RankingEngine::from_config(&config, Arc::new(MemoryScoreStore::new()))
            .unwrap()
            .with_clock(Arc::new(clock));

        assert_eq!(engine.namespace(), "article");
        assert_eq!(engine.today_key(), "article:20231011");
        assert_eq!(engine.with_offset(Utc.fix()).today_key(), "article:20231010");
    }

    #[test]
    fn test_engine_over_sqlite_store() {
        let store = Arc::new(SqliteScoreStore::open_in_memory().unwrap());
        let engine = engine_at(store, 2023, 10, 10);

        engine.add_score("user_1", 100).unwrap();
        engine.add_score("user_2", 90).unwrap();
        engine.add_score("user_1", 5).unwrap();

        let today = engine.top_for_date("20231010", 0, 9).unwrap();
        assert_eq!(
            today,
            vec![RankEntry::new("user_1", 105.0), RankEntry::new("user_2", 90.0)]
        );
        assert_eq!(engine.top_current_week().unwrap(), today);
    }
}
