//! Date bucketing relative to an injectable clock.
//!
//! All lists are computed from a single reading of "now", converted into the
//! configured UTC offset, and rendered as `YYYYMMDD`.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    /// Freeze the clock at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(now.timestamp_millis()),
        }
    }

    /// Freeze the clock at midnight UTC of the given calendar day.
    ///
    /// Returns `None` if the date does not exist.
    #[must_use]
    pub fn at_date(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let midnight = date.and_hms_opt(0, 0, 0)?;
        Some(Self::new(Utc.from_utc_datetime(&midnight)))
    }

    /// Move the clock to a new instant.
    pub fn set(&self, now: DateTime<Utc>) {
        self.millis.store(now.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.load(Ordering::SeqCst))
            .single()
            .unwrap_or_default()
    }
}

/// Render a calendar day as a `YYYYMMDD` bucket date.
#[must_use]
pub fn format_bucket_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

const MIN_BUCKET_YEAR: i32 = 0;

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}

/// Bucket date generator bound to a clock and a UTC offset.
#[derive(Clone)]
pub struct DateBuckets {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl DateBuckets {
    /// Create a generator.
    #[must_use]
    pub const fn new(clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self { clock, offset }
    }

    /// Generator on the system clock in UTC.
    #[must_use]
    pub fn system_utc() -> Self {
        Self::new(Arc::new(SystemClock), Utc.fix())
    }

    /// Same clock, different offset.
    #[must_use]
    pub const fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Same offset, different clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configured UTC offset.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current calendar day in the configured offset.
    #[must_use]
    pub fn today_date(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.offset).date_naive()
    }

    /// Today's bucket date.
    #[must_use]
    pub fn today(&self) -> String {
        format_bucket_date(self.today_date())
    }

    /// Bucket date of the day before today.
    #[must_use]
    pub fn yesterday(&self) -> String {
        format_bucket_date(days_before(self.today_date(), 1))
    }

    /// Monday through Sunday of the current week.
    #[must_use]
    pub fn current_week_dates(&self) -> Vec<String> {
        let today = self.today_date();
        let monday = days_before(today, u64::from(today.weekday().num_days_from_monday()));
        monday.iter_days().take(7).map(format_bucket_date).collect()
    }

    /// The `n` days ending yesterday, oldest first. Today is never included.
    ///
    /// Returns `None` when the oldest day would fall before year 0, where
    /// dates no longer render as eight digits.
    #[must_use]
    pub fn last_n_days(&self, n: u32) -> Option<Vec<String>> {
        let first = self
            .today_date()
            .checked_sub_days(Days::new(u64::from(n)))
            .filter(|date| date.year() >= MIN_BUCKET_YEAR)?;
        Some(
            first
                .iter_days()
                .take(n as usize)
                .map(format_bucket_date)
                .collect(),
        )
    }

    /// Every day of the current month, from the 1st.
    #[must_use]
    pub fn current_month_dates(&self) -> Vec<String> {
        let today = self.today_date();
        let first = days_before(today, u64::from(today.day0()));
        first
            .iter_days()
            .take_while(|date| date.month() == today.month())
            .map(format_bucket_date)
            .collect()
    }
}
