//! Calendar months on the business clock.

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate, TimeDelta, Utc};

use super::error::SnapshotError;

/// Earliest year a snapshot may be requested for.
pub const MIN_YEAR: i32 = 2000;

/// Latest year a snapshot may be requested for.
pub const MAX_YEAR: i32 = 2100;

/// A calendar month, identified by its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotPeriod {
    first_day: NaiveDate,
}

impl SnapshotPeriod {
    /// Validates a requested year and month.
    pub fn new(year: i32, month: u32) -> Result<Self, SnapshotError> {
        if !(1..=12).contains(&month) {
            return Err(SnapshotError::InvalidMonth(month));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(SnapshotError::InvalidYear {
                year,
                min: MIN_YEAR,
                max: MAX_YEAR,
            });
        }
        Self::from_ymd(year, month)
    }

    fn from_ymd(year: i32, month: u32) -> Result<Self, SnapshotError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first_day| Self { first_day })
            .ok_or(SnapshotError::PeriodOutOfRange { year, month })
    }

    /// Returns the month containing `now` on a calendar shifted by `offset`.
    #[must_use]
    pub fn containing(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = now.with_timezone(&offset).date_naive();
        Self {
            first_day: local.with_day(1).unwrap_or(local),
        }
    }

    /// Year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    /// Month number (1-12).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    /// First day of the month. Frozen snapshots are keyed by this date.
    #[must_use]
    pub const fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// The month before this one.
    pub fn previous(&self) -> Result<Self, SnapshotError> {
        self.first_day
            .checked_sub_months(Months::new(1))
            .map(|first_day| Self { first_day })
            .ok_or(SnapshotError::PeriodOutOfRange {
                year: self.year(),
                month: self.month(),
            })
    }

    /// The month after this one.
    pub fn next(&self) -> Result<Self, SnapshotError> {
        self.first_day
            .checked_add_months(Months::new(1))
            .map(|first_day| Self { first_day })
            .ok_or(SnapshotError::PeriodOutOfRange {
                year: self.year(),
                month: self.month(),
            })
    }

    /// Half-open UTC interval `[start, end)` covering the month on a calendar
    /// shifted by `offset`.
    pub fn utc_bounds(
        &self,
        offset: FixedOffset,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), SnapshotError> {
        let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
        let start = self.first_day.and_time(chrono::NaiveTime::MIN) - shift;
        let end = self.next()?.first_day.and_time(chrono::NaiveTime::MIN) - shift;
        Ok((start.and_utc(), end.and_utc()))
    }
}

impl fmt::Display for SnapshotPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}
