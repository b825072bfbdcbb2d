use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::WeekMode;

/// a monday..sunday span, indexed from the week containing the sign date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekBucket {
    pub index: u32,
    pub monday: NaiveDate,
    pub sunday: NaiveDate,
}

impl WeekBucket {
    fn starting(monday: NaiveDate, index: u32) -> Self {
        Self {
            index,
            monday,
            sunday: monday + Duration::days(6),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.monday <= date && date <= self.sunday
    }

    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.contains(instant.date_naive())
    }

    /// true for the leading weeks that carry no obligation
    pub fn is_grace(&self, grace_weeks: u32) -> bool {
        self.index < grace_weeks
    }
}

/// monday of the iso week containing `date`
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// iso week containing `date`, with index 0
pub fn week_of(date: NaiveDate) -> WeekBucket {
    WeekBucket::starting(monday_of(date), 0)
}

/// every week whose monday lies between the sign date's monday and `end`, inclusive
pub fn weeks_between(sign_date: NaiveDate, end: NaiveDate) -> Vec<WeekBucket> {
    let first = monday_of(sign_date);
    if end < first {
        return Vec::new();
    }

    let count = (end - first).num_days() / 7 + 1;
    (0..count)
        .map(|i| WeekBucket::starting(first + Duration::weeks(i), i as u32))
        .collect()
}

/// week index of `date` relative to the sign date, `None` before week 0
pub fn week_index_of(sign_date: NaiveDate, date: NaiveDate) -> Option<u32> {
    let first = monday_of(sign_date);
    if date < first {
        return None;
    }
    u32::try_from((date - first).num_days() / 7).ok()
}

/// last calendar day an evaluation at `now` may look at
///
/// `Current` stops at the sunday before this week; `Next` runs up to today,
/// which is never later than this week's sunday.
pub fn evaluation_cutoff(now: DateTime<Utc>, mode: WeekMode) -> NaiveDate {
    let today = now.date_naive();
    match mode {
        WeekMode::Current => monday_of(today) - Duration::days(1),
        WeekMode::Next => today.min(week_of(today).sunday),
    }
}

/// week calendar anchored on a loan's sign date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekCalendar {
    sign_date: NaiveDate,
}

impl WeekCalendar {
    pub fn new(sign_date: DateTime<Utc>) -> Self {
        Self {
            sign_date: sign_date.date_naive(),
        }
    }

    pub fn from_date(sign_date: NaiveDate) -> Self {
        Self { sign_date }
    }

    pub fn sign_date(&self) -> NaiveDate {
        self.sign_date
    }

    /// bucket holding `instant`, `None` before the sign week
    pub fn bucket_for(&self, instant: DateTime<Utc>) -> Option<WeekBucket> {
        let date = instant.date_naive();
        week_index_of(self.sign_date, date).map(|index| WeekBucket::starting(monday_of(date), index))
    }

    pub fn weeks_through(&self, end: NaiveDate) -> Vec<WeekBucket> {
        weeks_between(self.sign_date, end)
    }
}
