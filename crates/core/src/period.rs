use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYear(pub u16);

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY{}", self.0)
    }
}

impl FiscalYear {
    pub fn new(year: u16) -> Self {
        FiscalYear(year)
    }

    pub fn year(self) -> u16 {
        self.0
    }

    pub fn start_date(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 as i32, 1, 1).unwrap_or_default()
    }

    /// Returns December 31 of this fiscal year (inclusive end).
    pub fn end_date(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 as i32, 12, 31).unwrap_or_default()
    }

    pub fn date_range(self) -> DateRange {
        DateRange::new(self.start_date(), self.end_date())
    }
}

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(MonthKey { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        MonthKey { year: date.year(), month: date.month() }
    }

    pub fn prev(self) -> Self {
        if self.month == 1 {
            MonthKey { year: self.year - 1, month: 12 }
        } else {
            MonthKey { year: self.year, month: self.month - 1 }
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            MonthKey { year: self.year + 1, month: 1 }
        } else {
            MonthKey { year: self.year, month: self.month + 1 }
        }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }

    /// The `count` months ending with (and including) `self`, oldest first.
    pub fn trailing(self, count: usize) -> Vec<MonthKey> {
        let mut months = Vec::with_capacity(count);
        let mut cursor = self;
        for _ in 0..count {
            months.push(cursor);
            cursor = cursor.prev();
        }
        months.reverse();
        months
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Inclusive range from the first day of `first` to the last day of `last`.
    pub fn months(first: MonthKey, last: MonthKey) -> Self {
        DateRange::new(first.first_day(), last.last_day())
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
