//! Calendar months in UTC, used by the dashboard aggregations.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// A calendar month, stored as its first day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month(NaiveDate);

impl Month {
    pub fn new(year: i32, month: u32) -> ResultEngine<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or_else(|| EngineError::Validation(format!("invalid month: {year}-{month}")))
    }

    /// The month containing `instant`.
    pub fn containing(instant: DateTime<Utc>) -> Self {
        let date = instant.date_naive();
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    /// Midnight UTC of the first day: the inclusive lower bound of the month.
    pub fn start(self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }

    /// Midnight UTC of the next month's first day: the exclusive upper bound.
    pub fn end(self) -> DateTime<Utc> {
        self.next().start()
    }

    pub fn next(self) -> Self {
        self.plus(1)
    }

    pub fn prev(self) -> Self {
        self.minus(1)
    }

    pub fn plus(self, months: u32) -> Self {
        Self(self.0.checked_add_months(Months::new(months)).unwrap_or(self.0))
    }

    pub fn minus(self, months: u32) -> Self {
        Self(self.0.checked_sub_months(Months::new(months)).unwrap_or(self.0))
    }

    /// Short chart label, e.g. `"Mar 2026"`.
    pub fn label(self) -> String {
        self.0.format("%b %Y").to_string()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Month {
    type Err = EngineError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::Validation(format!("invalid month: {s:?}"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for Month {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(value: Month) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn bounds_are_half_open() {
        let march = Month::new(2026, 3).unwrap();
        assert_eq!(march.start(), Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(march.end(), Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn steps_across_years() {
        let january = Month::new(2026, 1).unwrap();
        assert_eq!(january.prev(), Month::new(2025, 12).unwrap());
        assert_eq!(january.minus(5), Month::new(2025, 8).unwrap());
        assert_eq!(Month::new(2025, 12).unwrap().next(), january);
    }

    #[test]
    fn containing_truncates_to_first_day() {
        let instant = Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).unwrap();
        assert_eq!(Month::containing(instant), Month::new(2026, 2).unwrap());
    }

    #[test]
    fn label_and_parse() {
        let march = Month::new(2026, 3).unwrap();
        assert_eq!(march.label(), "Mar 2026");
        assert_eq!(march.to_string(), "2026-03");
        assert_eq!("2026-03".parse::<Month>().unwrap(), march);
        assert!("2026-13".parse::<Month>().is_err());
        assert!("march".parse::<Month>().is_err());
    }
}
