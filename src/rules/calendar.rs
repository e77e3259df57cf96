use std::collections::BTreeSet;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("start date {start} is after end date {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    #[error("invalid month {month} for year {year}; months run 0-11")]
    InvalidMonth { year: i32, month: u32 },
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// A whole month; `month` is zero-based the way the web client sends it.
    pub fn month(year: i32, month: u32) -> Result<Self, RangeError> {
        let start = month
            .checked_add(1)
            .and_then(|m| NaiveDate::from_ymd_opt(year, m, 1))
            .ok_or(RangeError::InvalidMonth { year, month })?;
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or(RangeError::InvalidMonth { year, month })?;
        Ok(Self { start, end })
    }

    /// The month containing `day`.
    pub fn month_of(day: NaiveDate) -> Self {
        let start = day.with_day(1).unwrap_or(day);
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(day);
        Self { start, end }
    }

    /// `days` days ending at `end`, both ends included. Zero is treated as one.
    pub fn last_days(end: NaiveDate, days: u32) -> Self {
        let back = u64::from(days.max(1) - 1);
        let start = end.checked_sub_days(Days::new(back)).unwrap_or(end);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The part of this range on or before `latest`, if any.
    pub fn until(&self, latest: NaiveDate) -> Option<Self> {
        if self.start > latest {
            return None;
        }
        Some(Self {
            start: self.start,
            end: self.end.min(latest),
        })
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

/// Decides which days an employee is expected to attend.
pub trait WorkCalendar: Send + Sync {
    fn is_working_day(&self, date: NaiveDate) -> bool;

    fn expected_days(&self, range: &DateRange) -> Vec<NaiveDate> {
        range.days().filter(|day| self.is_working_day(*day)).collect()
    }
}

/// Working days are every day outside the weekend and the holiday list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekdayCalendar {
    weekend: Vec<Weekday>,
    holidays: BTreeSet<NaiveDate>,
}

impl Default for WeekdayCalendar {
    fn default() -> Self {
        Self::new(vec![Weekday::Sat, Weekday::Sun], [])
    }
}

impl WeekdayCalendar {
    pub fn new(weekend: Vec<Weekday>, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            weekend,
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl WorkCalendar for WeekdayCalendar {
    fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.weekend.contains(&date.weekday()) && !self.holidays.contains(&date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rejects_inverted_ranges() {
        assert_eq!(
            DateRange::new(d(2026, 3, 5), d(2026, 3, 4)),
            Err(RangeError::Inverted {
                start: d(2026, 3, 5),
                end: d(2026, 3, 4)
            })
        );
        assert!(DateRange::new(d(2026, 3, 5), d(2026, 3, 5)).is_ok());
    }

    #[test]
    fn zero_based_months() {
        let jan = DateRange::month(2026, 0).unwrap();
        assert_eq!((jan.start, jan.end), (d(2026, 1, 1), d(2026, 1, 31)));

        let feb_leap = DateRange::month(2028, 1).unwrap();
        assert_eq!(feb_leap.end, d(2028, 2, 29));

        let dec = DateRange::month(2026, 11).unwrap();
        assert_eq!((dec.start, dec.end), (d(2026, 12, 1), d(2026, 12, 31)));

        assert!(DateRange::month(2026, 12).is_err());
    }

    #[test]
    fn month_of_any_day() {
        let r = DateRange::month_of(d(2026, 4, 17));
        assert_eq!((r.start, r.end), (d(2026, 4, 1), d(2026, 4, 30)));
    }

    #[test]
    fn inclusive_bounds() {
        let r = DateRange::new(d(2026, 3, 2), d(2026, 3, 6)).unwrap();
        assert!(r.contains(d(2026, 3, 2)));
        assert!(r.contains(d(2026, 3, 6)));
        assert!(!r.contains(d(2026, 3, 1)));
        assert!(!r.contains(d(2026, 3, 7)));
        assert_eq!(r.days().count(), 5);
    }

    #[test]
    fn last_days_counts_the_end_day() {
        let r = DateRange::last_days(d(2026, 3, 7), 7);
        assert_eq!(r.start, d(2026, 3, 1));
        assert_eq!(DateRange::last_days(d(2026, 3, 7), 0), DateRange::single(d(2026, 3, 7)));
    }

    #[test]
    fn until_cuts_off_future_days() {
        let r = DateRange::month(2026, 2).unwrap();
        assert_eq!(r.until(d(2026, 3, 10)).unwrap().end, d(2026, 3, 10));
        assert_eq!(r.until(d(2026, 4, 10)), Some(r));
        assert_eq!(r.until(d(2026, 2, 27)), None);
    }

    #[test]
    fn weekends_and_holidays_are_not_expected() {
        // 2026-03-02 is a Monday
        let calendar = WeekdayCalendar::with_holidays([d(2026, 3, 4)]);
        let week = DateRange::new(d(2026, 3, 2), d(2026, 3, 8)).unwrap();
        assert_eq!(
            calendar.expected_days(&week),
            vec![d(2026, 3, 2), d(2026, 3, 3), d(2026, 3, 5), d(2026, 3, 6)]
        );
    }

    #[test]
    fn custom_weekend() {
        let calendar = WeekdayCalendar::new(vec![Weekday::Fri, Weekday::Sat], []);
        assert!(!calendar.is_working_day(d(2026, 3, 6)));
        assert!(calendar.is_working_day(d(2026, 3, 8)));
    }
}
