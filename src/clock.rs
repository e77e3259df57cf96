use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::model::attendance::local_date;
use crate::rules::calendar::WeekdayCalendar;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reports whatever instant it was last set to.
#[cfg(test)]
pub struct FixedClock(std::sync::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(std::sync::Mutex::new(at))
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.0.lock().unwrap() = at;
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// "Now" and "today" as seen from the office: the clock, the work timezone and
/// the working calendar in one shared handle.
#[derive(Clone)]
pub struct WorkClock {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    calendar: WeekdayCalendar,
}

impl WorkClock {
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset, calendar: WeekdayCalendar) -> Self {
        Self {
            clock,
            offset,
            calendar,
        }
    }

    pub fn system(offset: FixedOffset, calendar: WeekdayCalendar) -> Self {
        Self::new(Arc::new(SystemClock), offset, calendar)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        local_date(self.now(), &self.offset)
    }

    pub fn offset(&self) -> &FixedOffset {
        &self.offset
    }

    pub fn calendar(&self) -> &WeekdayCalendar {
        &self.calendar
    }
}
