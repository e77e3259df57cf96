//! Attendance business rules: status classification, working calendars and
//! period aggregation. Everything here is pure; no storage, no clock.

pub mod calendar;
pub mod status;
pub mod summary;
