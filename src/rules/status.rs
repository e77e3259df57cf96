use chrono::{DateTime, TimeZone, Timelike, Utc};
use thiserror::Error;

use crate::model::attendance::Status;

/// Seconds after local midnight of the last on-time check-in (09:30:00).
pub const LATE_AFTER_SECS: u32 = 9 * 3600 + 30 * 60;

/// A worked span shorter than this is a half day.
pub const HALF_DAY_HOURS: f64 = 4.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("check-out at {check_out} is not after check-in at {check_in}")]
    InvalidInterval {
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    },
}

/// True when the check-in's local time of day is strictly after 09:30:00.
pub fn is_late<Tz: TimeZone>(check_in: &DateTime<Tz>) -> bool {
    let secs = check_in.num_seconds_from_midnight();
    secs > LATE_AFTER_SECS || (secs == LATE_AFTER_SECS && check_in.nanosecond() > 0)
}

/// Hours between two instants, millisecond precision.
pub fn hours_between<Tz: TimeZone>(from: &DateTime<Tz>, to: &DateTime<Tz>) -> f64 {
    to.clone().signed_duration_since(from.clone()).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Classify one day of attendance.
///
/// `check_in` must already be expressed in the work timezone: lateness is read
/// from its local wall-clock time. A span under [`HALF_DAY_HOURS`] is a half
/// day even when the check-in was also late. `Status::Absent` is never
/// returned; absence means there is no check-in at all.
pub fn classify<Tz: TimeZone>(
    check_in: &DateTime<Tz>,
    check_out: Option<&DateTime<Tz>>,
) -> Result<Status, ClassifyError> {
    if let Some(check_out) = check_out {
        if check_out <= check_in {
            return Err(ClassifyError::InvalidInterval {
                check_in: check_in.with_timezone(&Utc),
                check_out: check_out.with_timezone(&Utc),
            });
        }
        if hours_between(check_in, check_out) < HALF_DAY_HOURS {
            return Ok(Status::HalfDay);
        }
    }

    if is_late(check_in) {
        Ok(Status::Late)
    } else {
        Ok(Status::Present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, s).unwrap()
    }

    #[test]
    fn early_and_on_time_check_ins_are_present() {
        for (h, m) in [(0, 0), (7, 45), (8, 59), (9, 0), (9, 29), (9, 30)] {
            assert_eq!(classify(&at(h, m, 0), None), Ok(Status::Present), "{h}:{m}");
        }
    }

    #[test]
    fn lateness_starts_one_second_after_half_past_nine() {
        assert_eq!(classify(&at(9, 30, 0), None), Ok(Status::Present));
        assert_eq!(classify(&at(9, 30, 1), None), Ok(Status::Late));
        assert_eq!(classify(&at(9, 31, 0), None), Ok(Status::Late));
        assert_eq!(classify(&at(10, 0, 0), None), Ok(Status::Late));
        assert_eq!(classify(&at(23, 59, 59), None), Ok(Status::Late));
    }

    #[test]
    fn sub_second_past_threshold_is_late() {
        let check_in = at(9, 30, 0) + Duration::milliseconds(1);
        assert!(is_late(&check_in));
    }

    #[test]
    fn short_day_overrides_lateness() {
        let check_in = at(8, 0, 0);
        let check_out = at(10, 30, 0);
        assert_eq!(classify(&check_in, Some(&check_out)), Ok(Status::HalfDay));

        let late_in = at(11, 0, 0);
        let late_out = at(14, 59, 59);
        assert_eq!(classify(&late_in, Some(&late_out)), Ok(Status::HalfDay));
    }

    #[test]
    fn exactly_four_hours_falls_back_to_lateness() {
        let check_in = at(8, 0, 0);
        assert_eq!(classify(&check_in, Some(&at(12, 0, 0))), Ok(Status::Present));

        let late_in = at(10, 0, 0);
        assert_eq!(classify(&late_in, Some(&at(14, 0, 0))), Ok(Status::Late));
    }

    #[test]
    fn just_under_four_hours_is_half_day() {
        let check_in = at(8, 0, 0);
        let check_out = check_in + Duration::hours(4) - Duration::milliseconds(1);
        assert_eq!(classify(&check_in, Some(&check_out)), Ok(Status::HalfDay));
    }

    #[test]
    fn check_out_before_check_in_is_rejected() {
        let check_in = at(9, 0, 0);
        let check_out = at(8, 0, 0);
        assert_eq!(
            classify(&check_in, Some(&check_out)),
            Err(ClassifyError::InvalidInterval { check_in, check_out })
        );
    }

    #[test]
    fn zero_length_interval_is_rejected() {
        let check_in = at(9, 0, 0);
        assert!(classify(&check_in, Some(&check_in)).is_err());
    }

    #[test]
    fn lateness_uses_the_local_wall_clock() {
        // 04:15 UTC is 09:45 in UTC+05:30
        let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let utc = at(4, 15, 0);
        assert_eq!(classify(&utc, None), Ok(Status::Present));
        assert_eq!(classify(&utc.with_timezone(&offset), None), Ok(Status::Late));
    }

    #[test]
    fn hours_between_is_fractional() {
        assert_eq!(hours_between(&at(8, 0, 0), &at(10, 30, 0)), 2.5);
        assert_eq!(hours_between(&at(8, 0, 0), &at(7, 0, 0)), -1.0);
    }
}
