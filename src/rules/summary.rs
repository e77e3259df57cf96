use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceRecord, Status};
use crate::rules::calendar::{DateRange, WeekdayCalendar, WorkCalendar};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Attendance totals over one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "totalDays": 3,
    "presentDays": 1,
    "lateDays": 1,
    "halfDays": 1,
    "absentDays": 0,
    "totalHours": 18.5,
    "attendancePercentage": 100.0
}))]
pub struct Summary {
    pub total_days: usize,
    pub present_days: usize,
    pub late_days: usize,
    pub half_days: usize,
    pub absent_days: usize,
    pub total_hours: f64,
    pub attendance_percentage: f64,
}

impl Summary {
    /// Records that count as attended (present, late or half day).
    pub fn attended_days(&self) -> usize {
        self.present_days + self.late_days + self.half_days
    }

    /// Fold several summaries (e.g. one per employee) into a team total.
    pub fn combine<'a>(parts: impl IntoIterator<Item = &'a Summary>) -> Summary {
        let mut total = Summary::default();
        let mut millis = 0i64;
        for part in parts {
            total.total_days += part.total_days;
            total.present_days += part.present_days;
            total.late_days += part.late_days;
            total.half_days += part.half_days;
            total.absent_days += part.absent_days;
            millis += hours_to_millis(part.total_hours);
        }
        total.total_hours = millis as f64 / MILLIS_PER_HOUR;
        total.attendance_percentage = percentage(total.attended_days(), total.total_days);
        total
    }
}

/// Per-day team or personal counts, used for trend charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayTrend {
    pub date: NaiveDate,
    pub present: usize,
    pub late: usize,
    pub half_day: usize,
    pub absent: usize,
    pub total_hours: f64,
}

/// Summarize `records` over `range` with the default Monday-Friday calendar.
pub fn summarize(records: &[AttendanceRecord], range: &DateRange) -> Summary {
    summarize_with(records, range, &WeekdayCalendar::default())
}

/// Summarize `records` over `range`. Records outside the range are ignored;
/// the caller has already scoped them to a user or team.
pub fn summarize_with<C>(records: &[AttendanceRecord], range: &DateRange, calendar: &C) -> Summary
where
    C: WorkCalendar + ?Sized,
{
    summarize_as_of(records, range, calendar, None)
}

/// Like [`summarize_with`], but expected days after `today` are never counted
/// as absences.
pub fn summarize_as_of<C>(
    records: &[AttendanceRecord],
    range: &DateRange,
    calendar: &C,
    today: Option<NaiveDate>,
) -> Summary
where
    C: WorkCalendar + ?Sized,
{
    let mut summary = Summary::default();
    let mut attended_on = HashSet::new();
    let mut millis = 0i64;

    for record in records.iter().filter(|r| range.contains(r.date)) {
        summary.total_days += 1;
        match record.status {
            Status::Present => summary.present_days += 1,
            Status::Late => summary.late_days += 1,
            Status::HalfDay => summary.half_days += 1,
            Status::Absent => {}
        }
        if record.attended() {
            attended_on.insert(record.date);
        }
        millis += hours_to_millis(record.total_hours);
    }

    let counted = match today {
        Some(today) => range.until(today),
        None => Some(*range),
    };
    summary.absent_days = counted
        .map(|r| {
            calendar
                .expected_days(&r)
                .into_iter()
                .filter(|day| !attended_on.contains(day))
                .count()
        })
        .unwrap_or(0);

    summary.total_hours = millis as f64 / MILLIS_PER_HOUR;
    summary.attendance_percentage = percentage(summary.attended_days(), summary.total_days);
    summary
}

/// One [`DayTrend`] per day of `range`. `headcount` is how many people are
/// expected on a working day; days with fewer attended records report the
/// rest as absent.
pub fn daily_trend<C>(
    records: &[AttendanceRecord],
    range: &DateRange,
    calendar: &C,
    headcount: usize,
) -> Vec<DayTrend>
where
    C: WorkCalendar + ?Sized,
{
    let mut days: BTreeMap<NaiveDate, (DayTrend, i64)> = range
        .days()
        .map(|date| {
            let trend = DayTrend {
                date,
                ..DayTrend::default()
            };
            (date, (trend, 0))
        })
        .collect();

    for record in records {
        let Some((trend, millis)) = days.get_mut(&record.date) else {
            continue;
        };
        match record.status {
            Status::Present => trend.present += 1,
            Status::Late => trend.late += 1,
            Status::HalfDay => trend.half_day += 1,
            Status::Absent => trend.absent += 1,
        }
        *millis += hours_to_millis(record.total_hours);
    }

    days.into_values()
        .map(|(mut trend, millis)| {
            if calendar.is_working_day(trend.date) {
                let attended = trend.present + trend.late + trend.half_day;
                trend.absent = trend.absent.max(headcount.saturating_sub(attended));
            }
            trend.total_hours = millis as f64 / MILLIS_PER_HOUR;
            trend
        })
        .collect()
}

/// Hours summed as whole milliseconds so the total does not depend on order.
fn hours_to_millis(hours: f64) -> i64 {
    if hours.is_finite() {
        (hours * MILLIS_PER_HOUR).round() as i64
    } else {
        0
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = part as f64 / whole as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn record(day: u32, status: Status, hours: f64) -> AttendanceRecord {
        let check_in: DateTime<Utc> = d(day).and_hms_opt(9, 0, 0).unwrap().and_utc();
        AttendanceRecord {
            id: format!("r{day}-{status}"),
            user_id: "u1".into(),
            date: d(day),
            check_in_time: check_in,
            check_out_time: None,
            total_hours: hours,
            status,
            created_at: check_in,
        }
    }

    // Monday 2 .. Friday 6 March 2026
    fn work_week() -> DateRange {
        DateRange::new(d(2), d(6)).unwrap()
    }

    #[test]
    fn totals_by_status() {
        let records = vec![
            record(2, Status::Present, 8.0),
            record(3, Status::Late, 7.5),
            record(4, Status::HalfDay, 3.0),
        ];
        let summary = summarize(&records, &work_week());
        assert_eq!(summary.total_days, 3);
        assert_eq!(summary.present_days, 1);
        assert_eq!(summary.late_days, 1);
        assert_eq!(summary.half_days, 1);
        assert_eq!(summary.total_hours, 18.5);
        assert_eq!(summary.attendance_percentage, 100.0);
        // Thursday and Friday have no record
        assert_eq!(summary.absent_days, 2);
    }

    #[test]
    fn empty_input_has_zero_percentage() {
        let summary = summarize(&[], &work_week());
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.attendance_percentage, 0.0);
        assert_eq!(summary.total_hours, 0.0);
        assert_eq!(summary.absent_days, 5);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let records = vec![
            record(1, Status::Present, 8.0),
            record(2, Status::Present, 8.0),
            record(6, Status::Present, 8.0),
            record(7, Status::Present, 8.0),
        ];
        let summary = summarize(&records, &work_week());
        assert_eq!(summary.total_days, 2);
        assert_eq!(summary.total_hours, 16.0);
    }

    #[test]
    fn explicit_absences_lower_the_percentage() {
        let records = vec![
            record(2, Status::Present, 8.0),
            record(3, Status::Absent, 0.0),
            record(4, Status::Late, 8.0),
        ];
        let summary = summarize(&records, &work_week());
        assert_eq!(summary.total_days, 3);
        assert_eq!(summary.attendance_percentage, 66.7);
        // Tuesday's absent record does not count as attended
        assert_eq!(summary.absent_days, 3);
    }

    #[test]
    fn open_records_contribute_no_hours() {
        let mut open = record(2, Status::Present, 0.0);
        open.total_hours = f64::NAN;
        let summary = summarize(&[open, record(3, Status::Late, 6.25)], &work_week());
        assert_eq!(summary.total_hours, 6.25);
    }

    #[test]
    fn future_days_are_not_absences() {
        let records = vec![record(2, Status::Present, 8.0)];
        let calendar = WeekdayCalendar::default();
        let summary = summarize_as_of(&records, &work_week(), &calendar, Some(d(3)));
        assert_eq!(summary.absent_days, 1);

        let before = summarize_as_of(&records, &work_week(), &calendar, Some(d(1)));
        assert_eq!(before.absent_days, 0);
        assert_eq!(before.total_days, 1);
    }

    #[test]
    fn holidays_are_not_absences() {
        let calendar = WeekdayCalendar::with_holidays([d(5), d(6)]);
        let summary = summarize_with(&[record(2, Status::Present, 8.0)], &work_week(), &calendar);
        assert_eq!(summary.absent_days, 2);
    }

    #[test]
    fn combine_recomputes_the_percentage() {
        let a = summarize(&[record(2, Status::Present, 8.0)], &work_week());
        let b = summarize(
            &[record(2, Status::Absent, 0.0), record(3, Status::HalfDay, 2.5)],
            &work_week(),
        );
        let team = Summary::combine([&a, &b]);
        assert_eq!(team.total_days, 3);
        assert_eq!(team.present_days, 1);
        assert_eq!(team.half_days, 1);
        assert_eq!(team.total_hours, 10.5);
        assert_eq!(team.attendance_percentage, 66.7);
        assert_eq!(team.absent_days, a.absent_days + b.absent_days);
    }

    #[test]
    fn daily_trend_fills_absent_headcount() {
        let records = vec![
            record(2, Status::Present, 8.0),
            record(2, Status::Late, 7.0),
            record(3, Status::HalfDay, 3.0),
        ];
        let range = DateRange::new(d(2), d(8)).unwrap();
        let trend = daily_trend(&records, &range, &WeekdayCalendar::default(), 3);
        assert_eq!(trend.len(), 7);
        assert_eq!((trend[0].present, trend[0].late, trend[0].absent), (1, 1, 1));
        assert_eq!(trend[0].total_hours, 15.0);
        assert_eq!((trend[1].half_day, trend[1].absent), (1, 2));
        assert_eq!(trend[2].absent, 3);
        // weekend
        assert_eq!(trend[5].absent, 0);
        assert_eq!(trend[6].date, d(8));
    }

    fn arb_status() -> impl Strategy<Value = Status> {
        prop_oneof![
            Just(Status::Present),
            Just(Status::Late),
            Just(Status::HalfDay),
            Just(Status::Absent),
        ]
    }

    fn records_and_shuffle() -> impl Strategy<Value = (Vec<AttendanceRecord>, Vec<AttendanceRecord>)> {
        prop::collection::vec((1u32..=31, arb_status(), 0.0f64..12.0), 0..40)
            .prop_map(|entries| {
                entries
                    .into_iter()
                    .map(|(day, status, hours)| record(day, status, hours))
                    .collect::<Vec<_>>()
            })
            .prop_flat_map(|records| (Just(records.clone()), Just(records).prop_shuffle()))
    }

    proptest! {
        #[test]
        fn order_does_not_change_the_summary((records, shuffled) in records_and_shuffle()) {
            let range = DateRange::new(d(3), d(27)).unwrap();
            prop_assert_eq!(summarize(&records, &range), summarize(&shuffled, &range));

            let mut reversed = records.clone();
            reversed.reverse();
            prop_assert_eq!(summarize(&records, &range), summarize(&reversed, &range));
        }
    }
}
