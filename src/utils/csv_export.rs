use chrono::FixedOffset;

use crate::model::attendance::AttendanceRecord;
use crate::model::user::User;

const HEADER: [&str; 8] = [
    "Date",
    "Employee ID",
    "Name",
    "Department",
    "Check In",
    "Check Out",
    "Total Hours",
    "Status",
];

/// A record joined with its owner, when the owner still exists.
pub struct ExportRow<'a> {
    pub record: &'a AttendanceRecord,
    pub user: Option<&'a User>,
}

/// Quote a field containing a comma, quote or line break; quotes are doubled.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_row(row: &ExportRow<'_>, offset: &FixedOffset) -> String {
    let record = row.record;
    let time = |at: chrono::DateTime<chrono::Utc>| at.with_timezone(offset).format("%H:%M:%S").to_string();

    let fields = [
        record.date.to_string(),
        row.user.and_then(|u| u.employee_id.clone()).unwrap_or_default(),
        row.user.map(|u| u.name.clone()).unwrap_or_default(),
        row.user.map(|u| u.department.clone()).unwrap_or_default(),
        time(record.check_in_time),
        record.check_out_time.map(time).unwrap_or_default(),
        format!("{:.2}", record.total_hours),
        record.status.to_string(),
    ];

    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Header plus one line per row, times shown in the work timezone.
pub fn to_csv<'a>(rows: impl IntoIterator<Item = ExportRow<'a>>, offset: &FixedOffset) -> String {
    let mut output = HEADER.join(",");
    output.push('\n');

    for row in rows {
        output.push_str(&format_row(&row, offset));
        output.push('\n');
    }

    output
}
