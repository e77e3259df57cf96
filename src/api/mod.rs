use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, Status};
use crate::model::user::{User, UserProfile};
use crate::store::UserRepository;

pub mod attendance;
pub mod dashboard;
pub mod query;
pub mod team;


/// An attendance record together with the profile of its owner.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordWithUser {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    #[schema(nullable = true)]
    pub user: Option<UserProfile>,
}

/// Today's counts for a group of employees. Employees with no record count as
/// absent on working days only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub total_employees: usize,
    pub present: usize,
    pub late: usize,
    pub half_day: usize,
    pub absent: usize,
}

impl TeamStats {
    pub(crate) fn tally<'a>(
        employees: impl IntoIterator<Item = &'a User>,
        today: &HashMap<&str, &AttendanceRecord>,
        working_day: bool,
    ) -> Self {
        let mut stats = TeamStats::default();
        for employee in employees {
            stats.total_employees += 1;
            match today.get(employee.id.as_str()).map(|r| r.status) {
                Some(Status::Present) => stats.present += 1,
                Some(Status::Late) => stats.late += 1,
                Some(Status::HalfDay) => stats.half_day += 1,
                Some(Status::Absent) => stats.absent += 1,
                None if working_day => stats.absent += 1,
                None => {}
            }
        }
        stats
    }
}

pub(crate) async fn users_by_id(users: &dyn UserRepository) -> Result<HashMap<String, User>, ApiError> {
    Ok(users
        .list_users()
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect())
}

/// Everyone but managers, ordered by employee code then name.
pub(crate) fn employees<'a>(
    users: &'a HashMap<String, User>,
    department: Option<&str>,
) -> Vec<&'a User> {
    let mut list: Vec<&'a User> = users
        .values()
        .filter(|u| !u.is_manager())
        .filter(|u| department.is_none_or(|d| u.department.eq_ignore_ascii_case(d)))
        .collect();
    list.sort_by(|a, b| {
        a.employee_id
            .cmp(&b.employee_id)
            .then_with(|| a.name.cmp(&b.name))
    });
    list
}

pub(crate) fn with_users(
    records: Vec<AttendanceRecord>,
    users: &HashMap<String, User>,
) -> Vec<RecordWithUser> {
    records
        .into_iter()
        .map(|record| {
            let user = users.get(&record.user_id).map(User::profile);
            RecordWithUser { record, user }
        })
        .collect()
}

/// Records keyed by owner. The input must hold at most one record per user.
pub(crate) fn by_user(records: &[AttendanceRecord]) -> HashMap<&str, &AttendanceRecord> {
    records.iter().map(|r| (r.user_id.as_str(), r)).collect()
}
