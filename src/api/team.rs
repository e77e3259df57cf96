use std::collections::HashMap;

use actix_web::{HttpResponse, http::header, web};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::api::query::{RangeQuery, TeamQuery};
use crate::api::{RecordWithUser, by_user, employees, users_by_id, with_users};
use crate::auth::auth::AuthUser;
use crate::clock::WorkClock;
use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, Status};
use crate::model::user::UserProfile;
use crate::rules::calendar::{DateRange, WorkCalendar};
use crate::rules::summary::{Summary, summarize_as_of};
use crate::store::{AttendanceRepository, RecordQuery, UserRepository};
use crate::utils::csv_export::{ExportRow, to_csv};

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeSummary {
    pub user: UserProfile,
    pub summary: Summary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeamSummary {
    pub range: DateRange,
    pub employees: Vec<EmployeeSummary>,
    pub team: Summary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayStatus {
    pub user: UserProfile,
    #[schema(nullable = true)]
    pub attendance: Option<AttendanceRecord>,
    /// `absent` on a working day without a record, `null` on a day off
    #[schema(nullable = true)]
    pub status: Option<Status>,
}

/// All attendance records, filtered
#[utoipa::path(
    get,
    path = "/api/attendance/all",
    params(TeamQuery),
    responses(
        (status = 200, description = "Attendance records with their owners", body = [RecordWithUser]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Team"
)]
pub async fn all(
    auth: AuthUser,
    query: web::Query<TeamQuery>,
    store: web::Data<dyn AttendanceRepository>,
    users: web::Data<dyn UserRepository>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let filter = RecordQuery {
        user_id: query.user_id.clone(),
        ..RecordQuery::default()
    }
    .in_range(query.date.map(DateRange::single))
    .with_status(query.status);
    let records = store.find_in_range(&filter).await?;
    let users = users_by_id(users.get_ref()).await?;

    let rows: Vec<RecordWithUser> = with_users(records, &users)
        .into_iter()
        .filter(|row| in_department(row, query.department.as_deref()))
        .collect();

    Ok(HttpResponse::Ok().json(rows))
}

fn in_department(row: &RecordWithUser, department: Option<&str>) -> bool {
    department.is_none_or(|d| {
        row.user
            .as_ref()
            .is_some_and(|u| u.department.eq_ignore_ascii_case(d))
    })
}

/// One employee's records
#[utoipa::path(
    get,
    path = "/api/attendance/employee/{userId}",
    params(
        ("userId" = String, Path, description = "User id"),
        RangeQuery
    ),
    responses(
        (status = 200, description = "Attendance records, newest first", body = [AttendanceRecord]),
        (status = 403, description = "Manager only"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Team"
)]
pub async fn employee(
    auth: AuthUser,
    path: web::Path<String>,
    query: web::Query<RangeQuery>,
    store: web::Data<dyn AttendanceRepository>,
    users: web::Data<dyn UserRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;
    let user_id = path.into_inner();

    if users.find_user(&user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let range = query.range(clock.today())?;
    let records = store
        .find_in_range(&RecordQuery::for_user(user_id).in_range(range))
        .await?;

    Ok(HttpResponse::Ok().json(records))
}

/// Per-employee summaries and team totals for a period (default: this month)
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(RangeQuery, TeamQuery),
    responses(
        (status = 200, description = "Team summary", body = TeamSummary),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Team"
)]
pub async fn summary(
    auth: AuthUser,
    range: web::Query<RangeQuery>,
    team: web::Query<TeamQuery>,
    store: web::Data<dyn AttendanceRepository>,
    users: web::Data<dyn UserRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let today = clock.today();
    let range = range.range_or_month(today)?;
    let users = users_by_id(users.get_ref()).await?;
    let records = store
        .find_in_range(&RecordQuery::default().in_range(Some(range)))
        .await?;

    let mut per_user: HashMap<&str, Vec<AttendanceRecord>> = HashMap::new();
    for record in &records {
        per_user
            .entry(record.user_id.as_str())
            .or_default()
            .push(record.clone());
    }

    let employees: Vec<EmployeeSummary> = employees(&users, team.department.as_deref())
        .into_iter()
        .map(|user| {
            let own = per_user.get(user.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            EmployeeSummary {
                user: user.profile(),
                summary: summarize_as_of(own, &range, clock.calendar(), Some(today)),
            }
        })
        .collect();
    let team = Summary::combine(employees.iter().map(|e| &e.summary));

    Ok(HttpResponse::Ok().json(TeamSummary {
        range,
        employees,
        team,
    }))
}

/// Every employee with today's record and status
#[utoipa::path(
    get,
    path = "/api/attendance/today-status",
    responses(
        (status = 200, description = "Today's status per employee", body = [TodayStatus]),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Team"
)]
pub async fn today_status(
    auth: AuthUser,
    store: web::Data<dyn AttendanceRepository>,
    users: web::Data<dyn UserRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let today = clock.today();
    let working_day = clock.calendar().is_working_day(today);
    let users = users_by_id(users.get_ref()).await?;
    let records = store
        .find_in_range(&RecordQuery::default().in_range(Some(DateRange::single(today))))
        .await?;
    let todays = by_user(&records);

    let statuses: Vec<TodayStatus> = employees(&users, None)
        .into_iter()
        .map(|user| {
            let attendance = todays.get(user.id.as_str()).map(|r| (*r).clone());
            let status = match &attendance {
                Some(record) => Some(record.status),
                None if working_day => Some(Status::Absent),
                None => None,
            };
            TodayStatus {
                user: user.profile(),
                attendance,
                status,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(statuses))
}

/// Download attendance as CSV (default: this month)
#[utoipa::path(
    get,
    path = "/api/attendance/export",
    params(RangeQuery, TeamQuery),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Team"
)]
pub async fn export(
    auth: AuthUser,
    range: web::Query<RangeQuery>,
    team: web::Query<TeamQuery>,
    store: web::Data<dyn AttendanceRepository>,
    users: web::Data<dyn UserRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let today = clock.today();
    let range = match team.date {
        Some(day) => DateRange::single(day),
        None => range.range_or_month(today)?,
    };
    let filter = RecordQuery {
        user_id: team.user_id.clone(),
        ..RecordQuery::default()
    }
    .in_range(Some(range))
    .with_status(team.status);
    let records = store.find_in_range(&filter).await?;
    let users = users_by_id(users.get_ref()).await?;

    let rows = records
        .iter()
        .map(|record| ExportRow {
            record,
            user: users.get(&record.user_id),
        })
        .filter(|row| {
            team.department.as_deref().is_none_or(|d| {
                row.user.is_some_and(|u| u.department.eq_ignore_ascii_case(d))
            })
        });
    let csv = to_csv(rows, clock.offset());

    info!(
        manager = %auth.user_id,
        start = %range.start,
        end = %range.end,
        records = records.len(),
        "Attendance exported"
    );

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"attendance_{today}.csv\""),
        ))
        .body(csv))
}
