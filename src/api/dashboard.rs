use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::query::TrendQuery;
use crate::api::{RecordWithUser, TeamStats, by_user, employees, users_by_id, with_users};
use crate::auth::auth::AuthUser;
use crate::clock::WorkClock;
use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, Status};
use crate::rules::calendar::{DateRange, WorkCalendar};
use crate::rules::summary::{Summary, daily_trend, summarize_as_of};
use crate::store::{AttendanceRepository, RecordQuery, UserRepository};

const RECENT_RECORDS: usize = 7;

#[derive(Debug, Serialize, ToSchema)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub hours: f64,
    pub status: Status,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDashboard {
    /// This month so far
    pub stats: Summary,
    /// Up to seven most recent records, newest first
    pub recent_attendance: Vec<AttendanceRecord>,
    /// The same records, oldest first
    pub weekly_trend: Vec<TrendPoint>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagerDashboard {
    pub stats: TeamStats,
    pub today_attendance: Vec<RecordWithUser>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentStats {
    pub department: String,
    #[serde(flatten)]
    pub stats: TeamStats,
}

async fn employee_dashboard(
    user_id: &str,
    store: &dyn AttendanceRepository,
    clock: &WorkClock,
) -> Result<EmployeeDashboard, ApiError> {
    let today = clock.today();
    let month = DateRange::month_of(today);

    let monthly = store
        .find_in_range(&RecordQuery::for_user(user_id).in_range(Some(month)))
        .await?;
    let stats = summarize_as_of(&monthly, &month, clock.calendar(), Some(today));

    let recent_attendance = store
        .find_in_range(
            &RecordQuery::for_user(user_id).limit(RECENT_RECORDS),
        )
        .await?;
    let weekly_trend = recent_attendance
        .iter()
        .rev()
        .map(|r| TrendPoint {
            date: r.date,
            hours: r.total_hours,
            status: r.status,
        })
        .collect();

    Ok(EmployeeDashboard {
        stats,
        recent_attendance,
        weekly_trend,
    })
}

/// My dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard/employee",
    responses(
        (status = 200, description = "Dashboard for the caller", body = EmployeeDashboard),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn employee(
    auth: AuthUser,
    store: web::Data<dyn AttendanceRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    let dashboard = employee_dashboard(&auth.user_id, store.get_ref(), &clock).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}

/// Another employee's dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard/employee/{userId}",
    params(
        ("userId" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Dashboard for that employee", body = EmployeeDashboard),
        (status = 403, description = "Manager only"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn employee_for(
    auth: AuthUser,
    path: web::Path<String>,
    store: web::Data<dyn AttendanceRepository>,
    users: web::Data<dyn UserRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;
    let user_id = path.into_inner();

    if users.find_user(&user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let dashboard = employee_dashboard(&user_id, store.get_ref(), &clock).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}

/// Today's team overview
#[utoipa::path(
    get,
    path = "/api/dashboard/manager",
    responses(
        (status = 200, description = "Team counts and today's records", body = ManagerDashboard),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn manager(
    auth: AuthUser,
    store: web::Data<dyn AttendanceRepository>,
    users: web::Data<dyn UserRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let today = clock.today();
    let users = users_by_id(users.get_ref()).await?;
    let records = store
        .find_in_range(&RecordQuery::default().in_range(Some(DateRange::single(today))))
        .await?;

    let stats = TeamStats::tally(
        employees(&users, None),
        &by_user(&records),
        clock.calendar().is_working_day(today),
    );

    Ok(HttpResponse::Ok().json(ManagerDashboard {
        stats,
        today_attendance: with_users(records, &users),
    }))
}

/// Today's counts per department
#[utoipa::path(
    get,
    path = "/api/dashboard/department-stats",
    responses(
        (status = 200, description = "Counts per department", body = [DepartmentStats]),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn department_stats(
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

    let staff = employees(&users, None);
    let mut departments: Vec<&str> = staff.iter().map(|u| u.department.as_str()).collect();
    departments.sort_unstable();
    departments.dedup();

    let stats: Vec<DepartmentStats> = departments
        .into_iter()
        .map(|department| DepartmentStats {
            department: department.to_string(),
            stats: TeamStats::tally(
                staff.iter().copied().filter(|u| u.department == department),
                &todays,
                working_day,
            ),
        })
        .collect();

    Ok(HttpResponse::Ok().json(stats))
}

/// Per-day counts for the last few days
///
/// Managers see the whole team; employees see only themselves.
#[utoipa::path(
    get,
    path = "/api/dashboard/weekly-trends",
    params(TrendQuery),
    responses(
        (status = 200, description = "One entry per day, oldest first", body = [DayTrend]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn weekly_trends(
    auth: AuthUser,
    query: web::Query<TrendQuery>,
    store: web::Data<dyn AttendanceRepository>,
    users: web::Data<dyn UserRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    let range = DateRange::last_days(clock.today(), query.days());

    let (records, headcount) = if auth.is_manager() {
        let users = users_by_id(users.get_ref()).await?;
        let staff: Vec<String> = employees(&users, None)
            .into_iter()
            .map(|u| u.id.clone())
            .collect();
        let records = store
            .find_in_range(&RecordQuery::default().in_range(Some(range)))
            .await?
            .into_iter()
            .filter(|r| staff.contains(&r.user_id))
            .collect::<Vec<_>>();
        (records, staff.len())
    } else {
        let records = store
            .find_in_range(&RecordQuery::for_user(&auth.user_id).in_range(Some(range)))
            .await?;
        (records, 1)
    };

    let trend = daily_trend(&records, &range, clock.calendar(), headcount);
    Ok(HttpResponse::Ok().json(trend))
}
