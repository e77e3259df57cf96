use actix_web::{HttpResponse, web};
use tracing::{info, warn};

use crate::api::query::RangeQuery;
use crate::auth::auth::AuthUser;
use crate::clock::WorkClock;
use crate::error::ApiError;
use crate::model::attendance::AttendanceRecord;
use crate::rules::summary::summarize_as_of;
use crate::store::{AttendanceRepository, RecordQuery, StoreError};

/// Check in for today
#[utoipa::path(
    post,
    path = "/api/attendance/checkin",
    responses(
        (status = 200, description = "Checked in", body = AttendanceRecord),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    store: web::Data<dyn AttendanceRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    let record = AttendanceRecord::check_in(&auth.user_id, clock.now(), clock.offset())?;

    if store
        .find_by_user_and_date(&auth.user_id, record.date)
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("Already checked in today"));
    }

    // the store re-checks (user, date) atomically; a racing duplicate fails here
    store.insert(&record).await?;

    info!(
        user_id = %auth.user_id,
        record_id = %record.id,
        status = %record.status,
        "Checked in"
    );
    Ok(HttpResponse::Ok().json(record))
}

/// Check out of an open attendance record
#[utoipa::path(
    put,
    path = "/api/attendance/checkout/{id}",
    params(
        ("id" = String, Path, description = "Attendance record id")
    ),
    responses(
        (status = 200, description = "Checked out", body = AttendanceRecord),
        (status = 400, description = "Already checked out", body = Object, example = json!({
            "message": "Already checked out"
        })),
        (status = 401, description = "Not authorized", body = Object, example = json!({
            "message": "Not authorized"
        })),
        (status = 404, description = "Attendance record not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    path: web::Path<String>,
    store: web::Data<dyn AttendanceRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let record = store
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Attendance record not found"))?;

    if record.user_id != auth.user_id {
        warn!(user_id = %auth.user_id, record_id = %id, "Check-out of another user's record");
        return Err(ApiError::unauthorized("Not authorized"));
    }

    if !record.is_open() {
        return Err(ApiError::bad_request("Already checked out"));
    }

    let closed = record.check_out(clock.now(), clock.offset())?;

    store.update_checkout(&closed).await.map_err(|e| match e {
        StoreError::MissingRecord(_) => ApiError::bad_request("Already checked out"),
        other => other.into(),
    })?;

    info!(
        user_id = %auth.user_id,
        record_id = %closed.id,
        total_hours = closed.total_hours,
        status = %closed.status,
        "Checked out"
    );
    Ok(HttpResponse::Ok().json(closed))
}

/// My attendance records, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/my-history",
    params(RangeQuery),
    responses(
        (status = 200, description = "Attendance records, newest first", body = [AttendanceRecord]),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_history(
    auth: AuthUser,
    query: web::Query<RangeQuery>,
    store: web::Data<dyn AttendanceRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    let range = query.range(clock.today())?;
    let records = store
        .find_in_range(&RecordQuery::for_user(&auth.user_id).in_range(range))
        .await?;

    Ok(HttpResponse::Ok().json(records))
}

/// Summary of my attendance for a period (default: this month)
#[utoipa::path(
    get,
    path = "/api/attendance/my-summary",
    params(RangeQuery),
    responses(
        (status = 200, description = "Attendance summary", body = Summary),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_summary(
    auth: AuthUser,
    query: web::Query<RangeQuery>,
    store: web::Data<dyn AttendanceRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    let today = clock.today();
    let range = query.range_or_month(today)?;
    let records = store
        .find_in_range(&RecordQuery::for_user(&auth.user_id).in_range(Some(range)))
        .await?;

    let summary = summarize_as_of(&records, &range, clock.calendar(), Some(today));
    Ok(HttpResponse::Ok().json(summary))
}

/// Today's record, or `null` before check-in
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's record or null", body = AttendanceRecord),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    store: web::Data<dyn AttendanceRepository>,
    clock: web::Data<WorkClock>,
) -> Result<HttpResponse, ApiError> {
    let record = store
        .find_by_user_and_date(&auth.user_id, clock.today())
        .await?;

    Ok(HttpResponse::Ok().json(record))
}
