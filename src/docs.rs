use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::api::dashboard::{DepartmentStats, EmployeeDashboard, ManagerDashboard, TrendPoint};
use crate::api::query::{RangeQuery, TeamQuery, TrendQuery};
use crate::api::team::{EmployeeSummary, TeamSummary, TodayStatus};
use crate::api::{RecordWithUser, TeamStats};
use crate::model::attendance::{AttendanceRecord, Status};
use crate::model::role::Role;
use crate::model::user::UserProfile;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};
use crate::rules::calendar::DateRange;
use crate::rules::summary::{DayTrend, Summary};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracking

Daily check-in and check-out for employees, with history, monthly summaries,
dashboards and CSV export for managers.

### Status rules
- **late**: checked in after 09:30 (work timezone)
- **half-day**: worked less than 4 hours
- **present**: otherwise
- **absent**: a working day without a record

### Security
Every endpoint except health, login, register and refresh needs a
**JWT Bearer** access token. Team views are **manager only**.

### Dates
`month` query parameters are zero-based (0 = January).
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::register,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::me,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_history,
        crate::api::attendance::my_summary,
        crate::api::attendance::today,

        crate::api::team::all,
        crate::api::team::employee,
        crate::api::team::summary,
        crate::api::team::today_status,
        crate::api::team::export,

        crate::api::dashboard::employee,
        crate::api::dashboard::employee_for,
        crate::api::dashboard::manager,
        crate::api::dashboard::department_stats,
        crate::api::dashboard::weekly_trends
    ),
    components(
        schemas(
            AttendanceRecord,
            Status,
            Role,
            UserProfile,
            LoginRequest,
            RegisterRequest,
            AuthResponse,
            Summary,
            DayTrend,
            DateRange,
            RangeQuery,
            TeamQuery,
            TrendQuery,
            RecordWithUser,
            TeamStats,
            EmployeeSummary,
            TeamSummary,
            TodayStatus,
            EmployeeDashboard,
            ManagerDashboard,
            DepartmentStats,
            TrendPoint
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, registration and tokens"),
        (name = "Attendance", description = "Self-service check-in, check-out and history"),
        (name = "Team", description = "Manager views of team attendance"),
        (name = "Dashboard", description = "Dashboard and trend data"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme the paths refer to.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
