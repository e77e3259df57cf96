use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};
use tracing::info;

use crate::model::attendance::{AttendanceRecord, Status};
use crate::model::role::Role;
use crate::model::user::User;
use crate::store::{AttendanceRepository, RecordQuery, StoreError, UserRepository};

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id VARCHAR(64) NOT NULL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL,
        password VARCHAR(255) NOT NULL,
        role VARCHAR(16) NOT NULL DEFAULT 'employee',
        employee_id VARCHAR(64) NULL,
        department VARCHAR(128) NOT NULL DEFAULT 'IT',
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE KEY uq_users_email (email)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id VARCHAR(64) NOT NULL PRIMARY KEY,
        user_id VARCHAR(64) NOT NULL,
        date DATE NOT NULL,
        check_in_time DATETIME(3) NOT NULL,
        check_out_time DATETIME(3) NULL,
        total_hours DOUBLE NULL DEFAULT 0,
        status VARCHAR(16) NOT NULL DEFAULT 'present',
        created_at DATETIME(3) NOT NULL,
        UNIQUE KEY uq_attendance_user_date (user_id, date),
        KEY idx_attendance_date (date)
    )
    "#,
];

const ATTENDANCE_COLUMNS: &str =
    "id, user_id, date, check_in_time, check_out_time, total_hours, status, created_at";

const USER_COLUMNS: &str = "id, name, email, password, role, employee_id, department";

/// MySQL backend. Uniqueness of (user_id, date) and of email is enforced by
/// the schema; duplicate-key errors surface as SQLSTATE 23000.
pub struct MySqlStore {
    pool: MySqlPool,
}

#[derive(FromRow)]
struct AttendanceRow {
    id: String,
    user_id: String,
    date: NaiveDate,
    check_in_time: DateTime<Utc>,
    check_out_time: Option<DateTime<Utc>>,
    total_hours: Option<f64>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = Status::from_str(&row.status)
            .map_err(|_| StoreError::Corrupt(format!("attendance {} has status {:?}", row.id, row.status)))?;

        Ok(AttendanceRecord {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            check_in_time: row.check_in_time,
            check_out_time: row.check_out_time,
            total_hours: row.total_hours.unwrap_or(0.0),
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password: String,
    role: String,
    employee_id: Option<String>,
    department: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .map_err(|_| StoreError::Corrupt(format!("user {} has role {:?}", row.id, row.role)))?;

        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            role,
            employee_id: row.employee_id,
            department: row.department,
        })
    }
}

// Typed binding for the dynamic WHERE clause
#[derive(Debug, PartialEq)]
enum FilterValue<'a> {
    Str(&'a str),
    Date(NaiveDate),
}

fn where_clause(query: &RecordQuery) -> (String, Vec<FilterValue<'_>>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut args = Vec::new();

    if let Some(user_id) = query.user_id.as_deref() {
        sql.push_str(" AND user_id = ?");
        args.push(FilterValue::Str(user_id));
    }
    if let Some(range) = &query.range {
        sql.push_str(" AND date BETWEEN ? AND ?");
        args.push(FilterValue::Date(range.start));
        args.push(FilterValue::Date(range.end));
    }
    if let Some(status) = &query.status {
        sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.as_str()));
    }

    (sql, args)
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

impl MySqlStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = MySqlPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("MySQL schema ready");
        Ok(())
    }
}

#[async_trait]
impl AttendanceRepository for MySqlStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = ?");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn find_by_user_and_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = ? AND date = ?");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (id, user_id, date, check_in_time, check_out_time, total_hours, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(record.date)
        .bind(record.check_in_time)
        .bind(record.check_out_time)
        .bind(record.total_hours)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::DuplicateCheckIn {
                user_id: record.user_id.clone(),
                date: record.date,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_checkout(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = ?, total_hours = ?, status = ?
            WHERE id = ?
            AND check_out_time IS NULL
            "#,
        )
        .bind(record.check_out_time)
        .bind(record.total_hours)
        .bind(record.status.as_str())
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRecord(record.id.clone()));
        }
        Ok(())
    }

    async fn find_in_range(&self, query: &RecordQuery) -> Result<Vec<AttendanceRecord>, StoreError> {
        let (where_sql, args) = where_clause(query);
        let limit_sql = if query.limit.is_some() { " LIMIT ?" } else { "" };
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance{where_sql} ORDER BY date DESC, check_in_time DESC{limit_sql}"
        );

        let mut q = sqlx::query_as::<_, AttendanceRow>(&sql);
        for arg in args {
            q = match arg {
                FilterValue::Str(s) => q.bind(s),
                FilterValue::Date(d) => q.bind(d),
            };
        }
        if let Some(limit) = query.limit {
            q = q.bind(limit as u64);
        }

        q.fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }
}

#[async_trait]
impl UserRepository for MySqlStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER(?)");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password, role, employee_id, department)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(user.email.to_lowercase())
        .bind(&user.password)
        .bind(user.role.as_str())
        .bind(&user.employee_id)
        .bind(&user.department)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::DuplicateUser(user.email.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name");
        sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::calendar::DateRange;

    #[test]
    fn where_clause_binds_in_order() {
        let range = DateRange::single(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        let query = RecordQuery::for_user("u1")
            .in_range(Some(range))
            .with_status(Some(Status::HalfDay));

        let (sql, args) = where_clause(&query);
        assert_eq!(
            sql,
            " WHERE 1=1 AND user_id = ? AND date BETWEEN ? AND ? AND status = ?"
        );
        assert_eq!(
            args,
            vec![
                FilterValue::Str("u1"),
                FilterValue::Date(range.start),
                FilterValue::Date(range.end),
                FilterValue::Str("half-day"),
            ]
        );
    }

    #[test]
    fn empty_query_has_no_filters() {
        let query = RecordQuery::default();
        let (sql, args) = where_clause(&query);
        assert_eq!(sql, " WHERE 1=1");
        assert!(args.is_empty());
    }

    #[test]
    fn null_hours_read_as_zero_and_bad_status_is_corrupt() {
        let at = DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z").unwrap().with_timezone(&Utc);
        let row = AttendanceRow {
            id: "r1".into(),
            user_id: "u1".into(),
            date: at.date_naive(),
            check_in_time: at,
            check_out_time: None,
            total_hours: None,
            status: "late".into(),
            created_at: at,
        };
        let record = AttendanceRecord::try_from(row).unwrap();
        assert_eq!(record.total_hours, 0.0);
        assert_eq!(record.status, Status::Late);

        let bad = AttendanceRow {
            id: "r2".into(),
            user_id: "u1".into(),
            date: at.date_naive(),
            check_in_time: at,
            check_out_time: None,
            total_hours: Some(1.0),
            status: "on-leave".into(),
            created_at: at,
        };
        assert!(matches!(AttendanceRecord::try_from(bad), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn user_rows_parse_roles() {
        let row = UserRow {
            id: "1".into(),
            name: "John Manager".into(),
            email: "manager@company.com".into(),
            password: "hash".into(),
            role: "manager".into(),
            employee_id: Some("MGR001".into()),
            department: "IT".into(),
        };
        assert_eq!(User::try_from(row).unwrap().role, Role::Manager);
    }
}
