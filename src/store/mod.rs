use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::attendance::{AttendanceRecord, Status};
use crate::model::user::User;
use crate::rules::calendar::DateRange;

pub mod json_file;
pub mod mysql;

pub use json_file::JsonFileStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {user_id} already checked in on {date}")]
    DuplicateCheckIn { user_id: String, date: NaiveDate },

    #[error("attendance record {0} not found or already checked out")]
    MissingRecord(String),

    #[error("a user with email {0} already exists")]
    DuplicateUser(String),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Filter for attendance lookups. Results come back newest date first.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub user_id: Option<String>,
    pub range: Option<DateRange>,
    pub status: Option<Status>,
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn in_range(mut self, range: Option<DateRange>) -> Self {
        self.range = range;
        self
    }

    pub fn with_status(mut self, status: Option<Status>) -> Self {
        self.status = status;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.user_id.as_deref().is_none_or(|id| record.user_id == id)
            && self.range.is_none_or(|r| r.contains(record.date))
            && self.status.is_none_or(|s| record.status == s)
    }
}

/// Persistence for attendance records. Both backends enforce one record per
/// (user, date) inside `insert` and only close open records in
/// `update_checkout`.
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn find_by_user_and_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Insert-if-absent keyed on (user, date); `DuplicateCheckIn` otherwise.
    async fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// Persist check-out time, hours and status of a still-open record;
    /// `MissingRecord` when the record is gone or already closed.
    async fn update_checkout(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    async fn find_in_range(&self, query: &RecordQuery) -> Result<Vec<AttendanceRecord>, StoreError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Case-insensitive.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// `DuplicateUser` when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

/// Newest date first, then latest check-in first.
pub(crate) fn sort_newest_first(records: &mut [AttendanceRecord]) {
    records.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.check_in_time.cmp(&a.check_in_time))
    });
}
