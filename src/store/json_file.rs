use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::model::attendance::AttendanceRecord;
use crate::model::user::User;
use crate::store::{AttendanceRepository, RecordQuery, StoreError, UserRepository, sort_newest_first};

/// On-disk layout: one JSON document holding every collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    attendance: Vec<AttendanceRecord>,
}

/// Flat JSON file backend.
///
/// The whole document lives in memory behind a lock. Every mutation is applied
/// to a copy, written to `<path>.tmp`, renamed over the real file and only then
/// published, so readers never observe a write that failed to reach disk.
pub struct JsonFileStore {
    path: PathBuf,
    doc: RwLock<Document>,
}

impl JsonFileStore {
    /// Load `path`, creating it with empty collections when missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let (doc, existed) = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => (Document::default(), false),
            Ok(bytes) => (serde_json::from_slice(&bytes)?, true),
            Err(e) if e.kind() == ErrorKind::NotFound => (Document::default(), false),
            Err(e) => return Err(e.into()),
        };

        info!(
            path = %path.display(),
            users = doc.users.len(),
            attendance = doc.attendance.len(),
            "JSON store loaded"
        );

        let store = Self {
            path,
            doc: RwLock::new(doc),
        };

        if !existed {
            let doc = store.doc.read().await;
            write_atomic(&store.path, &doc).await?;
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn write_atomic(path: &Path, doc: &Document) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(doc)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), "JSON store written");
    Ok(())
}

#[async_trait]
impl AttendanceRepository for JsonFileStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        let doc = self.doc.read().await;
        Ok(doc.attendance.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_user_and_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let doc = self.doc.read().await;
        Ok(doc
            .attendance
            .iter()
            .find(|r| r.user_id == user_id && r.date == date)
            .cloned())
    }

    async fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let mut doc = self.doc.write().await;

        if doc
            .attendance
            .iter()
            .any(|r| r.user_id == record.user_id && r.date == record.date)
        {
            return Err(StoreError::DuplicateCheckIn {
                user_id: record.user_id.clone(),
                date: record.date,
            });
        }

        let mut next = doc.clone();
        next.attendance.push(record.clone());
        write_atomic(&self.path, &next).await?;
        *doc = next;
        Ok(())
    }

    async fn update_checkout(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let mut doc = self.doc.write().await;

        let Some(index) = doc
            .attendance
            .iter()
            .position(|r| r.id == record.id && r.is_open())
        else {
            return Err(StoreError::MissingRecord(record.id.clone()));
        };

        let mut next = doc.clone();
        let stored = &mut next.attendance[index];
        stored.check_out_time = record.check_out_time;
        stored.total_hours = record.total_hours;
        stored.status = record.status;

        write_atomic(&self.path, &next).await?;
        *doc = next;
        Ok(())
    }

    async fn find_in_range(&self, query: &RecordQuery) -> Result<Vec<AttendanceRecord>, StoreError> {
        let doc = self.doc.read().await;
        let mut records: Vec<_> = doc
            .attendance
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        sort_newest_first(&mut records);
        if let Some(limit) = query.limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}

#[async_trait]
impl UserRepository for JsonFileStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let doc = self.doc.read().await;
        Ok(doc.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let doc = self.doc.read().await;
        Ok(doc
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut doc = self.doc.write().await;

        if doc.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::DuplicateUser(user.email.clone()));
        }

        let mut next = doc.clone();
        next.users.push(user.clone());
        write_atomic(&self.path, &next).await?;
        *doc = next;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let doc = self.doc.read().await;
        Ok(doc.users.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::Status;
    use crate::model::role::Role;
    use crate::rules::calendar::DateRange;
    use chrono::{FixedOffset, TimeZone, Utc};
    use std::sync::Arc;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            name: format!("User {id}"),
            email: email.into(),
            password: "x".into(),
            role: Role::Employee,
            employee_id: Some(format!("EMP{id}")),
            department: "IT".into(),
        }
    }

    async fn open_temp() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json")).await.unwrap();
        (dir, store)
    }

    #[actix_web::test]
    async fn creates_missing_file_with_empty_collections() {
        let (dir, store) = open_temp().await;
        let raw = std::fs::read_to_string(dir.path().join("db.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["users"], serde_json::json!([]));
        assert_eq!(value["attendance"], serde_json::json!([]));
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn second_check_in_same_day_is_rejected() {
        let (_dir, store) = open_temp().await;
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let first = AttendanceRecord::check_in("u1", at, &utc()).unwrap();
        store.insert(&first).await.unwrap();

        let again = AttendanceRecord::check_in("u1", at + chrono::Duration::hours(2), &utc()).unwrap();
        assert!(matches!(
            store.insert(&again).await,
            Err(StoreError::DuplicateCheckIn { .. })
        ));

        let other_user = AttendanceRecord::check_in("u2", at, &utc()).unwrap();
        store.insert(&other_user).await.unwrap();
        assert_eq!(store.find_in_range(&RecordQuery::default()).await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn concurrent_check_ins_insert_once() {
        let (_dir, store) = open_temp().await;
        let store = Arc::new(store);
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();

        let attempts = (0..8).map(|i| {
            let store = store.clone();
            async move {
                let record =
                    AttendanceRecord::check_in("u1", at + chrono::Duration::seconds(i), &utc()).unwrap();
                store.insert(&record).await
            }
        });
        let results = futures::future::join_all(attempts).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(store.find_in_range(&RecordQuery::default()).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn check_out_only_closes_open_records() {
        let (_dir, store) = open_temp().await;
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let record = AttendanceRecord::check_in("u1", at, &utc()).unwrap();
        store.insert(&record).await.unwrap();

        let closed = record.check_out(at + chrono::Duration::hours(8), &utc()).unwrap();
        store.update_checkout(&closed).await.unwrap();

        let stored = store.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.total_hours, 8.0);
        assert_eq!(stored.status, Status::Present);

        let twice = record.check_out(at + chrono::Duration::hours(9), &utc()).unwrap();
        assert!(matches!(
            store.update_checkout(&twice).await,
            Err(StoreError::MissingRecord(_))
        ));
        let stored = store.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.total_hours, 8.0);

        let mut unknown = closed.clone();
        unknown.id = "missing".into();
        assert!(matches!(
            store.update_checkout(&unknown).await,
            Err(StoreError::MissingRecord(_))
        ));
    }

    #[actix_web::test]
    async fn writes_survive_reopen() {
        let (dir, store) = open_temp().await;
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 45, 0).unwrap();
        let record = AttendanceRecord::check_in("u1", at, &utc()).unwrap();
        store.insert(&record).await.unwrap();
        store.insert_user(&user("1", "a@company.com")).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(dir.path().join("db.json")).await.unwrap();
        assert_eq!(reopened.find_by_id(&record.id).await.unwrap(), Some(record));
        assert!(reopened.find_user_by_email("A@Company.com").await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn range_queries_are_newest_first_and_limited() {
        let (_dir, store) = open_temp().await;
        for day in 2..=6 {
            let at = Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap();
            store
                .insert(&AttendanceRecord::check_in("u1", at, &utc()).unwrap())
                .await
                .unwrap();
        }
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
        )
        .unwrap();

        let found = store
            .find_in_range(&RecordQuery::for_user("u1").in_range(Some(range)))
            .await
            .unwrap();
        let days: Vec<_> = found.iter().map(|r| r.date.format("%d").to_string()).collect();
        assert_eq!(days, ["05", "04", "03"]);

        let limited = store
            .find_in_range(&RecordQuery::for_user("u1").limit(2))
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].date, NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
    }

    #[actix_web::test]
    async fn duplicate_emails_are_rejected_case_insensitively() {
        let (_dir, store) = open_temp().await;
        store.insert_user(&user("1", "alice@company.com")).await.unwrap();
        assert!(matches!(
            store.insert_user(&user("2", "ALICE@company.com")).await,
            Err(StoreError::DuplicateUser(_))
        ));
        assert_eq!(store.find_user("1").await.unwrap().unwrap().email, "alice@company.com");
    }

    #[actix_web::test]
    async fn tolerates_records_written_by_other_tools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            r#"{
                "attendance": [{
                    "_id": "legacy",
                    "userId": "2",
                    "date": "2026-03-02",
                    "checkInTime": "2026-03-02T09:00:00Z",
                    "status": "late",
                    "createdAt": "2026-03-02T09:00:00Z"
                }]
            }"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        let record = store.find_by_id("legacy").await.unwrap().unwrap();
        assert_eq!(record.total_hours, 0.0);
        assert!(record.is_open());
        assert!(store.list_users().await.unwrap().is_empty());
    }
}
