//! SQLite-backed gateway for `api_tests`

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::db::{SafeLensDb, from_millis, now, to_millis};
use super::feed::{ChangeBus, Subscription, TestChange};
use super::{StoreError, TestStore};
use crate::domain::{
    ApiTest, CorsMode, NewApiTest, ProcessorUpdate, TestStatistics, TestStatus,
};

const TEST_COLUMNS: &str = "id, user_id, test_name, urls_json, test_types_json, cors_mode, \
    origin_url, recipient_emails_json, status, progress, result_summary_json, report_url, \
    error_message, email_sent, notification_read, created_at, started_at, completed_at, \
    metadata_json";

/// Repository for scan test records, publishing every write on its [`ChangeBus`]
#[derive(Clone)]
pub struct TestRepository {
    db: SafeLensDb,
    bus: ChangeBus,
}

impl TestRepository {
    pub fn new(db: SafeLensDb) -> Self {
        Self::with_bus(db, ChangeBus::default())
    }

    pub fn with_bus(db: SafeLensDb, bus: ChangeBus) -> Self {
        Self { db, bus }
    }

    pub fn changes(&self) -> &ChangeBus {
        &self.bus
    }

    /// Apply a write from the automation workflow.
    ///
    /// This is the processor's side of the table and is not scoped to a user.
    /// Updates that would regress the record are rejected.
    pub fn apply_processor_update(
        &self,
        id: &str,
        update: ProcessorUpdate,
    ) -> Result<ApiTest, StoreError> {
        let conn = self.db.conn();
        let sql = format!("SELECT {TEST_COLUMNS} FROM api_tests WHERE id = ?1");
        let mut test = conn
            .query_row(&sql, params![id], row_to_test)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        test.apply_processor_update(update, now())?;

        conn.execute(
            r#"
            UPDATE api_tests SET
                status = ?2,
                progress = ?3,
                result_summary_json = ?4,
                report_url = ?5,
                error_message = ?6,
                email_sent = ?7,
                started_at = ?8,
                completed_at = ?9
            WHERE id = ?1
            "#,
            params![
                test.id,
                test.status.as_str(),
                test.progress,
                test.result_summary
                    .as_ref()
                    .map(|s| encode("result_summary", s))
                    .transpose()?,
                test.report_url,
                test.error_message,
                test.email_sent,
                test.started_at.map(to_millis),
                test.completed_at.map(to_millis),
            ],
        )?;
        drop(conn);

        tracing::debug!(test_id = %test.id, status = %test.status, progress = test.progress, "processor update applied");
        self.bus.publish(TestChange::update(test.clone()));
        Ok(test)
    }

    fn insert(&self, user_id: &str, draft: NewApiTest) -> Result<ApiTest, StoreError> {
        let created_at = now();
        let test_name = draft.resolved_name(created_at);
        let metadata = serde_json::json!({
            "user_email": draft.user_email,
            "username": draft.username,
            "created_by": user_id,
            "source": "web_app",
        });

        let test = ApiTest {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            test_name: Some(test_name),
            urls: draft.urls,
            test_types: draft.test_types,
            cors_mode: draft.cors_mode,
            origin_url: draft.origin_url,
            recipient_emails: draft.recipient_emails,
            status: TestStatus::Pending,
            progress: 0,
            result_summary: None,
            report_url: None,
            error_message: None,
            email_sent: false,
            notification_read: false,
            created_at,
            started_at: None,
            completed_at: None,
            metadata,
        };

        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO api_tests (id, user_id, test_name, urls_json, test_types_json, cors_mode,
                origin_url, recipient_emails_json, status, progress, email_sent, notification_read,
                created_at, metadata_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                test.id,
                test.user_id,
                test.test_name,
                encode("urls", &test.urls)?,
                encode("test_types", &test.test_types)?,
                test.cors_mode.map(|m| m.as_str()),
                test.origin_url,
                encode("recipient_emails", &test.recipient_emails)?,
                test.status.as_str(),
                test.progress,
                test.email_sent,
                test.notification_read,
                to_millis(test.created_at),
                encode("metadata", &test.metadata)?,
            ],
        )?;
        drop(conn);

        tracing::info!(test_id = %test.id, user_id, urls = test.urls.len(), "created api test");
        self.bus.publish(TestChange::insert(test.clone()));
        Ok(test)
    }

    fn query_tests(
        &self,
        tail: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<ApiTest>, StoreError> {
        let conn = self.db.conn();
        let sql = format!("SELECT {TEST_COLUMNS} FROM api_tests {tail}");
        let mut stmt = conn.prepare(&sql)?;
        let tests = stmt
            .query_map(params, row_to_test)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tests)
    }

    fn find(&self, user_id: &str, id: &str) -> Result<Option<ApiTest>, StoreError> {
        let mut tests = self.query_tests("WHERE id = ?1 AND user_id = ?2", params![id, user_id])?;
        Ok(tests.pop())
    }
}

#[async_trait]
impl TestStore for TestRepository {
    async fn create(&self, user_id: &str, draft: NewApiTest) -> Result<ApiTest, StoreError> {
        self.insert(user_id, draft)
    }

    async fn list_recent(&self, user_id: &str, limit: usize) -> Result<Vec<ApiTest>, StoreError> {
        self.query_tests(
            "WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            params![user_id, limit as i64],
        )
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<ApiTest>, StoreError> {
        self.find(user_id, id)
    }

    async fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        let Some(mut test) = self.find(user_id, id)? else {
            return Ok(false);
        };
        if test.notification_read {
            return Ok(true);
        }

        self.db.conn().execute(
            "UPDATE api_tests SET notification_read = 1 WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        test.notification_read = true;

        tracing::debug!(test_id = id, "notification marked read");
        self.bus.publish(TestChange::update(test));
        Ok(true)
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        let Some(test) = self.find(user_id, id)? else {
            return Ok(false);
        };
        self.db.conn().execute(
            "DELETE FROM api_tests WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        self.bus.publish(TestChange::delete(test));
        Ok(true)
    }

    async fn statistics(&self, user_id: &str) -> Result<TestStatistics, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare("SELECT status FROM api_tests WHERE user_id = ?1")?;
        let statuses = stmt
            .query_map(params![user_id], |row| {
                let raw: String = row.get(0)?;
                TestStatus::from_str(&raw)
                    .ok_or_else(|| invalid(0, format!("unknown status: {raw}")))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(TestStatistics::from_statuses(statuses))
    }

    async fn unread_notifications(&self, user_id: &str) -> Result<Vec<ApiTest>, StoreError> {
        self.query_tests(
            "WHERE user_id = ?1 AND status = 'completed' AND notification_read = 0 \
             ORDER BY completed_at DESC",
            params![user_id],
        )
    }

    fn subscribe(&self, user_id: &str) -> Subscription {
        self.bus.subscribe(user_id)
    }
}

fn encode<T: Serialize + ?Sized>(column: &'static str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode { column, source })
}

fn invalid(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_test(row: &Row<'_>) -> rusqlite::Result<ApiTest> {
    let status_raw: String = row.get(8)?;
    let status = TestStatus::from_str(&status_raw)
        .ok_or_else(|| invalid(8, format!("unknown status: {status_raw}")))?;

    let cors_mode = row
        .get::<_, Option<String>>(5)?
        .map(|raw| {
            CorsMode::from_str(&raw).ok_or_else(|| invalid(5, format!("unknown CORS mode: {raw}")))
        })
        .transpose()?;

    let result_summary = match row.get::<_, Option<String>>(10)? {
        Some(_) => Some(json_column(row, 10)?),
        None => None,
    };

    Ok(ApiTest {
        id: row.get(0)?,
        user_id: row.get(1)?,
        test_name: row.get(2)?,
        urls: json_column(row, 3)?,
        test_types: json_column(row, 4)?,
        cors_mode,
        origin_url: row.get(6)?,
        recipient_emails: json_column(row, 7)?,
        status,
        progress: row.get(9)?,
        result_summary,
        report_url: row.get(11)?,
        error_message: row.get(12)?,
        email_sent: row.get(13)?,
        notification_read: row.get(14)?,
        created_at: from_millis(row.get(15)?),
        started_at: row.get::<_, Option<i64>>(16)?.map(from_millis),
        completed_at: row.get::<_, Option<i64>>(17)?.map(from_millis),
        metadata: json_column(row, 18)?,
    })
}
