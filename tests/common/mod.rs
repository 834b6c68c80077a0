//! Shared test doubles for the submission and feed tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use safelens::dispatch::{AnalysisDispatch, AnalysisPayload, DispatchError};
use safelens::identity::Session;
use safelens::reconcile::{CompletionNotice, Notifier};
use safelens::store::{
    ProfileRepository, SafeLensDb, StoreError, Subscription, TestRepository, TestStore,
};
use safelens::{ApiTest, Attachment, NewApiTest, ProfileDraft, TestStatistics};

pub const USER_ID: &str = "uid-alice";

pub fn session() -> Session {
    Session::new(USER_ID)
        .with_email("alice@example.com")
        .with_display_name("Alice")
}

pub fn memory_db() -> SafeLensDb {
    SafeLensDb::open_in_memory().expect("Failed to open in-memory db")
}

/// Profile store holding Alice's profile
pub async fn profiles_with_alice(db: SafeLensDb) -> Arc<ProfileRepository> {
    use safelens::store::ProfileStore;
    let profiles = Arc::new(ProfileRepository::new(db));
    profiles
        .save_profile(ProfileDraft::new(USER_ID, "alice@example.com", "alice"))
        .await
        .expect("Failed to seed profile");
    profiles
}

/// Ordered record of calls across collaborators
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    pub fn push(&self, call: &'static str) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

/// Test store over a real repository that can be told to fail creation
pub struct RecordingStore {
    pub inner: TestRepository,
    pub log: CallLog,
    pub fail_create: bool,
}

impl RecordingStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            inner: TestRepository::new(memory_db()),
            log,
            fail_create: false,
        }
    }

    pub fn failing(log: CallLog) -> Self {
        Self {
            fail_create: true,
            ..Self::new(log)
        }
    }
}

#[async_trait]
impl TestStore for RecordingStore {
    async fn create(&self, user_id: &str, draft: NewApiTest) -> Result<ApiTest, StoreError> {
        self.log.push("create");
        if self.fail_create {
            return Err(StoreError::Unavailable("simulated outage".into()));
        }
        self.inner.create(user_id, draft).await
    }

    async fn list_recent(&self, user_id: &str, limit: usize) -> Result<Vec<ApiTest>, StoreError> {
        self.log.push("list");
        self.inner.list_recent(user_id, limit).await
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<ApiTest>, StoreError> {
        self.inner.get(user_id, id).await
    }

    async fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        self.log.push("mark_read");
        self.inner.mark_notification_read(user_id, id).await
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        self.inner.delete(user_id, id).await
    }

    async fn statistics(&self, user_id: &str) -> Result<TestStatistics, StoreError> {
        self.inner.statistics(user_id).await
    }

    async fn unread_notifications(&self, user_id: &str) -> Result<Vec<ApiTest>, StoreError> {
        self.inner.unread_notifications(user_id).await
    }

    fn subscribe(&self, user_id: &str) -> Subscription {
        self.inner.subscribe(user_id)
    }
}

/// What the dispatcher was asked to send
#[derive(Debug, Clone)]
pub struct SentJob {
    pub session: Session,
    pub payload: AnalysisPayload,
    pub attachment: Option<Attachment>,
}

pub struct RecordingDispatcher {
    pub log: CallLog,
    pub sent: Mutex<Vec<SentJob>>,
    /// HTTP status to fail with; `None` succeeds
    pub fail_status: Option<u16>,
}

impl RecordingDispatcher {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            sent: Mutex::new(Vec::new()),
            fail_status: None,
        }
    }

    pub fn failing(log: CallLog, status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::new(log)
        }
    }

    pub fn sent(&self) -> Vec<SentJob> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisDispatch for RecordingDispatcher {
    async fn dispatch(
        &self,
        session: &Session,
        payload: &AnalysisPayload,
        attachment: Option<&Attachment>,
    ) -> Result<Value, DispatchError> {
        self.log.push("dispatch");
        self.sent.lock().unwrap().push(SentJob {
            session: session.clone(),
            payload: payload.clone(),
            attachment: attachment.cloned(),
        });
        match self.fail_status {
            Some(status) => Err(DispatchError::Status {
                status,
                body: String::new(),
            }),
            None => Ok(json!({ "message": "Workflow was started" })),
        }
    }
}

/// Collects notices instead of showing them
#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<CompletionNotice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<CompletionNotice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &CompletionNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}
