//! Record store gateways
//!
//! ```text
//! ┌───────────────────────┐     ┌──────────────────────┐
//! │ TestStore (trait)     │     │ ProfileStore (trait) │
//! │  create / list / get  │     │  get / save / login  │
//! │  mark read / stats    │     │  photo / username    │
//! │  subscribe ──► feed   │     └──────────┬───────────┘
//! └──────────┬────────────┘                │
//!            ▼                             ▼
//!      TestRepository              ProfileRepository
//!            └──────────► SafeLensDb ◄─────┘
//!                       ~/.safelens/safelens.db
//!
//!      AvatarStore ──► ~/.safelens/avatars/<uid>/<uid>-<ms>.<ext>
//! ```
//!
//! Every gateway call returns an explicit `Result`, so "no rows" and
//! "the store failed" are never conflated.

mod avatars;
mod db;
mod feed;
mod poller;
mod profile_repository;
mod test_repository;

pub use avatars::AvatarStore;
pub use db::SafeLensDb;
pub use feed::{
    ChangeBus, ChangeKind, DEFAULT_FEED_CAPACITY, FeedEvent, Subscription, TestChange,
};
pub use poller::ChangePoller;
pub use profile_repository::ProfileRepository;
pub use test_repository::TestRepository;

use async_trait::async_trait;

use crate::domain::{
    ApiTest, NewApiTest, ProfileDraft, TestStatistics, TransitionError, UserProfile,
};
use crate::identity::Session;

/// Default bound for recency listings
pub const DEFAULT_RECENT_LIMIT: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to encode {column}: {source}")]
    Encode {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("test {0} not found")]
    NotFound(String),

    #[error("rejected update: {0}")]
    Transition(#[from] TransitionError),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error(
        "This email is already registered. Please use a different email or login instead."
    )]
    EmailTaken,

    #[error("This username is already taken. Please choose a different username.")]
    UsernameTaken,

    #[error("Profile not found")]
    NotFound,

    #[error("An email address is required to create a profile")]
    MissingEmail,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Access to scan test records; every call is scoped to one user
#[async_trait]
pub trait TestStore: Send + Sync {
    /// Insert a pending record; the store assigns the id
    async fn create(&self, user_id: &str, draft: NewApiTest) -> Result<ApiTest, StoreError>;

    /// Newest first, at most `limit` records
    async fn list_recent(&self, user_id: &str, limit: usize) -> Result<Vec<ApiTest>, StoreError>;

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<ApiTest>, StoreError>;

    /// Idempotent. `Ok(false)` when no such record exists for the user.
    async fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool, StoreError>;

    /// Not used by any submission or feed path
    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, StoreError>;

    /// Counts by status, recomputed from all of the user's records
    async fn statistics(&self, user_id: &str) -> Result<TestStatistics, StoreError>;

    /// Completed records whose notice has not been shown, newest completion first
    async fn unread_notifications(&self, user_id: &str) -> Result<Vec<ApiTest>, StoreError>;

    /// Live changes to the user's records
    fn subscribe(&self, user_id: &str) -> Subscription;
}

/// Access to user profiles
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Insert or overwrite a profile, enforcing unique email and username
    async fn save_profile(&self, draft: ProfileDraft) -> Result<UserProfile, ProfileError>;

    /// Called after a successful sign-in: creates the profile the first time,
    /// otherwise only bumps `last_login`
    async fn record_login(&self, session: &Session) -> Result<UserProfile, ProfileError>;

    async fn update_photo(&self, user_id: &str, photo_url: &str) -> Result<(), ProfileError>;

    async fn is_username_available(
        &self,
        username: &str,
        exclude_user_id: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// Email on the profile holding `username`, for username sign-in
    async fn email_for_username(&self, username: &str) -> Result<Option<String>, StoreError>;
}
