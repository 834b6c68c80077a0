//! SQLite-backed gateway for `users`

use async_trait::async_trait;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use super::db::{SafeLensDb, from_millis, now, to_millis};
use super::{ProfileError, ProfileStore, StoreError};
use crate::domain::{ProfileDraft, UserProfile};
use crate::identity::Session;

const PROFILE_COLUMNS: &str = "id, email, username, google_email, google_display_name, \
    google_photo_url, google_connected, has_password, created_at, updated_at, last_login";

/// Repository for user profiles
#[derive(Clone)]
pub struct ProfileRepository {
    db: SafeLensDb,
}

impl ProfileRepository {
    pub fn new(db: SafeLensDb) -> Self {
        Self { db }
    }

    fn find(conn: &Connection, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = ?1");
        Ok(conn.query_row(&sql, params![user_id], row_to_profile).optional()?)
    }

    fn owner_of(conn: &Connection, column: &str, value: &str) -> Result<Option<String>, StoreError> {
        let sql = format!("SELECT id FROM users WHERE {column} = ?1");
        Ok(conn
            .query_row(&sql, params![value], |r| r.get::<_, String>(0))
            .optional()?)
    }

    fn save(&self, draft: &ProfileDraft) -> Result<UserProfile, ProfileError> {
        let draft = draft.normalized();
        let conn = self.db.conn();

        if let Some(owner) = Self::owner_of(&conn, "email", &draft.email)? {
            if owner != draft.id {
                return Err(ProfileError::EmailTaken);
            }
        }
        if let Some(owner) = Self::owner_of(&conn, "username", &draft.username)? {
            if owner != draft.id {
                return Err(ProfileError::UsernameTaken);
            }
        }

        let ts = to_millis(now());
        let google_connected = draft.google_email.is_some();
        let existing = Self::find(&conn, &draft.id)?;

        let result = if existing.is_some() {
            tracing::debug!(user_id = %draft.id, "updating existing profile");
            // Blank optional fields keep what is stored
            conn.execute(
                r#"
                UPDATE users SET
                    email = ?2,
                    username = ?3,
                    google_connected = ?4,
                    has_password = 1,
                    last_login = ?5,
                    updated_at = ?5,
                    google_display_name = COALESCE(?6, google_display_name),
                    google_photo_url = COALESCE(?7, google_photo_url),
                    google_email = COALESCE(?8, google_email)
                WHERE id = ?1
                "#,
                params![
                    draft.id,
                    draft.email,
                    draft.username,
                    google_connected,
                    ts,
                    draft.google_display_name,
                    draft.google_photo_url,
                    draft.google_email,
                ],
            )
        } else {
            tracing::debug!(user_id = %draft.id, "creating new profile");
            conn.execute(
                r#"
                INSERT INTO users (id, email, username, google_email, google_display_name,
                    google_photo_url, google_connected, has_password, created_at, last_login)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)
                "#,
                params![
                    draft.id,
                    draft.email,
                    draft.username,
                    draft.google_email,
                    draft.google_display_name,
                    draft.google_photo_url,
                    google_connected,
                    ts,
                ],
            )
        };
        result.map_err(map_unique_violation)?;

        Self::find(&conn, &draft.id)?.ok_or(ProfileError::NotFound)
    }

    fn login(&self, session: &Session) -> Result<UserProfile, ProfileError> {
        let conn = self.db.conn();
        let ts = to_millis(now());

        if Self::find(&conn, &session.user_id)?.is_some() {
            conn.execute(
                "UPDATE users SET last_login = ?2 WHERE id = ?1",
                params![session.user_id, ts],
            )
            .map_err(StoreError::from)?;
            return Self::find(&conn, &session.user_id)?.ok_or(ProfileError::NotFound);
        }

        let email = session
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ProfileError::MissingEmail)?;
        if Self::owner_of(&conn, "email", email)?.is_some() {
            return Err(ProfileError::EmailTaken);
        }

        let mut username = default_username(session, email);
        if Self::owner_of(&conn, "username", &username)?.is_some() {
            let suffix: String = session.user_id.chars().take(6).collect();
            username = format!("{username}-{suffix}");
        }

        conn.execute(
            r#"
            INSERT INTO users (id, email, username, google_photo_url, google_connected,
                has_password, created_at, last_login)
            VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?5)
            "#,
            params![session.user_id, email, username, session.photo_url, ts],
        )
        .map_err(map_unique_violation)?;

        tracing::info!(user_id = %session.user_id, %username, "created profile on first sign-in");
        Self::find(&conn, &session.user_id)?.ok_or(ProfileError::NotFound)
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Self::find(&self.db.conn(), user_id)
    }

    async fn save_profile(&self, draft: ProfileDraft) -> Result<UserProfile, ProfileError> {
        self.save(&draft)
    }

    async fn record_login(&self, session: &Session) -> Result<UserProfile, ProfileError> {
        self.login(session)
    }

    async fn update_photo(&self, user_id: &str, photo_url: &str) -> Result<(), ProfileError> {
        let changed = self
            .db
            .conn()
            .execute(
                "UPDATE users SET google_photo_url = ?2, updated_at = ?3 WHERE id = ?1",
                params![user_id, photo_url, to_millis(now())],
            )
            .map_err(StoreError::from)?;
        if changed == 0 {
            return Err(ProfileError::NotFound);
        }
        Ok(())
    }

    async fn is_username_available(
        &self,
        username: &str,
        exclude_user_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let count: i64 = self.db.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1 AND (?2 IS NULL OR id != ?2)",
            params![username.trim(), exclude_user_id],
            |r| r.get(0),
        )?;
        Ok(count == 0)
    }

    async fn email_for_username(&self, username: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .db
            .conn()
            .query_row(
                "SELECT email FROM users WHERE username = ?1",
                params![username.trim()],
                |r| r.get::<_, String>(0),
            )
            .optional()?)
    }
}

/// Display name without whitespace, or the local part of the email
fn default_username(session: &Session, email: &str) -> String {
    session
        .display_name
        .as_deref()
        .map(|n| n.split_whitespace().collect::<Vec<_>>().join("").to_lowercase())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string())
}

fn map_unique_violation(err: rusqlite::Error) -> ProfileError {
    if let rusqlite::Error::SqliteFailure(code, Some(message)) = &err {
        if code.code == ErrorCode::ConstraintViolation {
            if message.contains("users.email") {
                return ProfileError::EmailTaken;
            }
            if message.contains("users.username") {
                return ProfileError::UsernameTaken;
            }
        }
    }
    ProfileError::Store(err.into())
}

fn row_to_profile(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        google_email: row.get(3)?,
        google_display_name: row.get(4)?,
        google_photo_url: row.get(5)?,
        google_connected: row.get(6)?,
        has_password: row.get(7)?,
        created_at: from_millis(row.get(8)?),
        updated_at: row.get::<_, Option<i64>>(9)?.map(from_millis),
        last_login: row.get::<_, Option<i64>>(10)?.map(from_millis),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> ProfileRepository {
        ProfileRepository::new(SafeLensDb::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn save_creates_then_updates() {
        let repo = repo();
        let created = repo
            .save_profile(ProfileDraft::new("u1", " alice@example.com ", "alice"))
            .await
            .unwrap();
        assert_eq!(created.email, "alice@example.com");
        assert!(created.has_password);
        assert!(!created.google_connected);
        assert!(created.updated_at.is_none());

        let updated = repo
            .save_profile(
                ProfileDraft::new("u1", "alice@example.com", "alice2").with_google_account(
                    "alice@gmail.com",
                    Some("Alice".into()),
                    None,
                ),
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "alice2");
        assert!(updated.google_connected);
        assert_eq!(updated.google_email.as_deref(), Some("alice@gmail.com"));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn taken_email_and_username_are_reported() {
        let repo = repo();
        repo.save_profile(ProfileDraft::new("u1", "alice@example.com", "alice"))
            .await
            .unwrap();

        let err = repo
            .save_profile(ProfileDraft::new("u2", "alice@example.com", "bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::EmailTaken));

        let err = repo
            .save_profile(ProfileDraft::new("u2", "bob@example.com", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::UsernameTaken));

        assert!(!repo.is_username_available("alice", None).await.unwrap());
        assert!(repo.is_username_available("alice", Some("u1")).await.unwrap());
        assert!(repo.is_username_available("carol", None).await.unwrap());
    }

    #[tokio::test]
    async fn first_login_creates_profile_and_later_logins_bump_timestamp() {
        let repo = repo();
        let session = Session::new("uid-1234567")
            .with_email("dana@example.com")
            .with_display_name("Dana Scully");

        let first = repo.record_login(&session).await.unwrap();
        assert_eq!(first.username, "danascully");
        assert!(!first.has_password);
        assert!(first.last_login.is_some());

        let second = repo.record_login(&session).await.unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert!(second.last_login >= first.last_login);

        // Same display name for another user gets a suffix
        let other = Session::new("uid-abcdef9")
            .with_email("dana2@example.com")
            .with_display_name("Dana Scully");
        let profile = repo.record_login(&other).await.unwrap();
        assert_eq!(profile.username, "danascully-uid-ab");
    }

    #[tokio::test]
    async fn username_maps_to_its_email() {
        let repo = repo();
        repo.save_profile(ProfileDraft::new("u1", "alice@example.com", "alice"))
            .await
            .unwrap();

        assert_eq!(
            repo.email_for_username(" alice ").await.unwrap().as_deref(),
            Some("alice@example.com")
        );
        assert_eq!(repo.email_for_username("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn login_without_email_cannot_create_profile() {
        let repo = repo();
        let err = repo.record_login(&Session::new("u9")).await.unwrap_err();
        assert!(matches!(err, ProfileError::MissingEmail));
    }

    #[tokio::test]
    async fn update_photo_requires_existing_profile() {
        let repo = repo();
        assert!(matches!(
            repo.update_photo("ghost", "https://cdn.example/p.png").await,
            Err(ProfileError::NotFound)
        ));

        repo.save_profile(ProfileDraft::new("u1", "alice@example.com", "alice"))
            .await
            .unwrap();
        repo.update_photo("u1", "https://cdn.example/p.png").await.unwrap();
        let profile = repo.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(
            profile.google_photo_url.as_deref(),
            Some("https://cdn.example/p.png")
        );
    }
}
