//! User profile records keyed by the identity provider's user id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id issued by the identity provider
    pub id: String,
    pub email: String,
    pub username: String,

    /// Linked third-party account, if any
    pub google_email: Option<String>,
    pub google_display_name: Option<String>,
    pub google_photo_url: Option<String>,
    #[serde(default)]
    pub google_connected: bool,

    #[serde(default)]
    pub has_password: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Fields for creating or overwriting a profile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDraft {
    pub id: String,
    pub email: String,
    pub username: String,
    pub google_display_name: Option<String>,
    pub google_photo_url: Option<String>,
    pub google_email: Option<String>,
}

impl ProfileDraft {
    pub fn new(id: impl Into<String>, email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_google_account(
        mut self,
        email: impl Into<String>,
        display_name: Option<String>,
        photo_url: Option<String>,
    ) -> Self {
        self.google_email = Some(email.into());
        self.google_display_name = display_name;
        self.google_photo_url = photo_url;
        self
    }

    /// Trimmed copy; blank optional fields collapse to `None`
    pub fn normalized(&self) -> Self {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            id: self.id.clone(),
            email: self.email.trim().to_string(),
            username: self.username.trim().to_string(),
            google_display_name: clean(&self.google_display_name),
            google_photo_url: clean(&self.google_photo_url),
            google_email: clean(&self.google_email),
        }
    }
}
