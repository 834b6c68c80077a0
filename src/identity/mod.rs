//! Identity context and the identity-provider seam.
//!
//! Components never look up "the current user" on their own; callers pass a
//! [`Session`] into each operation. The provider behind [`IdentityProvider`]
//! is an external collaborator and fully substitutable.

mod static_provider;

pub use static_provider::StaticIdentity;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::store::ProfileStore;

/// The authenticated identity threaded through every operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// User id issued by the identity provider
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            display_name: None,
            photo_url: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }
}

/// How a user proves who they are
#[derive(Debug, Clone)]
pub enum Credentials {
    Password { email: String, password: String },
    /// Sign-in delegated to a third-party provider (e.g. Google)
    Delegated { provider: String, token: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Sign-in with {0} is not available")]
    ProviderUnavailable(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Username not found")]
    UsernameNotFound,

    #[error("Profile lookup failed: {0}")]
    Lookup(String),
}

/// Password credentials for an email address or a username.
///
/// Input without an `@` is a username and is swapped for the email stored
/// on that profile before the provider sees it.
pub async fn password_credentials(
    profiles: &dyn ProfileStore,
    email_or_username: &str,
    password: impl Into<String>,
) -> Result<Credentials, IdentityError> {
    let input = email_or_username.trim();
    let email = if input.contains('@') {
        input.to_string()
    } else {
        profiles
            .email_for_username(input)
            .await
            .map_err(|e| IdentityError::Lookup(e.to_string()))?
            .ok_or(IdentityError::UsernameNotFound)?
    };

    Ok(Credentials::Password {
        email,
        password: password.into(),
    })
}

/// External identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in identity, if any
    async fn current_session(&self) -> Option<Session>;

    async fn sign_in(&self, credentials: Credentials) -> Result<Session, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;
}
