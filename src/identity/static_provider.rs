use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Credentials, IdentityError, IdentityProvider, Session};

/// In-process identity provider with a fixed set of accounts.
///
/// Used by the CLI (seeded from the `[identity]` config section) and by tests.
#[derive(Default)]
pub struct StaticIdentity {
    passwords: HashMap<String, (String, Session)>,
    delegated: HashMap<(String, String), Session>,
    current: Mutex<Option<Session>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that already holds a signed-in session
    pub fn signed_in(session: Session) -> Self {
        let provider = Self::default();
        *provider.lock() = Some(session);
        provider
    }

    pub fn with_password_account(
        mut self,
        email: impl Into<String>,
        password: impl Into<String>,
        session: Session,
    ) -> Self {
        self.passwords
            .insert(email.into().to_lowercase(), (password.into(), session));
        self
    }

    pub fn with_delegated_account(
        mut self,
        provider: impl Into<String>,
        token: impl Into<String>,
        session: Session,
    ) -> Self {
        self.delegated
            .insert((provider.into(), token.into()), session);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.current.lock().expect("identity lock poisoned")
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_session(&self) -> Option<Session> {
        self.lock().clone()
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<Session, IdentityError> {
        let session = match credentials {
            Credentials::Password { email, password } => {
                match self.passwords.get(&email.trim().to_lowercase()) {
                    Some((expected, session)) if *expected == password => session.clone(),
                    _ => return Err(IdentityError::InvalidCredentials),
                }
            }
            Credentials::Delegated { provider, token } => {
                let known_provider = self.delegated.keys().any(|(p, _)| *p == provider);
                match self.delegated.get(&(provider.clone(), token)) {
                    Some(session) => session.clone(),
                    None if known_provider => return Err(IdentityError::InvalidCredentials),
                    None => return Err(IdentityError::ProviderUnavailable(provider)),
                }
            }
        };

        tracing::info!(user_id = %session.user_id, "signed in");
        *self.lock() = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        match self.lock().take() {
            Some(session) => {
                tracing::info!(user_id = %session.user_id, "signed out");
                Ok(())
            }
            None => Err(IdentityError::NotSignedIn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Session {
        Session::new("uid-alice").with_email("alice@example.com")
    }

    #[tokio::test]
    async fn password_sign_in_sets_current_session() {
        let provider = StaticIdentity::new().with_password_account("Alice@example.com", "pw", alice());
        assert!(provider.current_session().await.is_none());

        let session = provider
            .sign_in(Credentials::Password {
                email: "alice@example.com".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();
        assert_eq!(session.user_id, "uid-alice");
        assert_eq!(provider.current_session().await, Some(alice()));

        provider.sign_out().await.unwrap();
        assert!(provider.current_session().await.is_none());
        assert_eq!(provider.sign_out().await, Err(IdentityError::NotSignedIn));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let provider = StaticIdentity::new().with_password_account("alice@example.com", "pw", alice());
        let err = provider
            .sign_in(Credentials::Password {
                email: "alice@example.com".into(),
                password: "nope".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, IdentityError::InvalidCredentials);
        assert!(provider.current_session().await.is_none());
    }

    #[tokio::test]
    async fn unknown_delegated_provider_is_unavailable() {
        let provider = StaticIdentity::new().with_delegated_account("google", "tok", alice());
        let err = provider
            .sign_in(Credentials::Delegated {
                provider: "github".into(),
                token: "tok".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, IdentityError::ProviderUnavailable("github".into()));

        let session = provider
            .sign_in(Credentials::Delegated {
                provider: "google".into(),
                token: "tok".into(),
            })
            .await
            .unwrap();
        assert_eq!(session, alice());
    }
}
