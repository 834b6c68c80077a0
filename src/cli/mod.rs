//! CLI command implementations

pub mod init;
pub mod profile;
pub mod simulate;
pub mod submit;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use safelens::config::Config;
use safelens::identity::Session;
use safelens::store::{ChangeBus, ProfileRepository, SafeLensDb, TestRepository};

/// Config plus opened stores, shared by every command
pub struct AppContext {
    pub config: Config,
    pub tests: Arc<TestRepository>,
    pub profiles: Arc<ProfileRepository>,
}

impl AppContext {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path)?;
        let db_path = config.store.resolved_database_path();
        let db = SafeLensDb::open(&db_path)
            .with_context(|| format!("Failed to open store at {}", db_path.display()))?;

        Ok(Self {
            tests: Arc::new(TestRepository::with_bus(db.clone(), ChangeBus::default())),
            profiles: Arc::new(ProfileRepository::new(db)),
            config,
        })
    }

    /// Session from the `[identity]` section, if configured
    pub fn session(&self) -> Option<Session> {
        self.config.identity.as_ref().map(|i| i.to_session())
    }

    pub fn require_session(&self) -> Result<Session> {
        self.session().context(
            "No identity configured. Add an [identity] section with user_id and email to the config.",
        )
    }
}
