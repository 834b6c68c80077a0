//! Configuration loading and management

mod io;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identity::Session;

/// Default automation webhook (a local n8n instance)
pub const DEFAULT_WEBHOOK_URL: &str = "http://127.0.0.1:5678/webhook/testingIEHintegration";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    /// Static identity for the CLI; the browser app gets this from its provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityConfig>,
}

/// Automation webhook settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_url")]
    pub url: String,

    /// Connect timeout; reads wait as long as the workflow takes
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl WebhookConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: default_webhook_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Record store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Defaults to ~/.safelens/safelens.db
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Defaults to ~/.safelens/avatars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatars_dir: Option<PathBuf>,

    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl StoreConfig {
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| Config::global_config_dir().join("safelens.db"))
    }

    pub fn resolved_avatars_dir(&self) -> PathBuf {
        self.avatars_dir
            .clone()
            .unwrap_or_else(|| Config::global_config_dir().join("avatars"))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            avatars_dir: None,
            recent_limit: default_recent_limit(),
        }
    }
}

/// Live feed settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// How long a completion notice stays up before it is marked read
    #[serde(default = "default_notice_delay_ms")]
    pub notice_delay_ms: u64,
}

impl FeedConfig {
    pub fn notice_delay(&self) -> Duration {
        Duration::from_millis(self.notice_delay_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            notice_delay_ms: default_notice_delay_ms(),
        }
    }
}

/// Signed-in identity used by the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Password accepted by `profile login --password`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl IdentityConfig {
    pub fn to_session(&self) -> Session {
        Session {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

fn default_webhook_url() -> String {
    DEFAULT_WEBHOOK_URL.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_recent_limit() -> usize {
    crate::store::DEFAULT_RECENT_LIMIT
}

fn default_notice_delay_ms() -> u64 {
    6000
}
