//! SQLite connection and schema management
//!
//! Manages `~/.safelens/safelens.db` with schema versioning. Holds the two
//! record types of the app: `users` and `api_tests`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;


/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Database wrapper shared by the repositories
#[derive(Clone)]
pub struct SafeLensDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl SafeLensDb {
    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // WAL lets the CLI watch the feed while another process writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::from_connection(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Get a reference to the connection
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("SafeLens DB lock poisoned")
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize schema")?;

        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |r| r.get(0),
            )
            .context("Failed to read schema version")?;
        if version > SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is newer than supported version {}",
                version,
                SCHEMA_VERSION
            );
        }
        Ok(())
    }
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Current time at the precision the database keeps
pub(crate) fn now() -> DateTime<Utc> {
    from_millis(to_millis(Utc::now()))
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);

-- ============================================
-- USERS (profiles keyed by identity provider uid)
-- ============================================
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL UNIQUE,
    google_email TEXT,
    google_display_name TEXT,
    google_photo_url TEXT,
    google_connected INTEGER NOT NULL DEFAULT 0,
    has_password INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER,
    last_login INTEGER
);

-- ============================================
-- API TESTS (scan jobs)
-- ============================================
CREATE TABLE IF NOT EXISTS api_tests (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    test_name TEXT,
    urls_json TEXT NOT NULL,                 -- JSON array, order preserved
    test_types_json TEXT NOT NULL,           -- JSON array of type ids
    cors_mode TEXT,                          -- active, passive
    origin_url TEXT,
    recipient_emails_json TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'pending',  -- pending, processing, completed, failed
    progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
    result_summary_json TEXT,
    report_url TEXT,
    error_message TEXT,
    email_sent INTEGER NOT NULL DEFAULT 0,
    notification_read INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    started_at INTEGER,
    completed_at INTEGER,
    metadata_json TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_api_tests_user_created ON api_tests(user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_api_tests_user_status ON api_tests(user_id, status);
"#;
