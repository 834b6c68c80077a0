//! Analysis categories a user can request and the CORS sub-mode.

use serde::{Deserialize, Serialize};

/// An analysis category offered by the testing form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    /// HTTP header analysis (CSP, missing HSTS)
    Http,
    /// SSL / TLS analysis
    Ssl,
    /// Server version disclosure
    Sensitive,
    /// CORS validation, needs a [`CorsMode`]
    Cors,
    /// Improper error handling
    Error,
    /// URL tampering
    Url,
}

impl TestType {
    pub const ALL: [TestType; 6] = [
        TestType::Http,
        TestType::Ssl,
        TestType::Sensitive,
        TestType::Cors,
        TestType::Error,
        TestType::Url,
    ];

    /// Internal id used in the form and in stored records
    pub fn id(&self) -> &'static str {
        match self {
            TestType::Http => "http",
            TestType::Ssl => "ssl",
            TestType::Sensitive => "sensitive",
            TestType::Cors => "cors",
            TestType::Error => "error",
            TestType::Url => "url",
        }
    }

    pub fn from_id(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Some(TestType::Http),
            "ssl" | "tls" => Some(TestType::Ssl),
            "sensitive" => Some(TestType::Sensitive),
            "cors" => Some(TestType::Cors),
            "error" => Some(TestType::Error),
            "url" => Some(TestType::Url),
            _ => None,
        }
    }

    /// Name the automation workflow expects in `Analysis Type`.
    ///
    /// CORS travels in its own `Cors Analysis Type` field and has no entry here.
    pub fn analysis_name(&self) -> Option<&'static str> {
        match self {
            TestType::Http => Some("http header analysis"),
            TestType::Ssl => Some("SSL / TLS analysis"),
            TestType::Sensitive => Some("Server version Disclosure"),
            TestType::Error => Some("Improper Error Handling"),
            TestType::Url => Some("URL Tampering Analysis"),
            TestType::Cors => None,
        }
    }
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// How the CORS check is performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorsMode {
    /// Sends crafted `Origin` headers, requires an origin URL
    Active,
    /// Inspects the responses only
    Passive,
}

impl CorsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorsMode::Active => "active",
            CorsMode::Passive => "passive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" | "active cors test" => Some(CorsMode::Active),
            "passive" | "passive cors test" => Some(CorsMode::Passive),
            _ => None,
        }
    }

    /// Value sent as `Cors Analysis Type`
    pub fn analysis_name(&self) -> &'static str {
        match self {
            CorsMode::Active => "Active CORS Test",
            CorsMode::Passive => "Passive CORS Test",
        }
    }
}

impl std::fmt::Display for CorsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
