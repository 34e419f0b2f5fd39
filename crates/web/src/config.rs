//! Web application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (firebase backend)
//! - `FIREBASE_API_KEY` - Web API key of the Firebase project
//! - `FIREBASE_PROJECT_ID` - Firebase project ID
//!
//! ## Optional
//! - `FIREBASE_DATABASE_ID` - Firestore database (default: `(default)`)
//! - `DONOR_FINDER_HOST` - Bind address (default: 127.0.0.1)
//! - `DONOR_FINDER_PORT` - Listen port (default: 3000)
//! - `DONOR_FINDER_BASE_URL` - Public URL (default: `http://<host>:<port>`)
//! - `DONOR_FINDER_BACKEND` - `firebase` (default) or `memory`
//! - `DONOR_FINDER_MEMORY_FIXTURE` - YAML fixture loaded by the memory backend
//! - `DONOR_FINDER_HTTP_TIMEOUT_SECS` - Remote call timeout (default: 30)
//! - `DONOR_FINDER_DEV_ROLE_OVERRIDE` - Grant `super_admin` to everyone (debug builds only)
//! - `DONOR_FINDER_RATE_LIMIT` - Rate limit the login endpoint (default: true)
//! - `DONOR_FINDER_LOG_JSON` - Emit JSON logs (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "insert",
    "paste",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which remote services back the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Firebase Authentication and Cloud Firestore over REST.
    Firebase,
    /// In-process identity provider and document store.
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(Self::Firebase),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'firebase' or 'memory', got '{other}'")),
        }
    }
}

/// Web application configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL; `https://` turns on secure cookies
    pub base_url: String,
    pub backend: Backend,
    /// Present when `backend` is `Firebase`.
    pub firebase: Option<FirebaseConfig>,
    /// Fixture file seeded into the memory backend
    pub memory_fixture: Option<PathBuf>,
    /// Timeout applied to every remote call
    pub http_timeout: Duration,
    /// Resolve every signed-in identity to `super_admin` without a lookup
    pub dev_role_override: bool,
    /// Rate limit `POST /auth/login`
    pub rate_limit: bool,
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Firebase project configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct FirebaseConfig {
    pub api_key: SecretString,
    pub project_id: String,
    /// Firestore database ID, `(default)` unless a named database is used.
    pub database_id: String,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("database_id", &self.database_id)
            .finish()
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, if
    /// the API key looks like a placeholder, or if the developer role override
    /// is set in a release build.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(&Env::process())
    }

    fn from_source(env: &Env) -> Result<Self, ConfigError> {
        let host = env
            .or_default("DONOR_FINDER_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("DONOR_FINDER_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("DONOR_FINDER_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("DONOR_FINDER_PORT".to_string(), e.to_string()))?;
        let base_url = env
            .optional("DONOR_FINDER_BASE_URL")
            .unwrap_or_else(|| format!("http://{host}:{port}"));
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("DONOR_FINDER_BASE_URL".to_string(), e.to_string())
        })?;

        let backend = env
            .or_default("DONOR_FINDER_BACKEND", "firebase")
            .parse::<Backend>()
            .map_err(|e| ConfigError::InvalidEnvVar("DONOR_FINDER_BACKEND".to_string(), e))?;
        let firebase = match backend {
            Backend::Firebase => Some(FirebaseConfig::from_source(env)?),
            Backend::Memory => None,
        };
        let memory_fixture = env.optional("DONOR_FINDER_MEMORY_FIXTURE").map(PathBuf::from);

        let timeout_secs = env
            .or_default("DONOR_FINDER_HTTP_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("DONOR_FINDER_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let dev_role_override = env.flag("DONOR_FINDER_DEV_ROLE_OVERRIDE", false)?;
        if dev_role_override && !cfg!(debug_assertions) {
            return Err(ConfigError::InvalidEnvVar(
                "DONOR_FINDER_DEV_ROLE_OVERRIDE".to_string(),
                "not allowed in release builds".to_string(),
            ));
        }

        let sentry_sample_rate = env
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = env
            .optional("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            firebase,
            memory_fixture,
            http_timeout: Duration::from_secs(timeout_secs),
            dev_role_override,
            rate_limit: env.flag("DONOR_FINDER_RATE_LIMIT", true)?,
            log_json: env.flag("DONOR_FINDER_LOG_JSON", false)?,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// A configuration for the memory backend with rate limiting off.
    ///
    /// Used by tests and the CLI's offline mode.
    #[must_use]
    pub fn for_memory_backend() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://127.0.0.1:3000".to_string(),
            backend: Backend::Memory,
            firebase: None,
            memory_fixture: None,
            http_timeout: Duration::from_secs(30),
            dev_role_override: false,
            rate_limit: false,
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies must carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl FirebaseConfig {
    fn from_source(env: &Env) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: env.validated_secret("FIREBASE_API_KEY")?,
            project_id: env.required("FIREBASE_PROJECT_ID")?,
            database_id: env.or_default("FIREBASE_DATABASE_ID", "(default)"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Source of configuration values.
enum Env {
    Process,
    #[cfg(test)]
    Map(HashMap<String, String>),
}

impl Env {
    const fn process() -> Self {
        Self::Process
    }

    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        let value = match self {
            Self::Process => std::env::var(key).ok(),
            #[cfg(test)]
            Self::Map(map) => map.get(key).cloned(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        self.optional(key)
            .map_or(Ok(default), |value| parse_flag(&value).ok_or_else(|| {
                ConfigError::InvalidEnvVar(key.to_string(), format!("not a boolean: '{value}'"))
            }))
    }

    /// Load a secret and reject placeholders and low-entropy values.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
