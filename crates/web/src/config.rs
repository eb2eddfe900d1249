//! Web server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; defaults are chosen for local development.
//!
//! - `DELICIOUS_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`). When neither is set the server runs on the in-memory backend.
//! - `DELICIOUS_HOST` - Bind address (default: 127.0.0.1)
//! - `DELICIOUS_PORT` - Listen port (default: 7777)
//! - `DELICIOUS_BASE_URL` - Public URL (default: `http://localhost:<port>`)
//! - `DELICIOUS_UPLOADS_DIR` - Where resized photos are written (default: public/uploads)
//! - `DELICIOUS_STATIC_DIR` - Static assets (default: crates/web/static)
//! - `DELICIOUS_PHOTO_WIDTH` - Width uploaded photos are resized to (default: 800)
//! - `DELICIOUS_MAX_UPLOAD_BYTES` - Request body limit for forms (default: 10 MiB)
//! - `DELICIOUS_LOG_JSON` - Emit JSON logs when set to `1` or `true`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.0)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_PORT: u16 = 7777;
const DEFAULT_PHOTO_WIDTH: u32 = 800;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// `PostgreSQL` connection URL (contains password). `None` selects the
    /// in-memory backend.
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Directory resized photos are written to and served from
    pub uploads_dir: PathBuf,
    /// Directory of static assets
    pub static_dir: PathBuf,
    /// Width in pixels that uploaded photos are scaled to
    pub photo_width: u32,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
    /// Use JSON formatted logs
    pub log_json: bool,
    /// Error tracking
    pub sentry: SentryConfig,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            base_url: format!("http://localhost:{DEFAULT_PORT}"),
            uploads_dir: PathBuf::from("public/uploads"),
            static_dir: PathBuf::from("crates/web/static"),
            photo_width: DEFAULT_PHOTO_WIDTH,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_json: false,
            sentry: SentryConfig::default(),
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let port = parse_env_or("DELICIOUS_PORT", defaults.port)?;
        let base_url = get_optional_env("DELICIOUS_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or("SENTRY_SAMPLE_RATE", defaults.sentry.sample_rate)?,
            traces_sample_rate: parse_env_or(
                "SENTRY_TRACES_SAMPLE_RATE",
                defaults.sentry.traces_sample_rate,
            )?,
        };

        Ok(Self {
            database_url: get_database_url("DELICIOUS_DATABASE_URL"),
            host: parse_env_or("DELICIOUS_HOST", defaults.host)?,
            port,
            base_url,
            uploads_dir: get_optional_env("DELICIOUS_UPLOADS_DIR")
                .map_or(defaults.uploads_dir, PathBuf::from),
            static_dir: get_optional_env("DELICIOUS_STATIC_DIR")
                .map_or(defaults.static_dir, PathBuf::from),
            photo_width: parse_env_or("DELICIOUS_PHOTO_WIDTH", defaults.photo_width)?,
            max_upload_bytes: parse_env_or("DELICIOUS_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            log_json: get_optional_env("DELICIOUS_LOG_JSON")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WebConfig::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.photo_width, 800);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:7777");
        assert!(!config.is_secure());
    }

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u16>("DELICIOUS_PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "DELICIOUS_PORT"));

        let port: u16 = parse_value("DELICIOUS_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_secure_cookies_follow_base_url() {
        let config = WebConfig {
            base_url: "https://delicious.example".to_string(),
            ..WebConfig::default()
        };
        assert!(config.is_secure());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = WebConfig {
            database_url: Some(SecretString::from("postgres://user:hunter2@db/delicious")),
            ..WebConfig::default()
        };

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
