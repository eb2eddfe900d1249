//! CLI command implementations.

pub mod migrate;
pub mod seed;

use delicious_web::config::WebConfig;
use secrecy::SecretString;

/// Database URL from the same environment the server reads.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or no URL is set.
pub fn database_url() -> Result<SecretString, Box<dyn std::error::Error>> {
    WebConfig::from_env()?
        .database_url
        .ok_or_else(|| "DELICIOUS_DATABASE_URL not set".into())
}
