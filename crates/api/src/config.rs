use std::str::FromStr;

use crate::auth::jwt::JwtConfig;
use crate::integrations::llm::LlmConfig;
use crate::integrations::payments::PaymentConfig;
use crate::integrations::storage::StorageConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the
/// secrets named in each section's `from_env`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks, in seconds (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Storefront base URL used in email links.
    pub public_url: String,
    /// Reject logins from accounts that have not verified their email.
    pub require_email_verification: bool,
    /// Minimum password length for registration and resets.
    pub password_min_length: usize,
    /// Interval of the expired-token cleanup task, in seconds.
    pub token_cleanup_interval_secs: u64,
    pub jwt: JwtConfig,
    pub payment: PaymentConfig,
    /// `None` when no LLM key is configured.
    pub llm: Option<LlmConfig>,
    pub storage: StorageConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                    |
    /// |--------------------------------|----------------------------|
    /// | `HOST`                         | `0.0.0.0`                  |
    /// | `PORT`                         | `3000`                     |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`        | `10`                       |
    /// | `PUBLIC_URL`                   | `http://localhost:5173`    |
    /// | `REQUIRE_EMAIL_VERIFICATION`   | `true`                     |
    /// | `PASSWORD_MIN_LENGTH`          | `8`                        |
    /// | `TOKEN_CLEANUP_INTERVAL_SECS`  | `3600`                     |
    ///
    /// # Panics
    ///
    /// Panics on unparsable values or missing required secrets.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000);

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let public_url = std::env::var("PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();

        let require_email_verification = std::env::var("REQUIRE_EMAIL_VERIFICATION")
            .map(|v| {
                parse_flag(&v).unwrap_or_else(|| {
                    panic!("REQUIRE_EMAIL_VERIFICATION must be true or false, got '{v}'")
                })
            })
            .unwrap_or(true);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 10),
            public_url,
            require_email_verification,
            password_min_length: env_or("PASSWORD_MIN_LENGTH", 8),
            token_cleanup_interval_secs: env_or("TOKEN_CLEANUP_INTERVAL_SECS", 3600),
            jwt: JwtConfig::from_env(),
            payment: PaymentConfig::from_env(),
            llm: LlmConfig::from_env(),
            storage: StorageConfig::from_env(),
        }
    }
}

/// Read and parse `key`, falling back to `default` when unset.
///
/// # Panics
///
/// Panics if the variable is set but does not parse.
pub(crate) fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

/// Read an optional, non-empty string variable.
pub(crate) fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a comma-separated origin list.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a boolean flag (`true/false`, `1/0`, `yes/no`).
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
