//! Relay configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SLACK_BOT_TOKEN` - Slack bot token (xoxb-...)
//! - `SLACK_SIGNING_SECRET` - Slack app signing secret
//! - `SALESFORCE_API_URL` - Endpoint that receives `{recordId, decision, userEmail}`
//!
//! ## Salesforce credential (one of)
//! - `SALESFORCE_CLIENT_ID`, `SALESFORCE_CLIENT_SECRET`, `SALESFORCE_USERNAME`,
//!   `SALESFORCE_PASSWORD` - OAuth password grant (all four together)
//! - `SALESFORCE_ACCESS_TOKEN` - Pre-issued bearer token
//!
//! ## Optional
//! - `RELAY_HOST` - Bind address (default: 127.0.0.1)
//! - `RELAY_PORT` - Listen port (default: 3000)
//! - `SALESFORCE_TOKEN_URL` - OAuth token endpoint
//!   (default: <https://login.salesforce.com/services/oauth2/token>)
//! - `SALESFORCE_CACHE_TOKEN` - Reuse the OAuth token across relays (default: false)
//! - `SLACK_API_BASE` - Slack Web API base URL (default: <https://slack.com/api>)
//! - `SLACK_APP_TOKEN` - App-level token (accepted, unused over HTTP transport)
//! - `SLACK_HOME_VIEW_PATH` - App Home view JSON (default: block-kit/app_home_default.json)
//! - `HTTP_TIMEOUT_SECS` - Timeout for every outbound call (default: 10)
//! - `RETRY_MAX_ATTEMPTS` - Attempts per outbound call (default: 3)
//! - `RETRY_BASE_DELAY_MS` - First backoff delay (default: 250)
//! - `DECISION_DEDUPE_TTL_SECS` - How long a decided record rejects new clicks (default: 900)
//! - `LOG_FORMAT` - `json` for structured logs, text otherwise
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::retry::RetryPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_TOKEN_URL: &str = "https://login.salesforce.com/services/oauth2/token";
const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
const DEFAULT_HOME_VIEW_PATH: &str = "block-kit/app_home_default.json";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Relay application configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Slack configuration
    pub slack: SlackConfig,
    /// Salesforce configuration
    pub salesforce: SalesforceConfig,
    /// Timeout and retry settings for outbound calls
    pub http: HttpConfig,
    /// How long a record stays decided after a successful CRM submission
    pub dedupe_ttl: Duration,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Slack app configuration.
///
/// Implements `Debug` manually to redact secrets.
#[derive(Clone)]
pub struct SlackConfig {
    /// Slack bot token (xoxb-...).
    pub bot_token: SecretString,
    /// Slack app signing secret for webhook verification.
    pub signing_secret: SecretString,
    /// Web API base URL.
    pub api_base: String,
    /// Path to the App Home view published on `app_home_opened`.
    pub home_view_path: PathBuf,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("home_view_path", &self.home_view_path)
            .finish()
    }
}

/// Salesforce configuration.
#[derive(Debug, Clone)]
pub struct SalesforceConfig {
    /// Endpoint that receives approval decisions.
    pub api_url: String,
    /// How the relay obtains a bearer token.
    pub credential: CredentialConfig,
}

/// Source of the Salesforce bearer token.
///
/// Implements `Debug` manually to redact secrets.
#[derive(Clone)]
pub enum CredentialConfig {
    /// OAuth resource-owner password grant.
    PasswordGrant(PasswordGrantConfig),
    /// Pre-issued access token.
    Static(SecretString),
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PasswordGrant(grant) => f.debug_tuple("PasswordGrant").field(grant).finish(),
            Self::Static(_) => f.debug_tuple("Static").field(&"[REDACTED]").finish(),
        }
    }
}

/// OAuth password grant settings.
///
/// Implements `Debug` manually to redact the client secret and password.
#[derive(Clone)]
pub struct PasswordGrantConfig {
    /// Token endpoint.
    pub token_url: String,
    /// Connected app consumer key.
    pub client_id: String,
    /// Connected app consumer secret.
    pub client_secret: SecretString,
    /// Integration user name.
    pub username: String,
    /// Integration user password (with security token appended, if required).
    pub password: SecretString,
    /// Reuse the token across relays until Salesforce rejects it.
    pub cache_token: bool,
}

impl std::fmt::Debug for PasswordGrantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGrantConfig")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("cache_token", &self.cache_token)
            .finish()
    }
}

/// Outbound HTTP settings shared by the Slack and Salesforce clients.
#[derive(Debug, Clone, Copy)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Backoff policy for transient failures.
    pub retry: RetryPolicy,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpConfig {
    /// Build a `reqwest` client carrying the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialized.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(self.timeout).build()
    }

    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = parse_env::<u64>("HTTP_TIMEOUT_SECS", "10")?;
        let max_attempts = parse_env::<u32>("RETRY_MAX_ATTEMPTS", "3")?;
        let base_delay_ms = parse_env::<u64>("RETRY_BASE_DELAY_MS", "250")?;

        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "HTTP_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "RETRY_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy::new(max_attempts, Duration::from_millis(base_delay_ms)),
        })
    }
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    /// Weak secrets only produce warnings.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("RELAY_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("RELAY_HOST".to_string(), e.to_string()))?;
        let port = parse_env::<u16>("RELAY_PORT", "3000")?;

        let slack = SlackConfig::from_env()?;
        let salesforce = SalesforceConfig::from_env()?;
        let http = HttpConfig::from_env()?;
        let dedupe_ttl = Duration::from_secs(parse_env::<u64>("DECISION_DEDUPE_TTL_SECS", "900")?);
        let json_logs = get_optional_env("LOG_FORMAT")
            .is_some_and(|format| format.eq_ignore_ascii_case("json"));

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            host,
            port,
            slack,
            salesforce,
            http,
            dedupe_ttl,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SlackConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let bot_token = get_required_env("SLACK_BOT_TOKEN")?;
        let signing_secret = get_required_env("SLACK_SIGNING_SECRET")?;

        warn_on_weak_secret(&bot_token, "SLACK_BOT_TOKEN");
        warn_on_weak_secret(&signing_secret, "SLACK_SIGNING_SECRET");

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            signing_secret: SecretString::from(signing_secret),
            api_base: get_env_or_default("SLACK_API_BASE", DEFAULT_SLACK_API_BASE),
            home_view_path: PathBuf::from(get_env_or_default(
                "SLACK_HOME_VIEW_PATH",
                DEFAULT_HOME_VIEW_PATH,
            )),
        })
    }
}

impl SalesforceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_url = get_required_env("SALESFORCE_API_URL")?;
        let credential = CredentialConfig::from_env()?;
        Ok(Self {
            api_url,
            credential,
        })
    }
}

impl CredentialConfig {
    /// The OAuth set wins when complete; a partial set is an error unless a
    /// static token is available to fall back on.
    fn from_env() -> Result<Self, ConfigError> {
        let client_id = get_optional_env("SALESFORCE_CLIENT_ID");
        let client_secret = get_optional_env("SALESFORCE_CLIENT_SECRET");
        let username = get_optional_env("SALESFORCE_USERNAME");
        let password = get_optional_env("SALESFORCE_PASSWORD");
        let access_token = get_optional_env("SALESFORCE_ACCESS_TOKEN");

        match (client_id, client_secret, username, password, access_token) {
            (Some(client_id), Some(client_secret), Some(username), Some(password), _) => {
                warn_on_weak_secret(&client_secret, "SALESFORCE_CLIENT_SECRET");
                let cache_token = match get_optional_env("SALESFORCE_CACHE_TOKEN") {
                    Some(value) => parse_bool("SALESFORCE_CACHE_TOKEN", &value)?,
                    None => false,
                };
                Ok(Self::PasswordGrant(PasswordGrantConfig {
                    token_url: get_env_or_default("SALESFORCE_TOKEN_URL", DEFAULT_TOKEN_URL),
                    client_id,
                    client_secret: SecretString::from(client_secret),
                    username,
                    password: SecretString::from(password),
                    cache_token,
                }))
            }
            (_, _, _, _, Some(token)) => {
                warn_on_weak_secret(&token, "SALESFORCE_ACCESS_TOKEN");
                Ok(Self::Static(SecretString::from(token)))
            }
            (None, None, None, None, None) => Err(ConfigError::MissingEnvVar(
                "SALESFORCE_ACCESS_TOKEN".to_string(),
            )),
            _ => Err(ConfigError::InvalidEnvVar(
                "SALESFORCE_*".to_string(),
                "SALESFORCE_CLIENT_ID, SALESFORCE_CLIENT_SECRET, SALESFORCE_USERNAME and \
                 SALESFORCE_PASSWORD must be set together"
                    .to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable. Blank values count as missing.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    get_optional_env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
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

/// Secrets are issued by Slack and Salesforce, so weak values only warn.
fn warn_on_weak_secret(secret: &str, var_name: &str) {
    if let Err(e) = validate_secret_strength(secret, var_name) {
        tracing::warn!("{var_name} validation warning: {e}");
    }
}
