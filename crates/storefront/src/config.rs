//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Email transport
//! - `EMAIL_USER` - SMTP username, also the sender address
//! - `EMAIL_PASS` - SMTP password (set together with `EMAIL_USER`)
//! - `EMAIL_TO` - Shop owner address for order alerts (default: `EMAIL_USER`)
//! - `EMAIL_FROM_NAME` - Sender display name (default: MR.ING)
//! - `SMTP_HOST` - SMTP relay host (default: smtp.gmail.com)
//! - `SMTP_PORT` - SMTP relay port (default: 587)
//! - `SMTP_SECURE` - Use implicit TLS instead of STARTTLS (default: false)
//!
//! Without `EMAIL_USER`/`EMAIL_PASS` messages are written to the log instead
//! of being sent, and `EMAIL_TO` becomes required.
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `VERIFICATION_CODE_TTL_SECS` - Code lifetime, whole minutes up to a week (default: 600)
//! - `VERIFICATION_SWEEP_INTERVAL_SECS` - Stale code purge interval (default: 60)
//! - `ORDER_DELIVERY_POLICY` - `best-effort` or `require-all` (default: best-effort)
//! - `RATE_LIMIT_ENABLED` - Per-IP rate limiting (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use mring_core::Email;
use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Whether an order counts as placed when its notifications are not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Report success once both notifications were attempted; log failures.
    #[default]
    BestEffort,
    /// Report success only if both notifications were accepted.
    RequireAll,
}

impl FromStr for DeliveryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "best-effort" | "best_effort" => Ok(Self::BestEffort),
            "require-all" | "require_all" => Ok(Self::RequireAll),
            other => Err(format!(
                "expected 'best-effort' or 'require-all', got '{other}'"
            )),
        }
    }
}

/// Longest accepted `VERIFICATION_CODE_TTL_SECS` (one week).
pub const MAX_CODE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// SMTP transport; `None` logs messages instead of sending them
    pub smtp: Option<SmtpConfig>,
    /// Display name on outgoing mail
    pub from_name: String,
    /// Shop owner address receiving new-order alerts
    pub owner_email: Email,
    /// How long an issued code stays valid
    pub code_ttl: Duration,
    /// How often stale codes are purged from memory
    pub sweep_interval: Duration,
    /// Success rule for order notifications
    pub delivery_policy: DeliveryPolicy,
    /// Per-IP rate limiting on the API routes
    pub rate_limit_enabled: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// SMTP relay configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname
    pub host: String,
    /// SMTP server port
    pub port: u16,
    /// Implicit TLS (`true`) or STARTTLS (`false`)
    pub secure: bool,
    /// SMTP authentication username, also used as the sender address
    pub username: String,
    /// SMTP authentication password
    pub password: SecretString,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "3000")?;

        let smtp = SmtpConfig::from_env()?;
        let owner_email = match get_optional_env("EMAIL_TO") {
            Some(value) => parse_email("EMAIL_TO", &value)?,
            None => match &smtp {
                Some(smtp) => parse_email("EMAIL_USER", &smtp.username)?,
                None => return Err(ConfigError::MissingEnvVar("EMAIL_TO".to_string())),
            },
        };

        let code_ttl = code_ttl(
            "VERIFICATION_CODE_TTL_SECS",
            parse_env_or_default("VERIFICATION_CODE_TTL_SECS", "600")?,
        )?;
        let sweep_interval = Duration::from_secs(parse_env_or_default(
            "VERIFICATION_SWEEP_INTERVAL_SECS",
            "60",
        )?);
        if sweep_interval.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "VERIFICATION_SWEEP_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            smtp,
            from_name: get_env_or_default("EMAIL_FROM_NAME", "MR.ING"),
            owner_email,
            code_ttl,
            sweep_interval,
            delivery_policy: parse_env_or_default("ORDER_DELIVERY_POLICY", "best-effort")?,
            rate_limit_enabled: parse_bool_env("RATE_LIMIT_ENABLED", true)?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Defaults suitable for tests and local development: log-only mail,
    /// ten-minute codes, best-effort delivery, no rate limiting.
    #[must_use]
    pub fn local(owner_email: Email) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            smtp: None,
            from_name: "MR.ING".to_string(),
            owner_email,
            code_ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
            delivery_policy: DeliveryPolicy::BestEffort,
            rate_limit_enabled: false,
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
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let username = get_optional_env("EMAIL_USER");
        let password = get_optional_env("EMAIL_PASS");

        let (username, password) = match (username, password) {
            (Some(username), Some(password)) => (username, password),
            (None, None) => return Ok(None),
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("EMAIL_PASS".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("EMAIL_USER".to_string())),
        };

        Ok(Some(Self {
            host: get_env_or_default("SMTP_HOST", "smtp.gmail.com"),
            port: parse_env_or_default("SMTP_PORT", "587")?,
            secure: parse_bool_env("SMTP_SECURE", false)?,
            username,
            password: SecretString::from(password),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |value| parse_bool(key, &value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Check a code lifetime: a whole number of minutes, at most a week.
fn code_ttl(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 || secs % 60 != 0 || secs > MAX_CODE_TTL_SECS {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be a multiple of 60 between 60 and {MAX_CODE_TTL_SECS}, got {secs}"),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_email(key: &str, value: &str) -> Result<Email, ConfigError> {
    Email::normalize(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_policy_parse() {
        assert_eq!(
            "best-effort".parse::<DeliveryPolicy>().unwrap(),
            DeliveryPolicy::BestEffort
        );
        assert_eq!(
            " Require-All ".parse::<DeliveryPolicy>().unwrap(),
            DeliveryPolicy::RequireAll
        );
        assert!("sometimes".parse::<DeliveryPolicy>().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        assert!(matches!(
            parse_bool("X", "maybe"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u16>("STOREFRONT_PORT", "99999").unwrap_err();
        assert!(err.to_string().contains("STOREFRONT_PORT"));
    }

    #[test]
    fn test_code_ttl_bounds() {
        const KEY: &str = "VERIFICATION_CODE_TTL_SECS";
        assert_eq!(code_ttl(KEY, 600).unwrap(), Duration::from_secs(600));
        assert_eq!(
            code_ttl(KEY, MAX_CODE_TTL_SECS).unwrap(),
            Duration::from_secs(MAX_CODE_TTL_SECS)
        );

        for secs in [0, 30, 90, MAX_CODE_TTL_SECS + 60, 9_000_000_000_000] {
            assert!(
                matches!(code_ttl(KEY, secs), Err(ConfigError::InvalidEnvVar(k, _)) if k == KEY),
                "{secs}"
            );
        }
    }

    #[test]
    fn test_parse_email_normalizes() {
        let email = parse_email("EMAIL_TO", " Owner@Shop.Example ").unwrap();
        assert_eq!(email.as_str(), "owner@shop.example");
        assert!(parse_email("EMAIL_TO", "not-an-email").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let mut config = StorefrontConfig::local(Email::parse("owner@example.com").unwrap());
        config.port = 8080;

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_smtp_config_debug_redacts_password() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            secure: false,
            username: "shop@example.com".to_string(),
            password: SecretString::from("super_secret_app_password"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("smtp.example.com"));
        assert!(debug_output.contains("shop@example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_app_password"));
    }
}
