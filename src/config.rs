//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. A `.env` file in the working directory is loaded first if present.
//!
//! # Client IP Trust
//!
//! - `TRUST_XFF`: Trust `X-Forwarded-For` (only enable behind a proxy)
//! - `TRUSTED_PROXIES`: Comma-separated CIDR blocks of upstream proxies
//! - `TRUSTED_HEADER`: Header set by the proxy that is trusted absolutely
//! - `STRICT_CLIENT_IP`: Reject responses whose resolved IP is not an address
//!
//! # Logging
//!
//! - `LOG_LEVEL`: One of `DEBUG`, `INFO`, `WARN`, `ERROR` (default: `INFO`)
//! - `LOG_FORMAT`: `text` or `json` (default: `text`)
//! - `RUST_LOG`: Full `EnvFilter` directive, overrides `LOG_LEVEL`

use std::env;
use std::str::FromStr;

use axum::http::HeaderName;
use tracing::warn;

use crate::client_ip::{ClientIpPolicy, TrustedProxySet};
use crate::error::{AppError, AppResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}, expected text or json")),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 8000)
    pub port: u16,

    // =========================================================================
    // Client IP Configuration
    // =========================================================================
    /// Trust `X-Forwarded-For` headers (default: false).
    /// Never enable this when the service is reachable directly from the internet.
    pub trust_xff: bool,

    /// Raw comma-separated list of trusted proxy networks.
    ///
    /// Format: CIDR notation or bare addresses (e.g., "10.0.0.0/8,127.0.0.1")
    /// Default: empty, in which case a trusted chain is taken at face value
    pub trusted_proxies: String,

    /// Header injected by the edge proxy that carries the validated client IP
    /// (e.g., "X-Real-IP"). When present it bypasses all XFF handling.
    pub trusted_header: Option<String>,

    /// Reject requests whose resolved client IP is not an IP address (default: false)
    pub strict_client_ip: bool,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level name (default: "INFO")
    pub log_level: String,

    /// Log line format (default: text)
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            trust_xff: false,
            trusted_proxies: String::new(),
            trusted_header: None,
            strict_client_ip: false,
            log_level: "INFO".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value is invalid
    /// (e.g., non-numeric PORT, malformed TRUSTED_HEADER name).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or(defaults.host),
            port: Self::parse_env("PORT", defaults.port)?,

            // Client IP
            trust_xff: Self::parse_bool_env("TRUST_XFF", defaults.trust_xff)?,
            trusted_proxies: env::var("TRUSTED_PROXIES").unwrap_or_default(),
            trusted_header: env::var("TRUSTED_HEADER")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty()),
            strict_client_ip: Self::parse_bool_env("STRICT_CLIENT_IP", defaults.strict_client_ip)?,

            // Observability
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: Self::parse_env("LOG_FORMAT", defaults.log_format)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.trusted_header
            && HeaderName::from_bytes(name.as_bytes()).is_err()
        {
            return Err(AppError::ConfigError(format!(
                "TRUSTED_HEADER ({name:?}) is not a valid HTTP header name"
            )));
        }

        if !self.trusted_proxies.trim().is_empty() {
            if !self.trust_xff {
                warn!("TRUSTED_PROXIES is set but TRUST_XFF is disabled; proxies will be ignored");
            }
            if TrustedProxySet::parse(&self.trusted_proxies).is_empty() {
                warn!(
                    trusted_proxies = %self.trusted_proxies,
                    "No valid CIDR ranges in TRUSTED_PROXIES; X-Forwarded-For will be trusted as-is"
                );
            }
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed trusted proxy set, or `None` when `TRUSTED_PROXIES` is blank.
    pub fn trusted_proxy_set(&self) -> Option<TrustedProxySet> {
        if self.trusted_proxies.trim().is_empty() {
            None
        } else {
            Some(TrustedProxySet::parse(&self.trusted_proxies))
        }
    }

    /// Build the client IP trust policy described by this configuration.
    pub fn client_ip_policy(&self) -> ClientIpPolicy {
        ClientIpPolicy::new(
            self.trust_xff,
            self.trusted_proxy_set(),
            self.trusted_header.clone(),
        )
    }

    /// `EnvFilter` directive for `log_level`.
    ///
    /// Unrecognized levels fall back to the most verbose setting.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.trim().to_ascii_uppercase().as_str() {
            "INFO" => "info",
            "WARN" => "warn",
            "ERROR" => "error",
            _ => "debug",
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => parse_value(name, &val),
            Err(_) => Ok(default),
        }
    }

    fn parse_bool_env(name: &str, default: bool) -> AppResult<bool> {
        match env::var(name) {
            Ok(val) => parse_bool(name, &val),
            Err(_) => Ok(default),
        }
    }
}

fn parse_value<T>(name: &str, raw: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}")))
}

fn parse_bool(name: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(AppError::ConfigError(format!(
            "Invalid {name}: expected a boolean, got {other:?}"
        ))),
    }
}
