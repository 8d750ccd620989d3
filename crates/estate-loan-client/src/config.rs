//! Loan ledger client configuration.
//!
//! Defaults point at a loan ledger on the local host. Override via
//! environment variables or explicit construction for tests.

use url::Url;

/// Default loan ledger base URL.
pub const DEFAULT_LOAN_LEDGER_URL: &str = "http://localhost:5000";

/// Default bound on a single status query, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Configuration for reaching the loan ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanClientConfig {
    /// Base URL of the loan ledger service.
    pub base_url: Url,
    /// Per-request timeout in seconds. Covers connect, send and body read.
    pub timeout_secs: u64,
}

impl LoanClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `LOAN_LEDGER_URL` (default: `http://localhost:5000`)
    /// - `LOAN_LEDGER_TIMEOUT_SECS` (default: 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_url("LOAN_LEDGER_URL", DEFAULT_LOAN_LEDGER_URL)?,
            timeout_secs: env_timeout("LOAN_LEDGER_TIMEOUT_SECS")?,
        })
    }

    /// Configuration for an explicit base URL with the default timeout.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url("base_url", base_url)?,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Replace the timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_url(var, &raw)
}

fn env_timeout(var: &str) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(ConfigError::InvalidTimeout(var.to_string(), raw)),
            Ok(secs) => Ok(secs),
        },
        Err(_) => Ok(DEFAULT_TIMEOUT_SECS),
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(
            name.to_string(),
            "not a base URL".to_string(),
        ));
    }
    Ok(url)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid timeout for {0}: {1:?} (expected a positive number of seconds)")]
    InvalidTimeout(String, String),
}
