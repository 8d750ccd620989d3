//! # Service State and Configuration
//!
//! Each service has a config loaded from the environment and a state
//! handle shared by its handlers. States are cheap to clone; the ledgers
//! inside share their data across clones.

use std::sync::Arc;

use estate_core::{LoanApprovalCheck, SharedSecret};
use estate_loan_client::{LoanClientConfig, LoanClientError, LoanLedgerClient};
use estate_state::{EscrowLedger, LoanLedger};
use zeroize::Zeroizing;

use crate::middleware::metrics::{ApiMetrics, MeteredLoanApprovals};

/// Default loan ledger bind port.
pub const DEFAULT_LOAN_LEDGER_PORT: u16 = 5000;
/// Default escrow ledger bind port.
pub const DEFAULT_ESCROW_LEDGER_PORT: u16 = 5001;
/// Default loan ledger admin credential.
pub const DEFAULT_ADMIN_KEY: &str = "0x8f42a25c9fd394a778df02e0f56d691e4f4ddf9e";
/// Default escrow agent credential.
pub const DEFAULT_AGENT_KEY: &str = "0x5a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
    #[error(transparent)]
    LoanClient(#[from] estate_loan_client::ConfigError),
}

// ── Loan ledger service ─────────────────────────────────────────────

/// Loan ledger service configuration.
#[derive(Clone)]
pub struct LoanServiceConfig {
    pub port: u16,
    pub admin_key: Zeroizing<String>,
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for LoanServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoanServiceConfig")
            .field("port", &self.port)
            .field("admin_key", &"[REDACTED]")
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for LoanServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_LOAN_LEDGER_PORT,
            admin_key: Zeroizing::new(DEFAULT_ADMIN_KEY.to_string()),
            metrics_enabled: true,
        }
    }
}

impl LoanServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `LOAN_LEDGER_PORT` (default: 5000)
    /// - `LOAN_ADMIN_KEY` (default: the well-known admin address)
    /// - `ESTATE_METRICS_ENABLED` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: env_port("LOAN_LEDGER_PORT", DEFAULT_LOAN_LEDGER_PORT)?,
            admin_key: env_secret("LOAN_ADMIN_KEY", DEFAULT_ADMIN_KEY),
            metrics_enabled: env_flag("ESTATE_METRICS_ENABLED", true)?,
        })
    }
}

/// Handler state of the loan ledger service.
#[derive(Debug, Clone)]
pub struct LoanAppState {
    pub ledger: LoanLedger,
}

impl LoanAppState {
    pub fn new(ledger: LoanLedger) -> Self {
        Self { ledger }
    }

    pub fn from_config(config: &LoanServiceConfig) -> Self {
        let admin = SharedSecret::new(config.admin_key.as_str());
        Self::new(LoanLedger::new(Arc::new(admin)))
    }
}

// ── Escrow ledger service ───────────────────────────────────────────

/// Escrow ledger service configuration.
#[derive(Clone)]
pub struct EscrowServiceConfig {
    pub port: u16,
    pub agent_key: Zeroizing<String>,
    pub loan_ledger: LoanClientConfig,
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for EscrowServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowServiceConfig")
            .field("port", &self.port)
            .field("agent_key", &"[REDACTED]")
            .field("loan_ledger", &self.loan_ledger)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl EscrowServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ESCROW_LEDGER_PORT` (default: 5001)
    /// - `ESCROW_AGENT_KEY` (default: the well-known agent address)
    /// - `LOAN_LEDGER_URL`, `LOAN_LEDGER_TIMEOUT_SECS` (see [`LoanClientConfig`])
    /// - `ESTATE_METRICS_ENABLED` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: env_port("ESCROW_LEDGER_PORT", DEFAULT_ESCROW_LEDGER_PORT)?,
            agent_key: env_secret("ESCROW_AGENT_KEY", DEFAULT_AGENT_KEY),
            loan_ledger: LoanClientConfig::from_env()?,
            metrics_enabled: env_flag("ESTATE_METRICS_ENABLED", true)?,
        })
    }
}

/// Handler state of the escrow ledger service.
#[derive(Debug, Clone)]
pub struct EscrowAppState {
    pub ledger: EscrowLedger,
    /// Probed by the readiness endpoint when present.
    pub loan_ledger: Option<LoanLedgerClient>,
}

impl EscrowAppState {
    /// State without a readiness dependency on the loan ledger.
    pub fn new(ledger: EscrowLedger) -> Self {
        Self {
            ledger,
            loan_ledger: None,
        }
    }

    /// Build the ledger against a networked loan ledger. When `metrics` is
    /// given, loan checks are counted by outcome.
    pub fn from_config(
        config: &EscrowServiceConfig,
        metrics: Option<&ApiMetrics>,
    ) -> Result<Self, LoanClientError> {
        let client = LoanLedgerClient::new(config.loan_ledger.clone())?;
        let mut loans: Arc<dyn LoanApprovalCheck> = Arc::new(client.clone());
        if let Some(metrics) = metrics {
            loans = Arc::new(MeteredLoanApprovals::new(loans, metrics.clone()));
        }
        let agent = SharedSecret::new(config.agent_key.as_str());
        Ok(Self {
            ledger: EscrowLedger::new(Arc::new(agent), loans),
            loan_ledger: Some(client),
        })
    }
}

// ── Environment helpers ─────────────────────────────────────────────

fn env_port(var: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

fn env_secret(var: &str, default: &str) -> Zeroizing<String> {
    Zeroizing::new(std::env::var(var).unwrap_or_else(|_| default.to_string()))
}

fn env_flag(var: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(var.to_string(), raw)),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_credentials() {
        let config = LoanServiceConfig::default();
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(DEFAULT_ADMIN_KEY));

        let escrow = EscrowServiceConfig {
            port: 1,
            agent_key: Zeroizing::new("agent-secret".into()),
            loan_ledger: LoanClientConfig::new("http://127.0.0.1:5000").unwrap(),
            metrics_enabled: false,
        };
        assert!(!format!("{escrow:?}").contains("agent-secret"));
    }

    #[test]
    fn env_helpers_fall_back_to_defaults() {
        assert_eq!(env_port("ESTATE_NONEXISTENT_PORT_12345", 5000).unwrap(), 5000);
        assert!(env_flag("ESTATE_NONEXISTENT_FLAG_12345", true).unwrap());
        assert_eq!(
            env_secret("ESTATE_NONEXISTENT_SECRET_12345", "dflt").as_str(),
            "dflt"
        );
    }

    #[test]
    fn escrow_state_from_config_keeps_client_for_readiness() {
        let config = EscrowServiceConfig {
            port: 0,
            agent_key: Zeroizing::new(DEFAULT_AGENT_KEY.into()),
            loan_ledger: LoanClientConfig::new("http://127.0.0.1:5000").unwrap(),
            metrics_enabled: true,
        };
        let state = EscrowAppState::from_config(&config, Some(&ApiMetrics::new())).unwrap();
        assert!(state.loan_ledger.is_some());
        assert!(state.ledger.is_empty());
    }
}
