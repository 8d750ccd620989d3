//! Loan ledger client error types.

/// Errors from loan ledger calls.
#[derive(Debug, thiserror::Error)]
pub enum LoanClientError {
    /// Transport failure: connection refused, DNS, timeout.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The loan ledger answered with a non-success status.
    #[error("loan ledger {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The response body was not the expected JSON.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl LoanClientError {
    /// Whether the failure was the request exceeding its timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Http { source, .. } | Self::Deserialization { source, .. } => {
                source.is_timeout()
            }
            _ => false,
        }
    }
}
