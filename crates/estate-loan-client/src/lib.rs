//! # estate-loan-client — Typed client for the Loan Ledger
//!
//! The escrow service consults the loan ledger before releasing funds. This
//! crate is the only path by which it does so:
//!
//! - [`LoanLedgerClient::loan_status`] — typed `GET /loan_status/{buyer}`.
//! - [`LoanLedgerClient::health_check`] — `GET /health/liveness`, used by
//!   the escrow readiness probe.
//! - `impl LoanApprovalCheck for LoanLedgerClient` — the fail-closed
//!   approval decision used on release.
//!
//! ## Failure semantics
//!
//! Every request is bounded by the configured timeout and sent exactly
//! once; there are no retries. When used as a [`LoanApprovalCheck`], any
//! failure to obtain a well-formed answer (transport error, timeout,
//! non-success status, unreadable body) becomes
//! [`LoanDecision::Unavailable`], which the escrow ledger treats as a
//! denial. Only a 404 carrying the loan ledger's `LOAN_NOT_FOUND` error
//! code means "no loan for this buyer" and becomes a plain
//! [`LoanDecision::Denied`]; any other 404 is an unknown route or the wrong
//! service and is `Unavailable`.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigError, LoanClientConfig};
pub use error::LoanClientError;
pub use types::{ErrorEnvelope, LoanDetails, LoanStatusResponse};

use std::time::Duration;

use async_trait::async_trait;
use estate_core::{Address, LoanApprovalCheck, LoanDecision};
use url::Url;

/// HTTP client for one loan ledger instance. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LoanLedgerClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LoanLedgerClient {
    /// Create a client from configuration.
    pub fn new(config: LoanClientConfig) -> Result<Self, LoanClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LoanClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self::with_http(http, config.base_url))
    }

    /// Create a client around an existing `reqwest::Client`. The caller owns
    /// the timeout policy of `http`.
    pub fn with_http(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The loan ledger base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch a buyer's loan status.
    ///
    /// Calls `GET {base_url}/loan_status/{buyer}`. Returns `Ok(None)` when the
    /// loan ledger answers 404 with its `LOAN_NOT_FOUND` error code. A 404
    /// with any other body is an [`LoanClientError::ApiError`].
    pub async fn loan_status(
        &self,
        buyer: &Address,
    ) -> Result<Option<LoanStatusResponse>, LoanClientError> {
        let endpoint = format!("GET /loan_status/{buyer}");
        let url = self.endpoint_url(&["loan_status", buyer.as_str()])?;

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| LoanClientError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND.as_u16()
                && ErrorEnvelope::is_loan_not_found(&body)
            {
                return Ok(None);
            }
            return Err(LoanClientError::ApiError {
                endpoint,
                status,
                body,
            });
        }

        resp.json()
            .await
            .map(Some)
            .map_err(|e| LoanClientError::Deserialization {
                endpoint,
                source: e,
            })
    }

    /// Probe the loan ledger's liveness endpoint.
    pub async fn health_check(&self) -> Result<(), LoanClientError> {
        let endpoint = "GET /health/liveness".to_string();
        let url = self.endpoint_url(&["health", "liveness"])?;

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| LoanClientError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LoanClientError::ApiError {
                endpoint,
                status,
                body,
            });
        }
        Ok(())
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url, LoanClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                config::ConfigError::InvalidUrl(self.base_url.to_string(), "not a base URL".into())
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl LoanApprovalCheck for LoanLedgerClient {
    async fn check_approval(&self, buyer: &Address) -> LoanDecision {
        match self.loan_status(buyer).await {
            Ok(Some(status)) if status.is_approved => LoanDecision::Approved,
            Ok(Some(_)) | Ok(None) => LoanDecision::Denied,
            Err(e) => LoanDecision::Unavailable(e.to_string()),
        }
    }
}
