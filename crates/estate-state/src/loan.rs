//! # Loan Ledger
//!
//! Loan applications keyed by borrower address.
//!
//! ## Lifecycle
//!
//! ```text
//! apply ──▶ Pending ──approve──▶ Approved ──repay──▶ Repaid
//!              │                     │
//!              └──────reject─────────┴──▶ Voided (repaid flag set, approved cleared)
//! ```
//!
//! A rejection reuses the `repaid` flag as its terminal marker, so a voided
//! loan and a paid-off loan are told apart only by `approved` having been
//! set before (which the record does not retain). Rejecting is unguarded and
//! therefore idempotent.
//!
//! ## Guards
//!
//! Admin operations take an [`AdminGrant`], which only
//! [`LoanLedger::authorize`] can issue, so the credential is checked once and
//! before anything else. Every other precondition is checked before the
//! record is touched; a failed operation never mutates state. All operations on one borrower are
//! serialized through the [`KeyedStore`] slot for that address.

use std::sync::Arc;

use estate_core::{Address, CredentialVerifier, ErrorKind, Presence, PropertyId};
use serde::Serialize;
use thiserror::Error;

use crate::store::KeyedStore;

/// Fixed annual interest rate applied to every loan, in percent.
pub const INTEREST_RATE_PERCENT: f64 = 5.0;

/// `(amount + amount * rate / 100) / term_in_months`.
pub fn monthly_installment(amount: f64, term_in_months: u32) -> f64 {
    let total = amount + amount * INTEREST_RATE_PERCENT / 100.0;
    total / f64::from(term_in_months)
}

// ── Records ─────────────────────────────────────────────────────────

/// A borrower's loan. Field names follow the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanRecord {
    #[serde(rename = "is_approved")]
    pub approved: bool,
    #[serde(rename = "is_repaid")]
    pub repaid: bool,
    #[serde(rename = "amount")]
    pub principal: f64,
    pub property_id: PropertyId,
    pub term_in_months: u32,
    pub monthly_installment: f64,
}

impl LoanRecord {
    /// Approved and neither repaid nor voided.
    pub fn is_active_approval(&self) -> bool {
        self.approved && !self.repaid
    }
}

/// A loan application as received. Every field is optional on the wire;
/// zero values count as missing (see [`Presence`]).
#[derive(Debug, Clone, Default)]
pub struct LoanApplication {
    /// Generated when absent.
    pub buyer_address: Option<Address>,
    pub property_id: Option<PropertyId>,
    pub amount: Option<f64>,
    pub term_in_months: Option<u32>,
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanStatus {
    /// `approved && !repaid`.
    pub is_approved: bool,
    pub details: LoanRecord,
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanError {
    #[error("missing required parameters: {0}")]
    InvalidRequest(String),

    #[error("unauthorized access")]
    Unauthorized,

    #[error("loan not found for {0}")]
    NotFound(Address),

    #[error("loan already exists for {0}")]
    DuplicateLoan(Address),

    #[error("loan for {0} already approved")]
    AlreadyApproved(Address),

    #[error("loan for {0} not approved")]
    NotApproved(Address),
}

impl LoanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateLoan(_) | Self::AlreadyApproved(_) => ErrorKind::Conflict,
            Self::NotApproved(_) => ErrorKind::PreconditionFailed,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound(_) => "LOAN_NOT_FOUND",
            Self::DuplicateLoan(_) => "DUPLICATE_LOAN",
            Self::AlreadyApproved(_) => "ALREADY_APPROVED",
            Self::NotApproved(_) => "NOT_APPROVED",
        }
    }
}

/// Proof that a caller presented the admin credential to
/// [`LoanLedger::authorize`]. Consumed by one admin operation.
#[derive(Debug)]
pub struct AdminGrant {
    _private: (),
}

// ── Ledger ──────────────────────────────────────────────────────────

/// The authoritative loan store. Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct LoanLedger {
    loans: KeyedStore<Address, LoanRecord>,
    admin: Arc<dyn CredentialVerifier>,
}

impl std::fmt::Debug for LoanLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoanLedger")
            .field("loans", &self.loans.len())
            .finish_non_exhaustive()
    }
}

impl LoanLedger {
    /// Create an empty ledger whose admin operations are gated by `admin`.
    pub fn new(admin: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            loans: KeyedStore::new(),
            admin,
        }
    }

    /// Check an admin credential, issuing the grant admin operations need.
    pub fn authorize(&self, admin_key: Option<&str>) -> Result<AdminGrant, LoanError> {
        if self.admin.verify(admin_key) {
            Ok(AdminGrant { _private: () })
        } else {
            tracing::warn!("loan admin authentication failed");
            Err(LoanError::Unauthorized)
        }
    }

    /// Open a loan application. Returns the borrower address (generated if
    /// the application carried none) and the stored record.
    pub async fn apply(
        &self,
        application: LoanApplication,
    ) -> Result<(Address, LoanRecord), LoanError> {
        let borrower = application
            .buyer_address
            .filter(Presence::is_present)
            .unwrap_or_else(Address::generate);

        let (property_id, amount, term_in_months) = match (
            PropertyId::supplied(application.property_id),
            f64::supplied(application.amount),
            u32::supplied(application.term_in_months),
        ) {
            (Some(p), Some(a), Some(t)) => (p, a, t),
            _ => {
                return Err(LoanError::InvalidRequest(
                    "property_id, amount and term_in_months are required".into(),
                ))
            }
        };

        let mut slot = self.loans.lock_or_create(borrower.clone()).await;
        if let Some(existing) = (*slot).as_ref() {
            if existing.principal > 0.0 {
                tracing::debug!(buyer = %borrower, "duplicate loan application rejected");
                return Err(LoanError::DuplicateLoan(borrower));
            }
        }

        let record = LoanRecord {
            approved: false,
            repaid: false,
            principal: amount,
            property_id,
            term_in_months,
            monthly_installment: monthly_installment(amount, term_in_months),
        };
        *slot = Some(record.clone());

        tracing::info!(
            buyer = %borrower,
            property_id = %property_id,
            amount,
            term_in_months,
            monthly_installment = record.monthly_installment,
            "loan applied"
        );
        Ok((borrower, record))
    }

    /// Approve a pending loan.
    pub async fn approve(
        &self,
        grant: AdminGrant,
        borrower: Option<&Address>,
    ) -> Result<LoanRecord, LoanError> {
        self.with_loan(grant, borrower, |borrower, loan| {
            if loan.approved {
                return Err(LoanError::AlreadyApproved(borrower.clone()));
            }
            loan.approved = true;
            tracing::info!(buyer = %borrower, property_id = %loan.property_id, "loan approved");
            Ok(())
        })
        .await
    }

    /// Void a loan. Always succeeds for a known borrower.
    pub async fn reject(
        &self,
        grant: AdminGrant,
        borrower: Option<&Address>,
    ) -> Result<LoanRecord, LoanError> {
        self.with_loan(grant, borrower, |borrower, loan| {
            loan.approved = false;
            loan.repaid = true;
            tracing::info!(buyer = %borrower, property_id = %loan.property_id, "loan rejected");
            Ok(())
        })
        .await
    }

    /// Mark an approved loan as repaid.
    pub async fn repay(
        &self,
        grant: AdminGrant,
        borrower: Option<&Address>,
    ) -> Result<LoanRecord, LoanError> {
        self.with_loan(grant, borrower, |borrower, loan| {
            if !loan.approved {
                return Err(LoanError::NotApproved(borrower.clone()));
            }
            loan.repaid = true;
            tracing::info!(buyer = %borrower, property_id = %loan.property_id, "loan repaid");
            Ok(())
        })
        .await
    }

    /// Current status of a borrower's loan. No credential required.
    pub async fn status(&self, borrower: &Address) -> Result<LoanStatus, LoanError> {
        let details = self
            .loans
            .get(borrower)
            .await
            .ok_or_else(|| LoanError::NotFound(borrower.clone()))?;
        Ok(LoanStatus {
            is_approved: details.is_active_approval(),
            details,
        })
    }

    /// Number of borrowers with a loan on record.
    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    /// Shared guard sequence for admin operations: require a borrower, look
    /// the loan up, then run `f` under the borrower's lock.
    async fn with_loan<F>(
        &self,
        _grant: AdminGrant,
        borrower: Option<&Address>,
        f: F,
    ) -> Result<LoanRecord, LoanError>
    where
        F: FnOnce(&Address, &mut LoanRecord) -> Result<(), LoanError>,
    {
        let borrower = borrower
            .filter(|b| b.is_present())
            .ok_or_else(|| LoanError::InvalidRequest("buyer_address is required".into()))?;

        let mut slot = self
            .loans
            .lock_existing(borrower)
            .await
            .ok_or_else(|| LoanError::NotFound(borrower.clone()))?;
        let loan = (*slot)
            .as_mut()
            .ok_or_else(|| LoanError::NotFound(borrower.clone()))?;

        // Guards run against a copy so a rejected operation leaves no trace.
        let mut updated = loan.clone();
        if let Err(e) = f(borrower, &mut updated) {
            tracing::debug!(buyer = %borrower, error = %e, "loan operation rejected");
            return Err(e);
        }
        *loan = updated.clone();
        Ok(updated)
    }
}
