//! # Escrow Ledger
//!
//! Property escrows keyed by property id, plus the buyer balance side
//! effects.
//!
//! ## Lifecycle
//!
//! ```text
//! create ──▶ Open ──deposit (buyer, exact amount)──▶ Funded ──release──▶ Completed
//!                                                      │
//!                                                      └───refund───▶ Completed
//! ```
//!
//! `completed` is terminal: once set, both release and refund are rejected.
//! A property may be re-created (overwritten) while its escrow is unfunded;
//! once funds are deposited the property id is taken for good.
//!
//! ## Release
//!
//! After the funded / not-completed guards, release consults the
//! collaborators in order: ownership registry, loan approval, transfer
//! finalization. The property's slot stays locked for the whole sequence,
//! so a concurrent refund or second release on the same property waits
//! and then observes `completed`. The loan approval check is fail-closed:
//! an unreachable loan ledger denies the release exactly as a negative
//! answer does.

use std::sync::Arc;

use estate_core::{
    AlwaysFinalize, Address, CredentialVerifier, ErrorKind, EvenPropertyOwnership,
    LoanApprovalCheck, LoanDecision, OwnershipRegistry, Presence, PropertyId, TransferFinalizer,
};
use serde::Serialize;
use thiserror::Error;

use crate::balance::BalanceLedger;
use crate::store::KeyedStore;

// ── Records ─────────────────────────────────────────────────────────

/// An escrow for one property. Field names follow the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EscrowRecord {
    pub buyer: Address,
    pub seller: Address,
    pub property_id: PropertyId,
    pub amount: f64,
    pub funds_deposited: bool,
    pub completed: bool,
}

/// An escrow creation request as received. Zero / empty values count as
/// missing (see [`Presence`]).
#[derive(Debug, Clone, Default)]
pub struct NewEscrow {
    pub buyer: Option<Address>,
    pub seller: Option<Address>,
    pub property_id: Option<PropertyId>,
    pub amount: Option<f64>,
}

/// Acknowledgement of a deposit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositReceipt {
    pub buyer: Address,
    pub amount: f64,
    pub property_id: PropertyId,
}

/// Acknowledgement of a release to the seller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseReceipt {
    pub seller: Address,
    pub amount: f64,
    pub property_id: PropertyId,
}

/// Acknowledgement of a refund to the buyer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefundReceipt {
    pub buyer: Address,
    pub amount: f64,
    pub property_id: PropertyId,
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EscrowError {
    #[error("missing required parameters: {0}")]
    InvalidRequest(String),

    #[error("unauthorized access: {0}")]
    Unauthorized(String),

    #[error("escrow not found")]
    NotFound,

    #[error("escrow already exists for property {0}")]
    DuplicateEscrow(PropertyId),

    #[error("funds already deposited for property {0}")]
    AlreadyDeposited(PropertyId),

    #[error("incorrect deposit amount: expected {expected}")]
    AmountMismatch { expected: f64, provided: Option<f64> },

    #[error("funds not yet deposited for property {0}")]
    NotFunded(PropertyId),

    #[error("transaction already completed for property {0}")]
    AlreadyCompleted(PropertyId),

    #[error("seller does not own property {0}")]
    OwnershipMismatch(PropertyId),

    #[error("loan not approved for {0}")]
    LoanNotApproved(Address),

    #[error("property transfer failed for property {0}")]
    TransferFailed(PropertyId),
}

impl EscrowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) | Self::AmountMismatch { .. } => ErrorKind::InvalidRequest,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::NotFound => ErrorKind::NotFound,
            Self::DuplicateEscrow(_) | Self::AlreadyDeposited(_) | Self::AlreadyCompleted(_) => {
                ErrorKind::Conflict
            }
            Self::NotFunded(_) | Self::OwnershipMismatch(_) | Self::LoanNotApproved(_) => {
                ErrorKind::PreconditionFailed
            }
            Self::TransferFailed(_) => ErrorKind::DownstreamFailure,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound => "ESCROW_NOT_FOUND",
            Self::DuplicateEscrow(_) => "DUPLICATE_ESCROW",
            Self::AlreadyDeposited(_) => "ALREADY_DEPOSITED",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::NotFunded(_) => "NOT_FUNDED",
            Self::AlreadyCompleted(_) => "ALREADY_COMPLETED",
            Self::OwnershipMismatch(_) => "OWNERSHIP_MISMATCH",
            Self::LoanNotApproved(_) => "LOAN_NOT_APPROVED",
            Self::TransferFailed(_) => "TRANSFER_FAILED",
        }
    }
}

/// Proof that a caller presented the escrow-agent credential to
/// [`EscrowLedger::authorize`]. Consumed by one agent operation.
#[derive(Debug)]
pub struct AgentGrant {
    _private: (),
}

// ── Ledger ──────────────────────────────────────────────────────────

/// The authoritative escrow store. Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct EscrowLedger {
    escrows: KeyedStore<PropertyId, EscrowRecord>,
    balances: BalanceLedger,
    agent: Arc<dyn CredentialVerifier>,
    ownership: Arc<dyn OwnershipRegistry>,
    loans: Arc<dyn LoanApprovalCheck>,
    transfers: Arc<dyn TransferFinalizer>,
}

impl std::fmt::Debug for EscrowLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowLedger")
            .field("escrows", &self.escrows.len())
            .field("balances", &self.balances)
            .finish_non_exhaustive()
    }
}

impl EscrowLedger {
    /// Create an empty ledger with the placeholder ownership and transfer
    /// collaborators.
    pub fn new(agent: Arc<dyn CredentialVerifier>, loans: Arc<dyn LoanApprovalCheck>) -> Self {
        Self {
            escrows: KeyedStore::new(),
            balances: BalanceLedger::new(),
            agent,
            ownership: Arc::new(EvenPropertyOwnership),
            loans,
            transfers: Arc::new(AlwaysFinalize),
        }
    }

    /// Replace the ownership registry.
    pub fn with_ownership_registry(mut self, registry: Arc<dyn OwnershipRegistry>) -> Self {
        self.ownership = registry;
        self
    }

    /// Replace the transfer finalizer.
    pub fn with_transfer_finalizer(mut self, finalizer: Arc<dyn TransferFinalizer>) -> Self {
        self.transfers = finalizer;
        self
    }

    /// The buyer balance ledger.
    pub fn balances(&self) -> &BalanceLedger {
        &self.balances
    }

    /// Check an escrow-agent credential, issuing the grant agent operations
    /// need.
    pub fn authorize(&self, agent_key: Option<&str>) -> Result<AgentGrant, EscrowError> {
        if self.agent.verify(agent_key) {
            Ok(AgentGrant { _private: () })
        } else {
            tracing::warn!("escrow agent authentication failed");
            Err(EscrowError::Unauthorized("escrow agent credential required".into()))
        }
    }

    /// Open (or overwrite an unfunded) escrow for a property.
    pub async fn create_escrow(
        &self,
        _grant: AgentGrant,
        request: NewEscrow,
    ) -> Result<EscrowRecord, EscrowError> {
        let (buyer, seller, property_id, amount) = match (
            Address::supplied(request.buyer),
            Address::supplied(request.seller),
            PropertyId::supplied(request.property_id),
            f64::supplied(request.amount),
        ) {
            (Some(b), Some(s), Some(p), Some(a)) => (b, s, p, a),
            _ => {
                return Err(EscrowError::InvalidRequest(
                    "buyer, seller, property_id and amount are required".into(),
                ))
            }
        };

        let mut slot = self.escrows.lock_or_create(property_id).await;
        if let Some(existing) = (*slot).as_ref() {
            if existing.funds_deposited {
                tracing::debug!(property_id = %property_id, "escrow already funded for property");
                return Err(EscrowError::DuplicateEscrow(property_id));
            }
        }

        let record = EscrowRecord {
            buyer,
            seller,
            property_id,
            amount,
            funds_deposited: false,
            completed: false,
        };
        *slot = Some(record.clone());

        tracing::info!(
            property_id = %property_id,
            buyer = %record.buyer,
            seller = %record.seller,
            amount,
            "escrow created"
        );
        Ok(record)
    }

    /// Fund an escrow. Only the designated buyer may deposit, exactly once,
    /// and only the exact escrow amount.
    pub async fn deposit_funds(
        &self,
        caller: Option<&Address>,
        property_id: Option<PropertyId>,
        amount: Option<f64>,
    ) -> Result<DepositReceipt, EscrowError> {
        let property_id = property_id.ok_or(EscrowError::NotFound)?;
        let mut slot = self
            .escrows
            .lock_existing(&property_id)
            .await
            .ok_or(EscrowError::NotFound)?;
        let escrow = (*slot).as_mut().ok_or(EscrowError::NotFound)?;

        if caller != Some(&escrow.buyer) {
            tracing::warn!(property_id = %property_id, "deposit attempted by non-buyer");
            return Err(EscrowError::Unauthorized(
                "only the buyer can deposit funds".into(),
            ));
        }
        if escrow.funds_deposited {
            return Err(EscrowError::AlreadyDeposited(property_id));
        }
        if amount != Some(escrow.amount) {
            tracing::debug!(
                property_id = %property_id,
                expected = escrow.amount,
                ?amount,
                "deposit amount mismatch"
            );
            return Err(EscrowError::AmountMismatch {
                expected: escrow.amount,
                provided: amount,
            });
        }

        let balance = self.balances.credit(&escrow.buyer, escrow.amount);
        escrow.funds_deposited = true;

        tracing::info!(
            property_id = %property_id,
            buyer = %escrow.buyer,
            amount = escrow.amount,
            balance,
            "escrow funded"
        );
        Ok(DepositReceipt {
            buyer: escrow.buyer.clone(),
            amount: escrow.amount,
            property_id,
        })
    }

    /// Release funded escrow to the seller after ownership, loan approval
    /// and transfer finalization all succeed.
    pub async fn release_funds(
        &self,
        _grant: AgentGrant,
        property_id: Option<PropertyId>,
    ) -> Result<ReleaseReceipt, EscrowError> {
        let property_id = property_id.ok_or(EscrowError::NotFound)?;
        let mut slot = self
            .escrows
            .lock_existing(&property_id)
            .await
            .ok_or(EscrowError::NotFound)?;
        let escrow = (*slot).as_mut().ok_or(EscrowError::NotFound)?;
        Self::check_settleable(escrow)?;

        if !self
            .ownership
            .verify_ownership(&escrow.seller, escrow.property_id)
        {
            tracing::info!(
                property_id = %property_id,
                seller = %escrow.seller,
                "ownership check failed"
            );
            return Err(EscrowError::OwnershipMismatch(property_id));
        }

        let decision = self.loans.check_approval(&escrow.buyer).await;
        match &decision {
            LoanDecision::Approved => {
                tracing::debug!(property_id = %property_id, buyer = %escrow.buyer, "loan approved");
            }
            LoanDecision::Denied => {
                tracing::info!(
                    property_id = %property_id,
                    buyer = %escrow.buyer,
                    "loan not approved"
                );
            }
            LoanDecision::Unavailable(cause) => {
                tracing::warn!(
                    property_id = %property_id,
                    buyer = %escrow.buyer,
                    cause = %cause,
                    "loan status undeterminable, denying release"
                );
            }
        }
        if !decision.is_approved() {
            return Err(EscrowError::LoanNotApproved(escrow.buyer.clone()));
        }

        if !self
            .transfers
            .finalize_transfer(&escrow.buyer, &escrow.seller, escrow.property_id)
        {
            tracing::error!(property_id = %property_id, "property transfer finalization failed");
            return Err(EscrowError::TransferFailed(property_id));
        }

        self.balances.debit(&escrow.buyer, escrow.amount);
        escrow.completed = true;

        tracing::info!(
            property_id = %property_id,
            seller = %escrow.seller,
            amount = escrow.amount,
            "escrow released"
        );
        Ok(ReleaseReceipt {
            seller: escrow.seller.clone(),
            amount: escrow.amount,
            property_id,
        })
    }

    /// Return funded escrow to the buyer. No collaborator checks.
    pub async fn refund_funds(
        &self,
        _grant: AgentGrant,
        property_id: Option<PropertyId>,
    ) -> Result<RefundReceipt, EscrowError> {
        let property_id = property_id.ok_or(EscrowError::NotFound)?;
        let mut slot = self
            .escrows
            .lock_existing(&property_id)
            .await
            .ok_or(EscrowError::NotFound)?;
        let escrow = (*slot).as_mut().ok_or(EscrowError::NotFound)?;
        Self::check_settleable(escrow)?;

        self.balances.debit(&escrow.buyer, escrow.amount);
        escrow.completed = true;

        tracing::info!(
            property_id = %property_id,
            buyer = %escrow.buyer,
            amount = escrow.amount,
            "escrow refunded"
        );
        Ok(RefundReceipt {
            buyer: escrow.buyer.clone(),
            amount: escrow.amount,
            property_id,
        })
    }

    /// Snapshot of a property's escrow. No credential required.
    pub async fn status(&self, property_id: PropertyId) -> Result<EscrowRecord, EscrowError> {
        self.escrows
            .get(&property_id)
            .await
            .ok_or(EscrowError::NotFound)
    }

    /// Number of properties with an escrow on record.
    pub fn len(&self) -> usize {
        self.escrows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.escrows.is_empty()
    }

    /// Guards shared by release and refund.
    fn check_settleable(escrow: &EscrowRecord) -> Result<(), EscrowError> {
        if !escrow.funds_deposited {
            return Err(EscrowError::NotFunded(escrow.property_id));
        }
        if escrow.completed {
            return Err(EscrowError::AlreadyCompleted(escrow.property_id));
        }
        Ok(())
    }
}
