//! # Settlement Collaborators
//!
//! Releasing escrowed funds consults three external systems, in order:
//!
//! 1. [`OwnershipRegistry`] — does the seller own the property?
//! 2. [`LoanApprovalCheck`] — is the buyer's loan approved?
//! 3. [`TransferFinalizer`] — record the title transfer.
//!
//! The ownership and transfer collaborators have fixed placeholder policies
//! ([`EvenPropertyOwnership`], [`AlwaysFinalize`]). The loan check is
//! network-backed in production (`estate-loan-client`).
//!
//! ## Fail-closed loan checks
//!
//! [`LoanDecision`] keeps "the loan ledger said no" apart from "the loan
//! ledger could not be asked". Both deny the release; only logs and metrics
//! see the difference.

use async_trait::async_trait;

use crate::identity::{Address, PropertyId};

/// Ownership verification for a property.
pub trait OwnershipRegistry: Send + Sync {
    fn verify_ownership(&self, seller: &Address, property_id: PropertyId) -> bool;
}

/// Placeholder registry: a seller owns a property iff its id is even.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvenPropertyOwnership;

impl OwnershipRegistry for EvenPropertyOwnership {
    fn verify_ownership(&self, _seller: &Address, property_id: PropertyId) -> bool {
        property_id.is_even()
    }
}

/// Outcome of asking the loan ledger about a buyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanDecision {
    /// The loan is approved and not yet repaid or voided.
    Approved,
    /// The loan ledger answered, and the answer is no.
    Denied,
    /// The loan ledger could not be consulted: timeout, connection error,
    /// non-success status, or an unreadable body.
    Unavailable(String),
}

impl LoanDecision {
    /// Only an explicit approval permits release.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Label used in logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

/// Loan approval lookup for a buyer.
///
/// Implementations must not return errors: every failure to determine the
/// answer becomes [`LoanDecision::Unavailable`].
#[async_trait]
pub trait LoanApprovalCheck: Send + Sync {
    async fn check_approval(&self, buyer: &Address) -> LoanDecision;
}

/// Title transfer finalization.
pub trait TransferFinalizer: Send + Sync {
    fn finalize_transfer(&self, buyer: &Address, seller: &Address, property_id: PropertyId)
        -> bool;
}

/// Placeholder finalizer that always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFinalize;

impl TransferFinalizer for AlwaysFinalize {
    fn finalize_transfer(
        &self,
        _buyer: &Address,
        _seller: &Address,
        _property_id: PropertyId,
    ) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn even_property_ids_are_owned() {
        let registry = EvenPropertyOwnership;
        assert!(registry.verify_ownership(&addr("0xseller"), PropertyId::new(2)));
        assert!(registry.verify_ownership(&addr("0xseller"), PropertyId::new(100)));
    }

    #[test]
    fn odd_property_ids_are_not_owned() {
        let registry = EvenPropertyOwnership;
        assert!(!registry.verify_ownership(&addr("0xseller"), PropertyId::new(1)));
        assert!(!registry.verify_ownership(&addr("0xseller"), PropertyId::new(12345)));
    }

    #[test]
    fn finalizer_always_succeeds() {
        assert!(AlwaysFinalize.finalize_transfer(
            &addr("0xbuyer"),
            &addr("0xseller"),
            PropertyId::new(7)
        ));
    }

    #[test]
    fn only_approved_decision_permits_release() {
        assert!(LoanDecision::Approved.is_approved());
        assert!(!LoanDecision::Denied.is_approved());
        assert!(!LoanDecision::Unavailable("timeout".into()).is_approved());
    }

    #[test]
    fn decision_outcome_labels() {
        assert_eq!(LoanDecision::Approved.outcome(), "approved");
        assert_eq!(LoanDecision::Denied.outcome(), "denied");
        assert_eq!(LoanDecision::Unavailable(String::new()).outcome(), "unavailable");
    }
}
