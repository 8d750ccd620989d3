//! # estate-core — Foundational Types for the Estate Ledgers
//!
//! Every other crate in the workspace depends on `estate-core`; it depends on
//! nothing internal. It defines:
//!
//! - **Identifiers** — [`Address`] (borrower, buyer, seller) and
//!   [`PropertyId`]. Distinct types so a property id can never be passed
//!   where an address is expected.
//! - **Presence rules** — [`Presence`] decides whether an optional request
//!   field counts as supplied. Zero and empty values count as absent.
//! - **Error kinds** — [`ErrorKind`], the taxonomy every ledger error
//!   reports so the API layer can map it to a status code without knowing
//!   the concrete error type.
//! - **Credentials** — [`CredentialVerifier`] and the constant-time
//!   [`SharedSecret`] implementation.
//! - **Collaborators** — the ownership, loan-approval and transfer traits
//!   the escrow ledger consults on release, plus the fixed stub policies.
//!
//! ## Crate Policy
//!
//! - No I/O. The loan-approval trait is async so that network-backed
//!   implementations (see `estate-loan-client`) fit behind it.
//! - No `.unwrap()` outside tests.

pub mod collaborator;
pub mod credential;
pub mod error;
pub mod identity;
pub mod presence;

pub use collaborator::{
    AlwaysFinalize, EvenPropertyOwnership, LoanApprovalCheck, LoanDecision, OwnershipRegistry,
    TransferFinalizer,
};
pub use credential::{CredentialVerifier, SharedSecret};
pub use error::{ErrorKind, ValidationError};
pub use identity::{Address, PropertyId};
pub use presence::{supplied_address, Presence};
