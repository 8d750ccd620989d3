//! # estate-state — Ledger State Machines
//!
//! The authoritative in-memory state of both services:
//!
//! - [`LoanLedger`] — loan applications keyed by borrower address, with
//!   admin-gated approve / reject / repay transitions.
//! - [`EscrowLedger`] — property escrows keyed by property id, with
//!   agent-gated release and refund and buyer-only deposits.
//! - [`BalanceLedger`] — buyer balances adjusted by escrow side effects.
//!
//! Both ledgers are cheaply cloneable handles over shared state. Every
//! operation on one key runs under that key's lock ([`KeyedStore`]), so
//! guard checks and the mutation they protect are atomic with respect to
//! other requests on the same key. Operations on different keys proceed
//! in parallel.
//!
//! Nothing here performs I/O except through the injected
//! [`estate_core::LoanApprovalCheck`].

pub mod balance;
pub mod escrow;
pub mod loan;
pub mod store;

pub use balance::BalanceLedger;
pub use escrow::{
    AgentGrant, DepositReceipt, EscrowError, EscrowLedger, EscrowRecord, NewEscrow,
    RefundReceipt, ReleaseReceipt,
};
pub use loan::{
    monthly_installment, AdminGrant, LoanApplication, LoanError, LoanLedger, LoanRecord,
    LoanStatus, INTEREST_RATE_PERCENT,
};
pub use store::{KeyedStore, SlotGuard};
