//! # estate CLI library
//!
//! Subcommand implementations for the `estate` binary, kept in a library
//! so argument handling and configuration merging are unit-testable.
//!
//! - [`serve`] — `estate loan-ledger` and `estate escrow-ledger`.
//! - [`logging`] — tracing subscriber setup.

pub mod logging;
pub mod serve;
