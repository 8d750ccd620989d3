//! # Route Handlers
//!
//! - [`loan`] — loan ledger endpoints.
//! - [`escrow`] — escrow ledger endpoints.
//!
//! Success bodies follow the event convention both services share:
//! `{"status": "success", "event": "<Name>", ...payload}`.

pub mod escrow;
pub mod loan;

use serde::Serialize;

/// A success response announcing a ledger event.
#[derive(Debug, Serialize)]
pub struct EventResponse<T> {
    pub status: &'static str,
    pub event: &'static str,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> EventResponse<T> {
    pub fn success(event: &'static str, payload: T) -> Self {
        Self {
            status: "success",
            event,
            payload,
        }
    }
}
