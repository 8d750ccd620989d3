//! # HTTP Middleware
//!
//! - [`metrics`] — Prometheus request counters and latency histograms, plus
//!   the loan-check outcome counter of the escrow service.

pub mod metrics;
