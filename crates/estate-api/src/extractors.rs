//! # Request Extractors
//!
//! JSON body extraction with error mapping, and the optional header values
//! both services read credentials and caller identity from.
//!
//! Header extractors never reject: an absent or non-UTF-8 header is
//! `None`, and the ledger decides what a missing credential means. This
//! keeps authorization ahead of body validation in every handler.

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::http::request::Parts;
use axum::Json;
use estate_core::{supplied_address, Address};

use crate::error::AppError;

/// Loan ledger admin credential header.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";
/// Escrow agent credential header.
pub const AGENT_KEY_HEADER: &str = "x-agent-key";
/// Depositing buyer's address header.
pub const BUYER_ADDRESS_HEADER: &str = "x-buyer-address";

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// Handlers take the body as `Result<Json<T>, JsonRejection>` and call this
/// after authorization so that an unauthenticated request with a bad body
/// is still reported as unauthorized.
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// `X-Admin-Key`, if present.
#[derive(Debug, Clone, Default)]
pub struct AdminKey(pub Option<String>);

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for AdminKey {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(header_value(parts, ADMIN_KEY_HEADER)))
    }
}

/// `X-Agent-Key`, if present.
#[derive(Debug, Clone, Default)]
pub struct AgentKey(pub Option<String>);

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for AgentKey {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(header_value(parts, AGENT_KEY_HEADER)))
    }
}

/// `X-Buyer-Address`, if present and non-empty.
#[derive(Debug, Clone, Default)]
pub struct BuyerAddress(pub Option<Address>);

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for BuyerAddress {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(supplied_address(header_value(
            parts,
            BUYER_ADDRESS_HEADER,
        ))))
    }
}
