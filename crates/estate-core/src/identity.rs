//! # Identifier Newtypes
//!
//! [`Address`] keys the loan ledger and the balance ledger; [`PropertyId`]
//! keys the escrow ledger. Addresses are opaque strings. The ledgers only
//! compare them for equality, so no checksum or hex format is enforced.

use std::str::FromStr;

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Number of random bytes in a generated address (40 hex characters).
const GENERATED_ADDRESS_BYTES: usize = 20;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// An account address: borrower, buyer, or seller.
///
/// Serializes as a plain JSON string. Construction rejects the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Construct an address, rejecting the empty string.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }
        Ok(Self(raw))
    }

    /// Generate a fresh `0x`-prefixed address from 20 bytes of OS randomness.
    pub fn generate() -> Self {
        let mut bytes = [0u8; GENERATED_ADDRESS_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let mut out = String::with_capacity(2 + GENERATED_ADDRESS_BYTES * 2);
        out.push_str("0x");
        for b in bytes {
            out.push_str(&format!("{b:02x}"));
        }
        Self(out)
    }

    /// Borrow the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// PropertyId
// ---------------------------------------------------------------------------

/// Identifier of a real-estate property.
///
/// Zero is representable so that request payloads carrying `0` deserialize;
/// the presence rules then treat it as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(u64);

impl PropertyId {
    /// Wrap a raw property number.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw property number.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Whether the property number is even.
    pub fn is_even(&self) -> bool {
        self.0 % 2 == 0
    }
}

impl From<u64> for PropertyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PropertyId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ValidationError::InvalidPropertyId(s.to_string()))
    }
}
