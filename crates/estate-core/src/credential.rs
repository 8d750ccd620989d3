//! # Credential Verification
//!
//! Ledger operations that require an authorized actor (the loan admin, the
//! escrow agent) receive the credential the caller presented and ask an
//! injected [`CredentialVerifier`] whether it is acceptable. The ledgers
//! never compare secrets themselves.
//!
//! [`SharedSecret`] is the single-secret implementation: one configured
//! string, compared in constant time. Other policies (multiple admins,
//! rotation) plug in behind the same trait.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Decides whether a presented credential authorizes the caller.
pub trait CredentialVerifier: Send + Sync {
    /// `presented` is `None` when the caller supplied no credential at all.
    fn verify(&self, presented: Option<&str>) -> bool;
}

impl<V: CredentialVerifier + ?Sized> CredentialVerifier for Arc<V> {
    fn verify(&self, presented: Option<&str>) -> bool {
        (**self).verify(presented)
    }
}

/// A single configured secret, zeroized on drop.
///
/// Custom `Debug` redacts the value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct SharedSecret {
    secret: Zeroizing<String>,
}

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
        }
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl CredentialVerifier for SharedSecret {
    fn verify(&self, presented: Option<&str>) -> bool {
        match presented {
            Some(p) if !p.is_empty() => constant_time_eq(p, &self.secret),
            _ => false,
        }
    }
}

/// Constant-time string comparison.
///
/// When lengths differ, performs a dummy comparison to avoid leaking length
/// information through timing variance.
fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}
