//! # Error Taxonomy
//!
//! Ledger errors are concrete `thiserror` enums owned by `estate-state`.
//! Each reports one [`ErrorKind`] so transport layers can classify it
//! without matching on every variant.

use thiserror::Error;

/// Classification shared by every ledger error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field is missing, falsy, or otherwise unusable.
    InvalidRequest,
    /// The presented credential does not match.
    Unauthorized,
    /// No record exists for the key.
    NotFound,
    /// The record is already in the state the operation would produce,
    /// or a duplicate would be created.
    Conflict,
    /// The record is not yet in a state that permits the operation.
    PreconditionFailed,
    /// A downstream collaborator failed after all guards passed.
    DownstreamFailure,
}

impl ErrorKind {
    /// Canonical snake_case name, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::PreconditionFailed => "precondition_failed",
            Self::DownstreamFailure => "downstream_failure",
        }
    }

    /// Whether the fault lies with the server rather than the caller.
    pub fn is_server_fault(&self) -> bool {
        matches!(self, Self::DownstreamFailure)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for identifier newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Addresses must not be the empty string.
    #[error("address must not be empty")]
    EmptyAddress,

    /// Property identifiers are positive integers.
    #[error("invalid property id: \"{0}\" (expected a positive integer)")]
    InvalidPropertyId(String),
}
