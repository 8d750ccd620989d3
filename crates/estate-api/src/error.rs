//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps ledger errors to HTTP status codes through their [`ErrorKind`] and
//! returns JSON bodies carrying the ledger's specific error code. Messages
//! of server-side failures are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use estate_core::ErrorKind;
use estate_state::{EscrowError, LoanError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "DUPLICATE_LOAN", "AMOUNT_MISMATCH").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type for both services.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Path parameter does not name any resource (404).
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Loan(#[from] LoanError),

    #[error(transparent)]
    Escrow(#[from] EscrowError),
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest | ErrorKind::Conflict | ErrorKind::PreconditionFailed => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DownstreamFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Loan(e) => (status_for(e.kind()), e.code()),
            Self::Escrow(e) => (status_for(e.kind()), e.code()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed downstream");
            "An internal error occurred".to_string()
        } else {
            tracing::debug!(error = %self, code, status = status.as_u16(), "request rejected");
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}
