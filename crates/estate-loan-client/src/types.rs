//! Wire types of the loan ledger status endpoint.

use estate_core::PropertyId;
use serde::{Deserialize, Serialize};

/// `GET /loan_status/{buyer_address}` response body.
///
/// Only `is_approved` drives the approval decision. `loan_details` is
/// optional and lenient so that extra or missing detail fields never turn
/// an answer into an unreadable body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanStatusResponse {
    pub is_approved: bool,
    #[serde(default)]
    pub loan_details: Option<LoanDetails>,
}

/// Loan summary as reported by the loan ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDetails {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub property_id: Option<PropertyId>,
    #[serde(default)]
    pub term_in_months: Option<u32>,
    #[serde(default)]
    pub monthly_installment: Option<f64>,
    #[serde(default)]
    pub is_repaid: Option<bool>,
}

/// Error envelope the loan ledger returns on failures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error code the loan ledger uses when it has no loan for a borrower.
pub const LOAN_NOT_FOUND: &str = "LOAN_NOT_FOUND";

impl ErrorEnvelope {
    /// Whether `body` is the loan ledger's own "no loan for this borrower"
    /// answer, as opposed to a 404 from an unknown route or another service.
    pub fn is_loan_not_found(body: &str) -> bool {
        serde_json::from_str::<Self>(body)
            .map(|envelope| envelope.error.code == LOAN_NOT_FOUND)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_status_body() {
        let body = r#"{
            "is_approved": true,
            "loan_details": {
                "amount": 100000.0,
                "property_id": 2,
                "term_in_months": 12,
                "monthly_installment": 8750.0,
                "is_repaid": false
            }
        }"#;
        let parsed: LoanStatusResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.is_approved);
        let details = parsed.loan_details.unwrap();
        assert_eq!(details.property_id, Some(PropertyId::new(2)));
        assert_eq!(details.is_repaid, Some(false));
    }

    #[test]
    fn details_are_optional() {
        let parsed: LoanStatusResponse = serde_json::from_str(r#"{"is_approved": false}"#).unwrap();
        assert!(!parsed.is_approved);
        assert!(parsed.loan_details.is_none());
    }

    #[test]
    fn is_approved_is_required() {
        assert!(serde_json::from_str::<LoanStatusResponse>(r#"{"loan_details": null}"#).is_err());
        assert!(serde_json::from_str::<LoanStatusResponse>(r#"{"is_approved": "yes"}"#).is_err());
    }

    #[test]
    fn recognizes_loan_not_found_envelope() {
        let body = r#"{"error":{"code":"LOAN_NOT_FOUND","message":"no loan for 0xabc"}}"#;
        assert!(ErrorEnvelope::is_loan_not_found(body));
    }

    #[test]
    fn other_not_found_bodies_are_not_loan_not_found() {
        assert!(!ErrorEnvelope::is_loan_not_found(""));
        assert!(!ErrorEnvelope::is_loan_not_found("<html>Not Found</html>"));
        assert!(!ErrorEnvelope::is_loan_not_found(
            r#"{"error":{"code":"NOT_FOUND","message":"no route"}}"#
        ));
        assert!(!ErrorEnvelope::is_loan_not_found(r#"{"error":"Loan not found"}"#));
    }
}
