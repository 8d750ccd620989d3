//! Loan ledger endpoints.
//!
//! | Method | Path | Credential |
//! |--------|------|------------|
//! | POST | `/apply_loan` | none |
//! | POST | `/approve_loan` | `X-Admin-Key` |
//! | POST | `/reject_loan` | `X-Admin-Key` |
//! | POST | `/repay_loan` | `X-Admin-Key` |
//! | GET  | `/loan_status/:buyer_address` | none |

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use estate_core::{supplied_address, Address, PropertyId};
use estate_state::{AdminGrant, LoanApplication, LoanError, LoanRecord};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::{extract_json, AdminKey};
use crate::routes::EventResponse;
use crate::state::LoanAppState;

/// `POST /apply_loan` body.
#[derive(Debug, Default, Deserialize)]
pub struct ApplyLoanRequest {
    #[serde(default)]
    pub buyer_address: Option<String>,
    #[serde(default)]
    pub property_id: Option<u64>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub term_in_months: Option<u32>,
}

/// Body of the admin transitions.
#[derive(Debug, Default, Deserialize)]
pub struct BorrowerRequest {
    #[serde(default)]
    pub buyer_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoanApplied {
    pub buyer: Address,
    pub property_id: PropertyId,
    pub amount: f64,
    pub monthly_installment: f64,
}

#[derive(Debug, Serialize)]
pub struct LoanTransition {
    pub buyer: Address,
    pub property_id: PropertyId,
}

/// `GET /loan_status` body.
#[derive(Debug, Serialize)]
pub struct LoanStatusResponse {
    pub is_approved: bool,
    pub loan_details: LoanDetails,
}

#[derive(Debug, Serialize)]
pub struct LoanDetails {
    pub amount: f64,
    pub property_id: PropertyId,
    pub term_in_months: u32,
    pub monthly_installment: f64,
    pub is_repaid: bool,
}

impl From<LoanRecord> for LoanDetails {
    fn from(record: LoanRecord) -> Self {
        Self {
            amount: record.principal,
            property_id: record.property_id,
            term_in_months: record.term_in_months,
            monthly_installment: record.monthly_installment,
            is_repaid: record.repaid,
        }
    }
}

pub fn router() -> Router<LoanAppState> {
    Router::new()
        .route("/apply_loan", post(apply_loan))
        .route("/approve_loan", post(approve_loan))
        .route("/reject_loan", post(reject_loan))
        .route("/repay_loan", post(repay_loan))
        .route("/loan_status/:buyer_address", get(loan_status))
}

async fn apply_loan(
    State(state): State<LoanAppState>,
    body: Result<Json<ApplyLoanRequest>, JsonRejection>,
) -> Result<Json<EventResponse<LoanApplied>>, AppError> {
    let req = extract_json(body)?;
    let application = LoanApplication {
        buyer_address: supplied_address(req.buyer_address),
        property_id: req.property_id.map(PropertyId::from),
        amount: req.amount,
        term_in_months: req.term_in_months,
    };
    let (buyer, record) = state.ledger.apply(application).await?;
    Ok(Json(EventResponse::success(
        "LoanApplied",
        LoanApplied {
            buyer,
            property_id: record.property_id,
            amount: record.principal,
            monthly_installment: record.monthly_installment,
        },
    )))
}

/// Authorize, then parse the borrower out of the body.
fn admin_borrower(
    state: &LoanAppState,
    admin_key: Option<&str>,
    body: Result<Json<BorrowerRequest>, JsonRejection>,
) -> Result<(AdminGrant, Address), AppError> {
    let grant = state.ledger.authorize(admin_key)?;
    let borrower = supplied_address(extract_json(body)?.buyer_address).ok_or_else(|| {
        AppError::Loan(LoanError::InvalidRequest("buyer_address is required".into()))
    })?;
    Ok((grant, borrower))
}

async fn approve_loan(
    State(state): State<LoanAppState>,
    AdminKey(admin_key): AdminKey,
    body: Result<Json<BorrowerRequest>, JsonRejection>,
) -> Result<Json<EventResponse<LoanTransition>>, AppError> {
    let (grant, borrower) = admin_borrower(&state, admin_key.as_deref(), body)?;
    let record = state.ledger.approve(grant, Some(&borrower)).await?;
    Ok(transition("LoanApproved", borrower, record))
}

async fn reject_loan(
    State(state): State<LoanAppState>,
    AdminKey(admin_key): AdminKey,
    body: Result<Json<BorrowerRequest>, JsonRejection>,
) -> Result<Json<EventResponse<LoanTransition>>, AppError> {
    let (grant, borrower) = admin_borrower(&state, admin_key.as_deref(), body)?;
    let record = state.ledger.reject(grant, Some(&borrower)).await?;
    Ok(transition("LoanRejected", borrower, record))
}

async fn repay_loan(
    State(state): State<LoanAppState>,
    AdminKey(admin_key): AdminKey,
    body: Result<Json<BorrowerRequest>, JsonRejection>,
) -> Result<Json<EventResponse<LoanTransition>>, AppError> {
    let (grant, borrower) = admin_borrower(&state, admin_key.as_deref(), body)?;
    let record = state.ledger.repay(grant, Some(&borrower)).await?;
    Ok(transition("LoanRepaid", borrower, record))
}

fn transition(
    event: &'static str,
    buyer: Address,
    record: LoanRecord,
) -> Json<EventResponse<LoanTransition>> {
    Json(EventResponse::success(
        event,
        LoanTransition {
            buyer,
            property_id: record.property_id,
        },
    ))
}

async fn loan_status(
    State(state): State<LoanAppState>,
    Path(buyer_address): Path<String>,
) -> Result<Json<LoanStatusResponse>, AppError> {
    let borrower = Address::new(buyer_address)
        .map_err(|e| AppError::NotFound(e.to_string()))?;
    let status = state.ledger.status(&borrower).await?;
    Ok(Json(LoanStatusResponse {
        is_approved: status.is_approved,
        loan_details: status.details.into(),
    }))
}
