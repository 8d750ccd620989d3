//! Escrow ledger endpoints.
//!
//! | Method | Path | Credential |
//! |--------|------|------------|
//! | POST | `/create_escrow` | `X-Agent-Key` |
//! | POST | `/deposit_funds` | `X-Buyer-Address` (must match the escrow buyer) |
//! | POST | `/release_funds` | `X-Agent-Key` |
//! | POST | `/refund_funds` | `X-Agent-Key` |
//! | GET  | `/escrow_status/:property_id` | none |

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use estate_core::{supplied_address, Address, PropertyId};
use estate_state::{DepositReceipt, EscrowRecord, NewEscrow, RefundReceipt, ReleaseReceipt};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::{extract_json, AgentKey, BuyerAddress};
use crate::routes::EventResponse;
use crate::state::EscrowAppState;

/// `POST /create_escrow` body.
#[derive(Debug, Default, Deserialize)]
pub struct CreateEscrowRequest {
    #[serde(default)]
    pub buyer: Option<String>,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub property_id: Option<u64>,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// `POST /deposit_funds` body.
#[derive(Debug, Default, Deserialize)]
pub struct DepositRequest {
    #[serde(default)]
    pub property_id: Option<u64>,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Body of release and refund.
#[derive(Debug, Default, Deserialize)]
pub struct PropertyRequest {
    #[serde(default)]
    pub property_id: Option<u64>,
}

/// `POST /create_escrow` response.
#[derive(Debug, Serialize)]
pub struct EscrowCreated {
    pub status: &'static str,
    pub message: &'static str,
    pub escrow: EscrowTerms,
}

#[derive(Debug, Serialize)]
pub struct EscrowTerms {
    pub buyer: Address,
    pub seller: Address,
    pub property_id: PropertyId,
    pub amount: f64,
}

pub fn router() -> Router<EscrowAppState> {
    Router::new()
        .route("/create_escrow", post(create_escrow))
        .route("/deposit_funds", post(deposit_funds))
        .route("/release_funds", post(release_funds))
        .route("/refund_funds", post(refund_funds))
        .route("/escrow_status/:property_id", get(escrow_status))
}

async fn create_escrow(
    State(state): State<EscrowAppState>,
    AgentKey(agent_key): AgentKey,
    body: Result<Json<CreateEscrowRequest>, JsonRejection>,
) -> Result<Json<EscrowCreated>, AppError> {
    let grant = state.ledger.authorize(agent_key.as_deref())?;
    let req = extract_json(body)?;
    let record = state
        .ledger
        .create_escrow(
            grant,
            NewEscrow {
                buyer: supplied_address(req.buyer),
                seller: supplied_address(req.seller),
                property_id: req.property_id.map(PropertyId::from),
                amount: req.amount,
            },
        )
        .await?;
    Ok(Json(EscrowCreated {
        status: "success",
        message: "Escrow created",
        escrow: EscrowTerms {
            buyer: record.buyer,
            seller: record.seller,
            property_id: record.property_id,
            amount: record.amount,
        },
    }))
}

async fn deposit_funds(
    State(state): State<EscrowAppState>,
    BuyerAddress(caller): BuyerAddress,
    body: Result<Json<DepositRequest>, JsonRejection>,
) -> Result<Json<EventResponse<DepositReceipt>>, AppError> {
    let req = extract_json(body)?;
    let receipt = state
        .ledger
        .deposit_funds(
            caller.as_ref(),
            req.property_id.map(PropertyId::from),
            req.amount,
        )
        .await?;
    Ok(Json(EventResponse::success("DepositFunds", receipt)))
}

async fn release_funds(
    State(state): State<EscrowAppState>,
    AgentKey(agent_key): AgentKey,
    body: Result<Json<PropertyRequest>, JsonRejection>,
) -> Result<Json<EventResponse<ReleaseReceipt>>, AppError> {
    let grant = state.ledger.authorize(agent_key.as_deref())?;
    let req = extract_json(body)?;
    let receipt = state
        .ledger
        .release_funds(grant, req.property_id.map(PropertyId::from))
        .await?;
    Ok(Json(EventResponse::success("ReleaseFunds", receipt)))
}

async fn refund_funds(
    State(state): State<EscrowAppState>,
    AgentKey(agent_key): AgentKey,
    body: Result<Json<PropertyRequest>, JsonRejection>,
) -> Result<Json<EventResponse<RefundReceipt>>, AppError> {
    let grant = state.ledger.authorize(agent_key.as_deref())?;
    let req = extract_json(body)?;
    let receipt = state
        .ledger
        .refund_funds(grant, req.property_id.map(PropertyId::from))
        .await?;
    Ok(Json(EventResponse::success("RefundFunds", receipt)))
}

async fn escrow_status(
    State(state): State<EscrowAppState>,
    Path(property_id): Path<String>,
) -> Result<Json<EscrowRecord>, AppError> {
    let property_id: PropertyId = property_id
        .parse()
        .map_err(|e: estate_core::ValidationError| AppError::NotFound(e.to_string()))?;
    Ok(Json(state.ledger.status(property_id).await?))
}
