use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::Caller;
use crate::engine::PurchaseRequest;
use crate::models::TicketGrant;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceQuery {
    /// Defaults to the caller's own account.
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancePayload {
    pub holder_id: Uuid,
    pub balance: i64,
    pub history: Vec<TicketGrant>,
}

pub async fn purchase_tickets(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let receipt = state
        .engine
        .ledger()
        .purchase(&caller, request, state.clock.now())
        .await?;
    Ok(success(receipt, "Tickets added"))
}

pub async fn ticket_balance(
    State(state): State<AppState>,
    Caller(caller): Caller,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let holder_id = query.student_id.unwrap_or(caller.id);

    let ledger = state.engine.ledger();
    ledger.authorize_holder(&caller, holder_id).await?;
    let payload = BalancePayload {
        holder_id,
        balance: ledger.balance(holder_id).await?,
        history: ledger.history(holder_id).await?,
    };
    Ok(success(payload, "Ticket balance"))
}
