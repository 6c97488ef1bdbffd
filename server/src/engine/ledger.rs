//! Ticket ledger: an append-only list of signed grants per holder. The balance is always
//! the sum of those grants and is never stored.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{EngineError, EngineResult};
use crate::models::{Profile, Role, TicketGrant, TicketReason};
use crate::store::{Store, StoreTx};

/// Body of a ticket purchase. The bare `{quantity}` form credits the buyer's own account.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PurchaseRequest {
    Items { items: Vec<PurchaseItem> },
    Legacy { quantity: i32 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub student_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HolderBalance {
    pub holder_id: Uuid,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub balances: Vec<HolderBalance>,
    /// Sum of the balances above after the purchase.
    pub total: i64,
}

pub struct TicketLedger {
    store: Arc<dyn Store>,
}

impl TicketLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn balance(&self, holder_id: Uuid) -> EngineResult<i64> {
        Ok(self.store.ticket_balance(holder_id).await?)
    }

    pub async fn history(&self, holder_id: Uuid) -> EngineResult<Vec<TicketGrant>> {
        Ok(self.store.ticket_history(holder_id).await?)
    }

    /// Appends one positive grant and returns the new balance.
    pub async fn credit(
        &self,
        holder_id: Uuid,
        quantity: i32,
        reason: TicketReason,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> EngineResult<i64> {
        let mut tx = self.store.begin().await?;
        let balance = credit_in(tx.as_mut(), holder_id, quantity, reason, note, None, now).await?;
        tx.commit().await?;
        Ok(balance)
    }

    /// Appends one negative grant if the balance covers it and returns the new balance.
    pub async fn debit(
        &self,
        holder_id: Uuid,
        quantity: i32,
        reason: TicketReason,
        now: DateTime<Utc>,
    ) -> EngineResult<i64> {
        let mut tx = self.store.begin().await?;
        let balance = debit_in(tx.as_mut(), holder_id, quantity, reason, None, now).await?;
        tx.commit().await?;
        Ok(balance)
    }

    /// Credits every item of a purchase in one transaction. Payment capture has already
    /// happened upstream; this only records the tickets.
    pub async fn purchase(
        &self,
        buyer: &Profile,
        request: PurchaseRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<PurchaseReceipt> {
        if buyer.role == Role::Tutor {
            return Err(EngineError::Forbidden(
                "Tutors cannot purchase tickets".to_string(),
            ));
        }

        let requested: Vec<(Uuid, i32)> = match request {
            PurchaseRequest::Legacy { quantity } => vec![(buyer.id, quantity)],
            PurchaseRequest::Items { items } if items.is_empty() => {
                return Err(EngineError::Validation(
                    "At least one purchase item is required".to_string(),
                ));
            }
            PurchaseRequest::Items { items } => items
                .into_iter()
                .map(|item| (item.student_id, item.quantity))
                .collect(),
        };

        // Merge repeated holders so each gets one grant.
        let mut per_holder: BTreeMap<Uuid, i32> = BTreeMap::new();
        for (holder_id, quantity) in requested {
            if quantity <= 0 {
                return Err(EngineError::Validation(
                    "Ticket quantity must be greater than 0".to_string(),
                ));
            }
            let entry = per_holder.entry(holder_id).or_insert(0);
            *entry = entry.checked_add(quantity).ok_or_else(|| {
                EngineError::Validation("Ticket quantity is too large".to_string())
            })?;
        }

        for holder_id in per_holder.keys() {
            self.authorize_holder(buyer, *holder_id).await?;
        }

        let mut tx = self.store.begin().await?;
        let mut balances = Vec::with_capacity(per_holder.len());
        for (holder_id, quantity) in per_holder {
            let balance = credit_in(
                tx.as_mut(),
                holder_id,
                quantity,
                TicketReason::Purchase,
                None,
                None,
                now,
            )
            .await?;
            balances.push(HolderBalance { holder_id, balance });
        }
        tx.commit().await?;

        let total = balances.iter().map(|b| b.balance).sum();
        info!(buyer = %buyer.id, holders = balances.len(), total, "Tickets purchased");

        Ok(PurchaseReceipt { balances, total })
    }

    /// Whether `actor` may buy for, or read the ledger of, `holder_id`.
    pub async fn authorize_holder(&self, actor: &Profile, holder_id: Uuid) -> EngineResult<()> {
        if holder_id == actor.id || actor.is_admin() {
            return Ok(());
        }
        let holder = self
            .store
            .find_profile(holder_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Student", holder_id))?;
        if holder.role == Role::Student && actor.manages(&holder) {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!(
                "Not allowed to manage tickets of '{holder_id}'"
            )))
        }
    }
}

pub(crate) async fn credit_in(
    tx: &mut dyn StoreTx,
    holder_id: Uuid,
    quantity: i32,
    reason: TicketReason,
    note: Option<String>,
    booking_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> EngineResult<i64> {
    if quantity <= 0 {
        return Err(EngineError::Validation(
            "Ticket quantity must be greater than 0".to_string(),
        ));
    }

    tx.lock_ticket_holder(holder_id).await?;
    let before = tx.ticket_balance(holder_id).await?;
    let grant = TicketGrant::new(holder_id, quantity, reason, note, booking_id, now);
    tx.append_grant(&grant).await?;

    info!(holder = %holder_id, quantity, reason = ?reason, "Tickets credited");
    Ok(before + i64::from(quantity))
}

pub(crate) async fn debit_in(
    tx: &mut dyn StoreTx,
    holder_id: Uuid,
    quantity: i32,
    reason: TicketReason,
    booking_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> EngineResult<i64> {
    if quantity <= 0 {
        return Err(EngineError::Validation(
            "Ticket quantity must be greater than 0".to_string(),
        ));
    }

    tx.lock_ticket_holder(holder_id).await?;
    let before = tx.ticket_balance(holder_id).await?;
    let requested = i64::from(quantity);
    if before < requested {
        warn!(holder = %holder_id, balance = before, requested, "Debit rejected");
        return Err(EngineError::InsufficientBalance {
            holder_id,
            balance: before,
            requested,
        });
    }

    let grant = TicketGrant::new(holder_id, -quantity, reason, None, booking_id, now);
    tx.append_grant(&grant).await?;

    info!(holder = %holder_id, quantity, reason = ?reason, "Tickets debited");
    Ok(before - requested)
}
