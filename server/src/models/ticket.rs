use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketReason {
    Purchase,
    BookingDebit,
    CancellationRefund,
}

impl TicketReason {
    pub fn describe(&self) -> &'static str {
        match self {
            TicketReason::Purchase => "ticket purchase",
            TicketReason::BookingDebit => "lesson booking",
            TicketReason::CancellationRefund => "booking cancellation refund",
        }
    }
}

/// One append-only row of the ticket ledger. Negative quantities are debits.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TicketGrant {
    pub id: Uuid,
    pub holder_id: Uuid,
    pub quantity: i32,
    pub reason: TicketReason,
    pub description: Option<String>,
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TicketGrant {
    pub fn new(
        holder_id: Uuid,
        quantity: i32,
        reason: TicketReason,
        description: Option<String>,
        booking_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            holder_id,
            quantity,
            reason,
            description: description.or_else(|| Some(reason.describe().to_string())),
            booking_id,
            created_at,
        }
    }
}
