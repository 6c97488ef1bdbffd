use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::shift::TimeSlot;
use super::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    /// Never written by the engine; a confirmed booking reads as completed once its date has passed.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub student_id: Option<Uuid>,
    pub tutor_id: Uuid,
    pub shift_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub subject: String,
    pub status: BookingStatus,
    pub report_status: ReportStatus,
    pub report_content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Ledger identity debited for this booking and refunded on cancellation.
    pub fn ticket_holder(&self) -> Uuid {
        self.student_id.unwrap_or(self.user_id)
    }

    pub fn effective_status(&self, today: NaiveDate) -> BookingStatus {
        match self.status {
            BookingStatus::Confirmed if self.date < today => BookingStatus::Completed,
            other => other,
        }
    }

    pub fn with_effective_status(mut self, today: NaiveDate) -> Self {
        self.status = self.effective_status(today);
        self
    }

    /// Parties allowed to see or cancel the booking.
    pub fn involves(&self, actor: Uuid) -> bool {
        self.user_id == actor || self.student_id == Some(actor) || self.tutor_id == actor
    }
}

/// A booking row with the display names a dashboard needs.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub booking: Booking,
    pub tutor_name: Option<String>,
    pub student_name: Option<String>,
}

/// Which bookings a caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    /// Bookings the student attends or paid for.
    Student(Uuid),
    /// Bookings paid by the parent or attended by any of their students.
    Parent(Uuid),
    /// Bookings on the tutor's own shifts.
    Tutor(Uuid),
    All,
}

impl BookingScope {
    pub fn for_caller(role: Role, id: Uuid) -> Self {
        match role {
            Role::Student => BookingScope::Student(id),
            Role::Parent => BookingScope::Parent(id),
            Role::Tutor => BookingScope::Tutor(id),
            Role::Admin => BookingScope::All,
        }
    }
}
