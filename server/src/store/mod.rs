//! Persistence boundary for the booking engine.
//!
//! Every cross-entity mutation goes through a [`StoreTx`]: rows are locked as they are
//! read, and nothing becomes visible to other requests until [`StoreTx::commit`]. Dropping
//! a transaction without committing rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Booking, BookingScope, BookingView, LessonReport, Profile, Shift, TicketGrant, TimeSlot,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A uniqueness constraint rejected the write.
    #[error("conflicting write: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Bookings visible to `scope`, newest lesson first, with display names resolved.
    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<BookingView>>;

    /// Shifts of a tutor with `from <= date <= to`, ordered by date then band.
    async fn list_shifts(
        &self,
        tutor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<Shift>>;

    async fn ticket_balance(&self, holder_id: Uuid) -> StoreResult<i64>;

    /// Grants for a holder, newest first.
    async fn ticket_history(&self, holder_id: Uuid) -> StoreResult<Vec<TicketGrant>>;

    async fn find_report(&self, id: Uuid) -> StoreResult<Option<LessonReport>>;

    async fn find_report_for_booking(&self, booking_id: Uuid)
        -> StoreResult<Option<LessonReport>>;
}

#[async_trait]
pub trait StoreTx: Send {
    /// Serializes ledger writers for one holder until the transaction ends.
    async fn lock_ticket_holder(&mut self, holder_id: Uuid) -> StoreResult<()>;

    async fn ticket_balance(&mut self, holder_id: Uuid) -> StoreResult<i64>;

    async fn append_grant(&mut self, grant: &TicketGrant) -> StoreResult<()>;

    async fn lock_shift(
        &mut self,
        tutor_id: Uuid,
        date: NaiveDate,
        time_slot: TimeSlot,
    ) -> StoreResult<Option<Shift>>;

    /// Inserts `template` unless its (tutor, date, band) row exists, then locks and
    /// returns the stored row. An existing row is returned unchanged.
    async fn lock_or_insert_shift(&mut self, template: &Shift) -> StoreResult<Shift>;

    /// Writes the tutor-declared flag only; the booking hold is left as stored.
    async fn update_shift_availability(
        &mut self,
        shift_id: Uuid,
        is_available: bool,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Shift>;

    /// Sets or clears the booking holding the band.
    async fn update_shift_consumption(
        &mut self,
        shift_id: Uuid,
        consumed_by: Option<Uuid>,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Shift>;

    async fn lock_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Fails with [`StoreError::Conflict`] if another confirmed booking holds the band.
    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    async fn lock_report(&mut self, id: Uuid) -> StoreResult<Option<LessonReport>>;

    async fn lock_report_for_booking(
        &mut self,
        booking_id: Uuid,
    ) -> StoreResult<Option<LessonReport>>;

    /// Insert or overwrite by report id.
    async fn save_report(&mut self, report: &LessonReport) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
