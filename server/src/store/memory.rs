//! In-process store. A transaction holds the whole state lock and works on a copy, so
//! transactions are fully serialized and an uncommitted copy is simply discarded.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, StoreTx};
use crate::models::{
    Booking, BookingScope, BookingStatus, BookingView, LessonReport, Profile, Shift, TicketGrant,
    TimeSlot,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    profiles: HashMap<Uuid, Profile>,
    grants: Vec<TicketGrant>,
    shifts: HashMap<Uuid, Shift>,
    bookings: HashMap<Uuid, Booking>,
    reports: HashMap<Uuid, LessonReport>,
}

impl MemoryState {
    fn balance(&self, holder_id: Uuid) -> i64 {
        self.grants
            .iter()
            .filter(|g| g.holder_id == holder_id)
            .map(|g| i64::from(g.quantity))
            .sum()
    }

    fn shift_by_key(&self, tutor_id: Uuid, date: NaiveDate, time_slot: TimeSlot) -> Option<&Shift> {
        self.shifts
            .values()
            .find(|s| s.tutor_id == tutor_id && s.date == date && s.time_slot == time_slot)
    }

    fn shift_mut(&mut self, shift_id: Uuid) -> StoreResult<&mut Shift> {
        self.shifts
            .get_mut(&shift_id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    fn report_for_booking(&self, booking_id: Uuid) -> Option<&LessonReport> {
        self.reports.values().find(|r| r.booking_id == booking_id)
    }

    fn display_name(&self, id: Option<Uuid>) -> Option<String> {
        id.and_then(|id| self.profiles.get(&id))
            .map(|p| p.display_name.clone())
    }

    fn in_scope(&self, booking: &Booking, scope: BookingScope) -> bool {
        match scope {
            BookingScope::Student(id) => booking.student_id == Some(id) || booking.user_id == id,
            BookingScope::Parent(id) => {
                booking.user_id == id
                    || booking
                        .student_id
                        .and_then(|s| self.profiles.get(&s))
                        .is_some_and(|s| s.parent_id == Some(id))
            }
            BookingScope::Tutor(id) => booking.tutor_id == id,
            BookingScope::All => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profiles belong to the identity service; this is how they get into a local store.
    pub async fn insert_profile(&self, profile: Profile) {
        self.state.lock().await.profiles.insert(profile.id, profile);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.state.lock().await.profiles.get(&id).cloned())
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<BookingView>> {
        let state = self.state.lock().await;
        let mut views: Vec<BookingView> = state
            .bookings
            .values()
            .filter(|b| state.in_scope(b, scope))
            .map(|b| BookingView {
                booking: b.clone(),
                tutor_name: state.display_name(Some(b.tutor_id)),
                student_name: state.display_name(b.student_id),
            })
            .collect();
        views.sort_by(|a, b| {
            b.booking
                .date
                .cmp(&a.booking.date)
                .then(a.booking.time_slot.cmp(&b.booking.time_slot))
        });
        Ok(views)
    }

    async fn list_shifts(
        &self,
        tutor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<Shift>> {
        let state = self.state.lock().await;
        let mut shifts: Vec<Shift> = state
            .shifts
            .values()
            .filter(|s| s.tutor_id == tutor_id && s.date >= from && s.date <= to)
            .cloned()
            .collect();
        shifts.sort_by_key(|s| (s.date, s.time_slot));
        Ok(shifts)
    }

    async fn ticket_balance(&self, holder_id: Uuid) -> StoreResult<i64> {
        Ok(self.state.lock().await.balance(holder_id))
    }

    async fn ticket_history(&self, holder_id: Uuid) -> StoreResult<Vec<TicketGrant>> {
        let state = self.state.lock().await;
        Ok(state
            .grants
            .iter()
            .rev()
            .filter(|g| g.holder_id == holder_id)
            .cloned()
            .collect())
    }

    async fn find_report(&self, id: Uuid) -> StoreResult<Option<LessonReport>> {
        Ok(self.state.lock().await.reports.get(&id).cloned())
    }

    async fn find_report_for_booking(
        &self,
        booking_id: Uuid,
    ) -> StoreResult<Option<LessonReport>> {
        Ok(self
            .state
            .lock()
            .await
            .report_for_booking(booking_id)
            .cloned())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_ticket_holder(&mut self, _holder_id: Uuid) -> StoreResult<()> {
        // The transaction already owns the whole state.
        Ok(())
    }

    async fn ticket_balance(&mut self, holder_id: Uuid) -> StoreResult<i64> {
        Ok(self.working.balance(holder_id))
    }

    async fn append_grant(&mut self, grant: &TicketGrant) -> StoreResult<()> {
        self.working.grants.push(grant.clone());
        Ok(())
    }

    async fn lock_shift(
        &mut self,
        tutor_id: Uuid,
        date: NaiveDate,
        time_slot: TimeSlot,
    ) -> StoreResult<Option<Shift>> {
        Ok(self.working.shift_by_key(tutor_id, date, time_slot).cloned())
    }

    async fn lock_or_insert_shift(&mut self, template: &Shift) -> StoreResult<Shift> {
        if let Some(existing) =
            self.working
                .shift_by_key(template.tutor_id, template.date, template.time_slot)
        {
            return Ok(existing.clone());
        }
        self.working.shifts.insert(template.id, template.clone());
        Ok(template.clone())
    }

    async fn update_shift_availability(
        &mut self,
        shift_id: Uuid,
        is_available: bool,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Shift> {
        let shift = self.working.shift_mut(shift_id)?;
        shift.is_available = is_available;
        shift.updated_at = updated_at;
        Ok(shift.clone())
    }

    async fn update_shift_consumption(
        &mut self,
        shift_id: Uuid,
        consumed_by: Option<Uuid>,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Shift> {
        let shift = self.working.shift_mut(shift_id)?;
        shift.consumed_by = consumed_by;
        shift.updated_at = updated_at;
        Ok(shift.clone())
    }

    async fn lock_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.working.bookings.get(&id).cloned())
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        let taken = self.working.bookings.values().any(|b| {
            b.status == BookingStatus::Confirmed
                && b.tutor_id == booking.tutor_id
                && b.date == booking.date
                && b.time_slot == booking.time_slot
        });
        if taken {
            return Err(StoreError::Conflict(format!(
                "tutor {} already booked on {} {}",
                booking.tutor_id, booking.date, booking.time_slot
            )));
        }
        self.working.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        self.working.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn lock_report(&mut self, id: Uuid) -> StoreResult<Option<LessonReport>> {
        Ok(self.working.reports.get(&id).cloned())
    }

    async fn lock_report_for_booking(
        &mut self,
        booking_id: Uuid,
    ) -> StoreResult<Option<LessonReport>> {
        Ok(self.working.report_for_booking(booking_id).cloned())
    }

    async fn save_report(&mut self, report: &LessonReport) -> StoreResult<()> {
        if let Some(other) = self.working.report_for_booking(report.booking_id) {
            if other.id != report.id {
                return Err(StoreError::Conflict(format!(
                    "booking {} already has report {}",
                    report.booking_id, other.id
                )));
            }
        }
        self.working.reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
