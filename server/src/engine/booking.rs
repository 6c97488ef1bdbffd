use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{EngineError, EngineResult};
use super::{can_view, ledger, shifts, BookingEngine};
use crate::models::{
    Booking, BookingScope, BookingStatus, BookingView, Profile, ReportStatus, Role,
    TicketReason, TimeSlot,
};
use crate::store::StoreError;

const MAX_SUBJECT_LEN: usize = 100;

/// Body of a booking request. Fields are optional here so missing ones are reported
/// together instead of as a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub student_id: Option<Uuid>,
    pub tutor_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub time_slot: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone)]
struct ValidBooking {
    student_id: Option<Uuid>,
    tutor_id: Uuid,
    shift_id: Uuid,
    date: NaiveDate,
    time_slot: TimeSlot,
    subject: String,
}

impl CreateBookingRequest {
    fn validate(self) -> EngineResult<ValidBooking> {
        let subject = self.subject.map(|s| s.trim().to_string()).unwrap_or_default();
        let time_slot = self.time_slot.map(|s| s.trim().to_string()).unwrap_or_default();

        let mut missing = Vec::new();
        if self.tutor_id.is_none() {
            missing.push("tutorId");
        }
        if self.shift_id.is_none() {
            missing.push("shiftId");
        }
        if self.date.is_none() {
            missing.push("date");
        }
        if time_slot.is_empty() {
            missing.push("timeSlot");
        }
        if subject.is_empty() {
            missing.push("subject");
        }

        match (self.tutor_id, self.shift_id, self.date) {
            (Some(tutor_id), Some(shift_id), Some(date)) if missing.is_empty() => {
                if subject.chars().count() > MAX_SUBJECT_LEN {
                    return Err(EngineError::Validation(format!(
                        "subject must be at most {MAX_SUBJECT_LEN} characters"
                    )));
                }
                let time_slot = time_slot
                    .parse::<TimeSlot>()
                    .map_err(|e| EngineError::Validation(e.to_string()))?;
                Ok(ValidBooking {
                    student_id: self.student_id,
                    tutor_id,
                    shift_id,
                    date,
                    time_slot,
                    subject,
                })
            }
            _ => Err(EngineError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

impl BookingEngine {
    /// Books a shift for one ticket.
    ///
    /// The shift lock, the balance check, the booking insert, the debit and the shift
    /// consumption share one transaction; any failure leaves no trace.
    pub async fn create_booking(
        &self,
        payer: &Profile,
        request: CreateBookingRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<Booking> {
        let valid = request.validate()?;
        let student_id = self.attending_student(payer, valid.student_id).await?;

        let mut tx = self.store.begin().await?;

        let shift = shifts::lock_bookable(
            tx.as_mut(),
            &self.policy,
            valid.shift_id,
            valid.tutor_id,
            valid.date,
            valid.time_slot,
            now,
        )
        .await
        .inspect_err(|e| {
            warn!(tutor_id = %valid.tutor_id, date = %valid.date, time_slot = %valid.time_slot,
                error = %e, "Shift rejected booking");
        })?;

        let booking = Booking {
            id: Uuid::new_v4(),
            user_id: payer.id,
            student_id,
            tutor_id: valid.tutor_id,
            shift_id: shift.id,
            date: valid.date,
            time_slot: valid.time_slot,
            subject: valid.subject,
            status: BookingStatus::Confirmed,
            report_status: ReportStatus::Pending,
            report_content: None,
            created_at: now,
            cancelled_at: None,
        };
        let holder = booking.ticket_holder();

        tx.lock_ticket_holder(holder).await?;
        let balance = tx.ticket_balance(holder).await?;
        if balance < 1 {
            warn!(holder = %holder, balance, "Booking rejected: no tickets");
            return Err(EngineError::InsufficientBalance {
                holder_id: holder,
                balance,
                requested: 1,
            });
        }

        tx.insert_booking(&booking).await.map_err(|e| match e {
            StoreError::Conflict(_) => EngineError::ShiftNotAvailable,
            other => EngineError::Persistence(other),
        })?;
        ledger::debit_in(
            tx.as_mut(),
            holder,
            1,
            TicketReason::BookingDebit,
            Some(booking.id),
            now,
        )
        .await?;
        shifts::mark_consumed(tx.as_mut(), shift, booking.id, now).await?;
        tx.commit().await?;

        info!(
            booking_id = %booking.id,
            tutor_id = %booking.tutor_id,
            holder = %holder,
            date = %booking.date,
            time_slot = %booking.time_slot,
            "Booking confirmed"
        );
        Ok(booking)
    }

    /// Cancels a confirmed booking, refunding its ticket and freeing its shift.
    ///
    /// Payers and students must cancel before [`Policy::cancel_deadline`]; the booking's
    /// tutor and admins may cancel any booking that is still confirmed.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor: &Profile,
        now: DateTime<Utc>,
    ) -> EngineResult<Booking> {
        let snapshot = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Booking", booking_id))?;
        if !can_view(self.store.as_ref(), actor, &snapshot).await? {
            return Err(EngineError::Forbidden(
                "Not allowed to cancel this booking".to_string(),
            ));
        }
        let privileged = actor.is_admin() || actor.id == snapshot.tutor_id;

        let mut tx = self.store.begin().await?;
        let mut booking = tx
            .lock_booking(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Booking", booking_id))?;

        let today = self.policy.local_today(now);
        let status = booking.effective_status(today);
        if status != BookingStatus::Confirmed {
            return Err(EngineError::AlreadyTerminal(status));
        }

        let deadline = self.policy.cancel_deadline(booking.date, booking.time_slot)?;
        if now >= deadline && !privileged {
            warn!(booking_id = %booking_id, %deadline, "Cancellation after deadline rejected");
            return Err(EngineError::PastCancelDeadline { deadline });
        }

        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(now);
        tx.update_booking(&booking).await?;
        shifts::release(
            tx.as_mut(),
            booking.tutor_id,
            booking.date,
            booking.time_slot,
            booking.id,
            now,
        )
        .await?;
        ledger::credit_in(
            tx.as_mut(),
            booking.ticket_holder(),
            1,
            TicketReason::CancellationRefund,
            None,
            Some(booking.id),
            now,
        )
        .await?;
        tx.commit().await?;

        info!(
            booking_id = %booking.id,
            actor = %actor.id,
            bypassed_deadline = now >= deadline,
            "Booking cancelled"
        );
        Ok(booking)
    }

    pub async fn booking(
        &self,
        booking_id: Uuid,
        actor: &Profile,
        now: DateTime<Utc>,
    ) -> EngineResult<Booking> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Booking", booking_id))?;
        if !can_view(self.store.as_ref(), actor, &booking).await? {
            return Err(EngineError::Forbidden(
                "Not allowed to view this booking".to_string(),
            ));
        }
        Ok(booking.with_effective_status(self.policy.local_today(now)))
    }

    pub async fn list_bookings(
        &self,
        actor: &Profile,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<BookingView>> {
        let today = self.policy.local_today(now);
        let views = self
            .store
            .list_bookings(BookingScope::for_caller(actor.role, actor.id))
            .await?;
        Ok(views
            .into_iter()
            .map(|mut view| {
                view.booking = view.booking.with_effective_status(today);
                view
            })
            .collect())
    }

    /// Works out who attends: students book for themselves, parents for their own students.
    async fn attending_student(
        &self,
        payer: &Profile,
        requested: Option<Uuid>,
    ) -> EngineResult<Option<Uuid>> {
        match (payer.role, requested) {
            (Role::Tutor, _) => Err(EngineError::Forbidden(
                "Tutors cannot book lessons".to_string(),
            )),
            (Role::Student, None) => Ok(Some(payer.id)),
            (_, None) => Ok(None),
            (_, Some(id)) if id == payer.id => Ok(Some(id)),
            (_, Some(id)) => {
                let student = self.profile(id).await?;
                if student.role != Role::Student {
                    return Err(EngineError::Validation(format!(
                        "'{id}' is not a student profile"
                    )));
                }
                if !payer.manages(&student) {
                    return Err(EngineError::Forbidden(
                        "Not allowed to book for this student".to_string(),
                    ));
                }
                Ok(Some(id))
            }
        }
    }
}
