use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{EngineError, EngineResult};
use super::policy::Policy;
use crate::models::{Shift, TimeSlot};
use crate::store::{Store, StoreTx};

/// Widest range accepted by [`ShiftRegistry::open_shifts`].
const MAX_SHIFT_RANGE_DAYS: i64 = 62;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetShiftRequest {
    pub date: NaiveDate,
    pub time_slot: String,
    pub is_available: bool,
}

pub struct ShiftRegistry {
    store: Arc<dyn Store>,
    policy: Policy,
}

impl ShiftRegistry {
    pub fn new(store: Arc<dyn Store>, policy: Policy) -> Self {
        Self { store, policy }
    }

    /// Declares or withdraws a tutor's availability for one band.
    pub async fn set_availability(
        &self,
        tutor_id: Uuid,
        date: NaiveDate,
        time_slot: TimeSlot,
        is_available: bool,
        now: DateTime<Utc>,
    ) -> EngineResult<Shift> {
        if date < self.policy.earliest_mutable_shift_date(now) {
            return Err(EngineError::PastDateImmutable);
        }

        let mut tx = self.store.begin().await?;
        let template = Shift::new(tutor_id, date, time_slot, is_available, now);
        let current = tx.lock_or_insert_shift(&template).await?;
        if current.is_consumed() && !is_available {
            warn!(tutor_id = %tutor_id, %date, %time_slot, "Refusing to withdraw a booked shift");
            return Err(EngineError::ShiftInUse);
        }
        let stored = tx
            .update_shift_availability(current.id, is_available, now)
            .await?;
        tx.commit().await?;

        info!(tutor_id = %tutor_id, %date, %time_slot, is_available, "Shift availability set");
        Ok(stored)
    }

    pub async fn is_bookable(
        &self,
        tutor_id: Uuid,
        date: NaiveDate,
        time_slot: TimeSlot,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let shifts = self.store.list_shifts(tutor_id, date, date).await?;
        Ok(shifts
            .iter()
            .any(|s| s.time_slot == time_slot && is_bookable(s, &self.policy, now)))
    }

    /// Bookable shifts of a tutor with `from <= date <= to`.
    pub async fn open_shifts(
        &self,
        tutor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<Shift>> {
        if to < from {
            return Err(EngineError::Validation(
                "'from' must not be after 'to'".to_string(),
            ));
        }
        if to.signed_duration_since(from) > Duration::days(MAX_SHIFT_RANGE_DAYS) {
            return Err(EngineError::Validation(format!(
                "Date range must not exceed {MAX_SHIFT_RANGE_DAYS} days"
            )));
        }

        let shifts = self.store.list_shifts(tutor_id, from, to).await?;
        Ok(shifts
            .into_iter()
            .filter(|s| is_bookable(s, &self.policy, now))
            .collect())
    }
}

fn is_bookable(shift: &Shift, policy: &Policy, now: DateTime<Utc>) -> bool {
    shift.is_open()
        && policy
            .lesson_start(shift.date, shift.time_slot)
            .is_ok_and(|start| start > now)
}

/// Locks the shift and checks it can take a booking. The lock is held until the caller's
/// transaction ends.
pub(crate) async fn lock_bookable(
    tx: &mut dyn StoreTx,
    policy: &Policy,
    shift_id: Uuid,
    tutor_id: Uuid,
    date: NaiveDate,
    time_slot: TimeSlot,
    now: DateTime<Utc>,
) -> EngineResult<Shift> {
    let shift = tx
        .lock_shift(tutor_id, date, time_slot)
        .await?
        .ok_or(EngineError::ShiftNotAvailable)?;

    if shift.id != shift_id {
        return Err(EngineError::Validation(
            "shiftId does not match the tutor, date and time slot".to_string(),
        ));
    }
    if !is_bookable(&shift, policy, now) {
        return Err(EngineError::ShiftNotAvailable);
    }
    Ok(shift)
}

pub(crate) async fn mark_consumed(
    tx: &mut dyn StoreTx,
    shift: Shift,
    booking_id: Uuid,
    now: DateTime<Utc>,
) -> EngineResult<Shift> {
    Ok(tx
        .update_shift_consumption(shift.id, Some(booking_id), now)
        .await?)
}

/// Frees the band held by `booking_id`. Availability is left as the tutor declared it.
pub(crate) async fn release(
    tx: &mut dyn StoreTx,
    tutor_id: Uuid,
    date: NaiveDate,
    time_slot: TimeSlot,
    booking_id: Uuid,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    match tx.lock_shift(tutor_id, date, time_slot).await? {
        Some(shift) if shift.consumed_by == Some(booking_id) => {
            tx.update_shift_consumption(shift.id, None, now).await?;
        }
        Some(shift) => {
            warn!(shift_id = %shift.id, booking_id = %booking_id, consumed_by = ?shift.consumed_by,
                "Shift not held by cancelled booking; leaving it untouched");
        }
        None => {
            warn!(tutor_id = %tutor_id, %date, %time_slot, booking_id = %booking_id,
                "No shift row for cancelled booking");
        }
    }
    Ok(())
}
