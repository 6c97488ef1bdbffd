use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

use super::error::{EngineError, EngineResult};
use crate::models::TimeSlot;

const DEFAULT_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// Time rules shared by every engine component.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    /// Offset in which booking dates and band start times are wall-clock values.
    pub utc_offset: FixedOffset,
    pub cancel_cutoff: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or(Utc.fix()),
            cancel_cutoff: Duration::hours(24),
        }
    }
}

impl Policy {
    pub fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.utc_offset).date_naive()
    }

    /// Fails with a validation error when the instant falls outside chrono's range.
    pub fn lesson_start(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
    ) -> EngineResult<DateTime<Utc>> {
        let local = date.and_time(time_slot.start_time());
        let offset = Duration::seconds(i64::from(self.utc_offset.local_minus_utc()));
        local
            .checked_sub_signed(offset)
            .map(|utc| Utc.from_utc_datetime(&utc))
            .ok_or_else(|| out_of_range(date))
    }

    /// Last instant (exclusive) at which a booking may still be cancelled.
    pub fn cancel_deadline(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
    ) -> EngineResult<DateTime<Utc>> {
        self.lesson_start(date, time_slot)?
            .checked_sub_signed(self.cancel_cutoff)
            .ok_or_else(|| out_of_range(date))
    }

    /// Shifts dated before this day are frozen.
    pub fn earliest_mutable_shift_date(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = self.local_today(now);
        today.pred_opt().unwrap_or(today)
    }
}

fn out_of_range(date: NaiveDate) -> EngineError {
    EngineError::Validation(format!("date '{date}' is out of range"))
}
