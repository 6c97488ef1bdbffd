use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, StoreTx};
use crate::models::{
    Booking, BookingScope, BookingView, LessonReport, Profile, Shift, TicketGrant, TimeSlot,
};

const BOOKING_COLUMNS: &str = "b.id, b.user_id, b.student_id, b.tutor_id, b.shift_id, b.date, \
     b.time_slot, b.subject, b.status, b.report_status, b.report_content, b.created_at, \
     b.cancelled_at";

const SHIFT_COLUMNS: &str =
    "id, tutor_id, date, time_slot, is_available, consumed_by, created_at, updated_at";

const REPORT_COLUMNS: &str = "id, booking_id, tutor_id, student_id, unit_content, \
     message_content, goal_content, created_at, updated_at";

const GRANT_COLUMNS: &str = "id, holder_id, quantity, reason, description, booking_id, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

fn unique_violation_as_conflict(err: sqlx::Error, what: String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what),
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, role, display_name, parent_id, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<BookingView>> {
        let (filter, caller) = match scope {
            BookingScope::Student(id) => ("b.student_id = $1 OR b.user_id = $1", Some(id)),
            BookingScope::Parent(id) => ("b.user_id = $1 OR s.parent_id = $1", Some(id)),
            BookingScope::Tutor(id) => ("b.tutor_id = $1", Some(id)),
            BookingScope::All => ("TRUE", None),
        };
        let sql = format!(
            "SELECT {BOOKING_COLUMNS}, t.display_name AS tutor_name, s.display_name AS student_name \
             FROM bookings b \
             LEFT JOIN profiles t ON t.id = b.tutor_id \
             LEFT JOIN profiles s ON s.id = b.student_id \
             WHERE {filter} \
             ORDER BY b.date DESC, b.time_slot ASC"
        );

        let mut query = sqlx::query_as::<_, BookingView>(&sql);
        if let Some(id) = caller {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn list_shifts(
        &self,
        tutor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<Shift>> {
        let shifts = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM tutor_shifts \
             WHERE tutor_id = $1 AND date BETWEEN $2 AND $3 \
             ORDER BY date ASC, time_slot ASC"
        ))
        .bind(tutor_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(shifts)
    }

    async fn ticket_balance(&self, holder_id: Uuid) -> StoreResult<i64> {
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM student_tickets WHERE holder_id = $1",
        )
        .bind(holder_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(balance)
    }

    async fn ticket_history(&self, holder_id: Uuid) -> StoreResult<Vec<TicketGrant>> {
        let grants = sqlx::query_as::<_, TicketGrant>(&format!(
            "SELECT {GRANT_COLUMNS} FROM student_tickets WHERE holder_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(holder_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(grants)
    }

    async fn find_report(&self, id: Uuid) -> StoreResult<Option<LessonReport>> {
        let report = sqlx::query_as::<_, LessonReport>(&format!(
            "SELECT {REPORT_COLUMNS} FROM lesson_reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(report)
    }

    async fn find_report_for_booking(
        &self,
        booking_id: Uuid,
    ) -> StoreResult<Option<LessonReport>> {
        let report = sqlx::query_as::<_, LessonReport>(&format!(
            "SELECT {REPORT_COLUMNS} FROM lesson_reports WHERE booking_id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(report)
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_ticket_holder(&mut self, holder_id: Uuid) -> StoreResult<()> {
        // Grants are append-only, so there is no row to lock; use a transaction-scoped
        // advisory lock keyed on the holder instead.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(holder_id.to_string())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn ticket_balance(&mut self, holder_id: Uuid) -> StoreResult<i64> {
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM student_tickets WHERE holder_id = $1",
        )
        .bind(holder_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(balance)
    }

    async fn append_grant(&mut self, grant: &TicketGrant) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO student_tickets ({GRANT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(grant.id)
        .bind(grant.holder_id)
        .bind(grant.quantity)
        .bind(grant.reason)
        .bind(&grant.description)
        .bind(grant.booking_id)
        .bind(grant.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_shift(
        &mut self,
        tutor_id: Uuid,
        date: NaiveDate,
        time_slot: TimeSlot,
    ) -> StoreResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM tutor_shifts \
             WHERE tutor_id = $1 AND date = $2 AND time_slot = $3 \
             FOR UPDATE"
        ))
        .bind(tutor_id)
        .bind(date)
        .bind(time_slot)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(shift)
    }

    async fn lock_or_insert_shift(&mut self, template: &Shift) -> StoreResult<Shift> {
        // A concurrent insert of the same band makes this a no-op; the row is then
        // read back under lock either way.
        sqlx::query(&format!(
            "INSERT INTO tutor_shifts ({SHIFT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (tutor_id, date, time_slot) DO NOTHING"
        ))
        .bind(template.id)
        .bind(template.tutor_id)
        .bind(template.date)
        .bind(template.time_slot)
        .bind(template.is_available)
        .bind(template.consumed_by)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&mut *self.tx)
        .await?;

        self.lock_shift(template.tutor_id, template.date, template.time_slot)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn update_shift_availability(
        &mut self,
        shift_id: Uuid,
        is_available: bool,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Shift> {
        let shift = sqlx::query_as::<_, Shift>(&format!(
            "UPDATE tutor_shifts SET is_available = $2, updated_at = $3 \
             WHERE id = $1 RETURNING {SHIFT_COLUMNS}"
        ))
        .bind(shift_id)
        .bind(is_available)
        .bind(updated_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(shift)
    }

    async fn update_shift_consumption(
        &mut self,
        shift_id: Uuid,
        consumed_by: Option<Uuid>,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Shift> {
        let shift = sqlx::query_as::<_, Shift>(&format!(
            "UPDATE tutor_shifts SET consumed_by = $2, updated_at = $3 \
             WHERE id = $1 RETURNING {SHIFT_COLUMNS}"
        ))
        .bind(shift_id)
        .bind(consumed_by)
        .bind(updated_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(shift)
    }

    async fn lock_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(booking)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO bookings (id, user_id, student_id, tutor_id, shift_id, date, time_slot, \
                 subject, status, report_status, report_content, created_at, cancelled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.student_id)
        .bind(booking.tutor_id)
        .bind(booking.shift_id)
        .bind(booking.date)
        .bind(booking.time_slot)
        .bind(&booking.subject)
        .bind(booking.status)
        .bind(booking.report_status)
        .bind(&booking.report_content)
        .bind(booking.created_at)
        .bind(booking.cancelled_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            unique_violation_as_conflict(
                e,
                format!(
                    "tutor {} already booked on {} {}",
                    booking.tutor_id, booking.date, booking.time_slot
                ),
            )
        })?;
        Ok(())
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            "UPDATE bookings SET status = $2, report_status = $3, report_content = $4, \
                 cancelled_at = $5 \
             WHERE id = $1",
        )
        .bind(booking.id)
        .bind(booking.status)
        .bind(booking.report_status)
        .bind(&booking.report_content)
        .bind(booking.cancelled_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_report(&mut self, id: Uuid) -> StoreResult<Option<LessonReport>> {
        let report = sqlx::query_as::<_, LessonReport>(&format!(
            "SELECT {REPORT_COLUMNS} FROM lesson_reports WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(report)
    }

    async fn lock_report_for_booking(
        &mut self,
        booking_id: Uuid,
    ) -> StoreResult<Option<LessonReport>> {
        let report = sqlx::query_as::<_, LessonReport>(&format!(
            "SELECT {REPORT_COLUMNS} FROM lesson_reports WHERE booking_id = $1 FOR UPDATE"
        ))
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(report)
    }

    async fn save_report(&mut self, report: &LessonReport) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO lesson_reports ({REPORT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO UPDATE SET \
                 unit_content = EXCLUDED.unit_content, \
                 message_content = EXCLUDED.message_content, \
                 goal_content = EXCLUDED.goal_content, \
                 updated_at = EXCLUDED.updated_at"
        ))
        .bind(report.id)
        .bind(report.booking_id)
        .bind(report.tutor_id)
        .bind(report.student_id)
        .bind(&report.unit_content)
        .bind(&report.message_content)
        .bind(&report.goal_content)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            unique_violation_as_conflict(
                e,
                format!("booking {} already has a report", report.booking_id),
            )
        })?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
