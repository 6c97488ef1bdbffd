//! Post-lesson report lifecycle: `pending` until the tutor files a report, `completed`
//! afterwards. Edits never move the status back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::error::{EngineError, EngineResult};
use super::policy::Policy;
use super::can_view;
use crate::models::{
    Booking, BookingStatus, LessonReport, Profile, ReportSections, ReportStatus,
};
use crate::store::{Store, StoreError, StoreTx};

/// Body for filing (all fields) or editing (only the supplied fields) a report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub unit: Option<String>,
    pub message: Option<String>,
    pub goal: Option<String>,
}

impl ReportRequest {
    fn merged_onto(self, base: ReportSections) -> ReportSections {
        ReportSections {
            unit: self.unit.unwrap_or(base.unit),
            message: self.message.unwrap_or(base.message),
            goal: self.goal.unwrap_or(base.goal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    /// Read from the report row.
    Structured,
    /// Reconstructed from the composite text on the booking.
    Composite,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub booking_id: Uuid,
    pub report_id: Option<Uuid>,
    pub report_status: ReportStatus,
    pub source: ReportSource,
    #[serde(flatten)]
    pub sections: ReportSections,
}

pub struct ReportLifecycle {
    store: Arc<dyn Store>,
    policy: Policy,
}

impl ReportLifecycle {
    pub fn new(store: Arc<dyn Store>, policy: Policy) -> Self {
        Self { store, policy }
    }

    /// Files the report for a finished lesson. Filing again overwrites the earlier text.
    pub async fn file(
        &self,
        booking_id: Uuid,
        tutor: &Profile,
        request: ReportRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<LessonReport> {
        let sections = request.merged_onto(ReportSections::default());
        check_sections(&sections)?;

        let mut tx = self.store.begin().await?;
        let mut booking = self.lock_reportable(tx.as_mut(), booking_id, tutor, now).await?;

        let report = match tx.lock_report_for_booking(booking_id).await? {
            Some(mut existing) => {
                existing.apply(&sections, now);
                existing
            }
            None => LessonReport {
                id: Uuid::new_v4(),
                booking_id,
                tutor_id: booking.tutor_id,
                student_id: booking.student_id,
                unit_content: sections.unit.clone(),
                message_content: sections.message.clone(),
                goal_content: sections.goal.clone(),
                created_at: now,
                updated_at: now,
            },
        };
        save_report(tx.as_mut(), &report).await?;

        booking.report_status = ReportStatus::Completed;
        booking.report_content = Some(sections.to_composite());
        tx.update_booking(&booking).await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, report_id = %report.id, tutor_id = %tutor.id, "Lesson report filed");
        Ok(report)
    }

    /// Overwrites only the supplied sections.
    pub async fn edit(
        &self,
        report_id: Uuid,
        tutor: &Profile,
        request: ReportRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<LessonReport> {
        // Booking first, then report, the same lock order as `file`.
        let booking_id = self
            .store
            .find_report(report_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Report", report_id))?
            .booking_id;

        let mut tx = self.store.begin().await?;
        let mut booking = self.lock_reportable(tx.as_mut(), booking_id, tutor, now).await?;
        let mut report = tx
            .lock_report(report_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Report", report_id))?;

        let sections = request.merged_onto(report.sections());
        check_sections(&sections)?;
        report.apply(&sections, now);
        save_report(tx.as_mut(), &report).await?;

        booking.report_content = Some(sections.to_composite());
        tx.update_booking(&booking).await?;
        tx.commit().await?;

        info!(report_id = %report_id, booking_id = %booking_id, "Lesson report edited");
        Ok(report)
    }

    /// Returns the report sections, preferring the report row over the composite text.
    pub async fn view(&self, booking_id: Uuid, actor: &Profile) -> EngineResult<ReportView> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Booking", booking_id))?;
        if !can_view(self.store.as_ref(), actor, &booking).await? {
            return Err(EngineError::Forbidden(
                "Not allowed to view this report".to_string(),
            ));
        }

        if let Some(report) = self.store.find_report_for_booking(booking_id).await? {
            return Ok(ReportView {
                booking_id,
                report_id: Some(report.id),
                report_status: booking.report_status,
                source: ReportSource::Structured,
                sections: report.sections(),
            });
        }

        match booking.report_content.as_deref() {
            Some(text) if !text.trim().is_empty() => Ok(ReportView {
                booking_id,
                report_id: None,
                report_status: booking.report_status,
                source: ReportSource::Composite,
                sections: ReportSections::from_composite(text),
            }),
            _ => Err(EngineError::NotFound(format!(
                "No report has been filed for booking '{booking_id}'"
            ))),
        }
    }

    async fn lock_reportable(
        &self,
        tx: &mut dyn StoreTx,
        booking_id: Uuid,
        tutor: &Profile,
        now: DateTime<Utc>,
    ) -> EngineResult<Booking> {
        let booking = tx
            .lock_booking(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Booking", booking_id))?;

        if booking.tutor_id != tutor.id && !tutor.is_admin() {
            return Err(EngineError::Forbidden(
                "Only the booking's tutor can write its report".to_string(),
            ));
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(EngineError::AlreadyTerminal(BookingStatus::Cancelled));
        }
        if booking.date >= self.policy.local_today(now) {
            return Err(EngineError::LessonNotFinished);
        }
        Ok(booking)
    }
}

fn check_sections(sections: &ReportSections) -> EngineResult<()> {
    if sections.is_empty() {
        return Err(EngineError::Validation(
            "At least one of unit, message or goal must be filled in".to_string(),
        ));
    }
    if let Some(field) = sections.reserved_marker_in() {
        return Err(EngineError::Validation(format!(
            "'{field}' contains a reserved section marker line"
        )));
    }
    Ok(())
}

async fn save_report(tx: &mut dyn StoreTx, report: &LessonReport) -> EngineResult<()> {
    tx.save_report(report).await.map_err(|e| match e {
        StoreError::Conflict(msg) => EngineError::Validation(msg),
        other => EngineError::Persistence(other),
    })
}
