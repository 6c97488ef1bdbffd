//! Booking & ticket ledger engine.
//!
//! [`BookingEngine`] is the only code path that changes ticket balances and shift
//! consumption together. Each operation takes the current instant as an argument so the
//! time rules in [`Policy`] stay deterministic.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::{Booking, Profile, Role};
use crate::store::Store;

pub mod booking;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod report;
pub mod shifts;

pub use booking::CreateBookingRequest;
pub use error::{EngineError, EngineResult};
pub use ledger::{HolderBalance, PurchaseItem, PurchaseReceipt, PurchaseRequest, TicketLedger};
pub use policy::Policy;
pub use report::{ReportLifecycle, ReportRequest, ReportSource, ReportView};
pub use shifts::{SetShiftRequest, ShiftRegistry};

pub struct BookingEngine {
    store: Arc<dyn Store>,
    policy: Policy,
    ledger: TicketLedger,
    shifts: ShiftRegistry,
    reports: ReportLifecycle,
}

impl BookingEngine {
    pub fn new(store: Arc<dyn Store>, policy: Policy) -> Self {
        Self {
            ledger: TicketLedger::new(store.clone()),
            shifts: ShiftRegistry::new(store.clone(), policy),
            reports: ReportLifecycle::new(store.clone(), policy),
            store,
            policy,
        }
    }

    pub fn ledger(&self) -> &TicketLedger {
        &self.ledger
    }

    pub fn shifts(&self) -> &ShiftRegistry {
        &self.shifts
    }

    pub fn reports(&self) -> &ReportLifecycle {
        &self.reports
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub async fn profile(&self, id: Uuid) -> EngineResult<Profile> {
        self.store
            .find_profile(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Profile", id))
    }
}

/// Participants, admins, and the parent of the attending student may see a booking.
pub(crate) async fn can_view(
    store: &dyn Store,
    actor: &Profile,
    booking: &Booking,
) -> EngineResult<bool> {
    if actor.is_admin() || booking.involves(actor.id) {
        return Ok(true);
    }
    if actor.role != Role::Parent {
        return Ok(false);
    }
    match booking.student_id {
        Some(student_id) => Ok(store
            .find_profile(student_id)
            .await?
            .is_some_and(|student| student.parent_id == Some(actor.id))),
        None => Ok(false),
    }
}
