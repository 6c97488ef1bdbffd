#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

use tutoring_server::engine::{BookingEngine, CreateBookingRequest, Policy};
use tutoring_server::models::{Profile, Role, Shift, TicketReason, TimeSlot};
use tutoring_server::store::MemoryStore;

pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Wall-clock equals UTC, so lesson times in tests read literally.
pub fn utc_policy() -> Policy {
    Policy {
        utc_offset: FixedOffset::east_opt(0).unwrap(),
        cancel_cutoff: Duration::hours(24),
    }
}

pub struct Fixture {
    pub store: MemoryStore,
    pub engine: Arc<BookingEngine>,
    pub tutor: Profile,
    pub parent: Profile,
    pub student: Profile,
    pub admin: Profile,
}

pub fn profile(role: Role, name: &str, parent_id: Option<Uuid>) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        role,
        display_name: name.to_string(),
        parent_id,
        created_at: utc("2024-12-01T00:00:00Z"),
    }
}

impl Fixture {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let tutor = profile(Role::Tutor, "Tanaka sensei", None);
        let parent = profile(Role::Parent, "Sato parent", None);
        let student = profile(Role::Student, "Sato Hana", Some(parent.id));
        let admin = profile(Role::Admin, "Operator", None);
        for p in [&tutor, &parent, &student, &admin] {
            store.insert_profile(p.clone()).await;
        }

        let engine = Arc::new(BookingEngine::new(Arc::new(store.clone()), utc_policy()));
        Self {
            store,
            engine,
            tutor,
            parent,
            student,
            admin,
        }
    }

    pub async fn add_profile(&self, role: Role, name: &str, parent_id: Option<Uuid>) -> Profile {
        let p = profile(role, name, parent_id);
        self.store.insert_profile(p.clone()).await;
        p
    }

    pub async fn open_shift(&self, date: NaiveDate, slot: TimeSlot, now: DateTime<Utc>) -> Shift {
        self.engine
            .shifts()
            .set_availability(self.tutor.id, date, slot, true, now)
            .await
            .unwrap()
    }

    pub async fn give_tickets(&self, holder: Uuid, quantity: i32) {
        self.engine
            .ledger()
            .credit(holder, quantity, TicketReason::Purchase, None, utc("2024-12-01T00:00:00Z"))
            .await
            .unwrap();
    }

    pub async fn balance(&self, holder: Uuid) -> i64 {
        self.engine.ledger().balance(holder).await.unwrap()
    }

    pub fn request_for(&self, shift: &Shift) -> CreateBookingRequest {
        CreateBookingRequest {
            student_id: None,
            tutor_id: Some(shift.tutor_id),
            shift_id: Some(shift.id),
            date: Some(shift.date),
            time_slot: Some(shift.time_slot.label().to_string()),
            subject: Some("Mathematics".to_string()),
        }
    }
}
