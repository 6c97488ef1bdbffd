mod common;

use common::{day, utc, Fixture};
use tutoring_server::engine::{
    EngineError, PurchaseItem, PurchaseRequest, ReportRequest, ReportSource,
};
use tutoring_server::models::{Booking, BookingStatus, ReportStatus, Role, TimeSlot};
use tutoring_server::store::{Store, StoreTx};

#[tokio::test]
async fn booking_with_one_ticket_consumes_ticket_and_shift() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, now).await;
    fx.give_tickets(fx.student.id, 1).await;

    let booking = fx
        .engine
        .create_booking(&fx.student, fx.request_for(&shift), now)
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.student_id, Some(fx.student.id));
    assert_eq!(fx.balance(fx.student.id).await, 0);
    assert!(!fx
        .engine
        .shifts()
        .is_bookable(fx.tutor.id, shift.date, shift.time_slot, now)
        .await
        .unwrap());
}

#[tokio::test]
async fn booking_without_tickets_is_rejected_and_leaves_shift_open() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, now).await;

    let err = fx
        .engine
        .create_booking(&fx.student, fx.request_for(&shift), now)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InsufficientBalance { balance: 0, .. }));
    assert!(fx.engine.list_bookings(&fx.student, now).await.unwrap().is_empty());
    assert!(fx
        .engine
        .shifts()
        .is_bookable(fx.tutor.id, shift.date, shift.time_slot, now)
        .await
        .unwrap());
    assert_eq!(fx.balance(fx.student.id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_for_one_shift_confirm_exactly_once() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, now).await;
    let other = fx.add_profile(Role::Student, "Suzuki Ken", None).await;
    fx.give_tickets(fx.student.id, 1).await;
    fx.give_tickets(other.id, 1).await;

    let mut handles = Vec::new();
    for payer in [fx.student.clone(), other.clone()] {
        let engine = fx.engine.clone();
        let request = fx.request_for(&shift);
        handles.push(tokio::spawn(async move {
            engine.create_booking(&payer, request, now).await
        }));
    }

    let mut confirmed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(EngineError::ShiftNotAvailable) => rejected += 1,
            Err(err) => panic!("unexpected error: {err:?}"),
        }
    }
    assert_eq!((confirmed, rejected), (1, 1));
    // Exactly one ticket was spent between the two students.
    assert_eq!(fx.balance(fx.student.id).await + fx.balance(other.id).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_bookings_never_double_book() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::Evening, now).await;
    fx.give_tickets(fx.parent.id, 20).await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = fx.engine.clone();
            let payer = fx.parent.clone();
            let request = fx.request_for(&shift);
            tokio::spawn(async move { engine.create_booking(&payer, request, now).await })
        })
        .collect();

    let mut confirmed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            confirmed += 1;
        }
    }
    assert_eq!(confirmed, 1);
    assert_eq!(fx.balance(fx.parent.id).await, 19);
}

#[tokio::test]
async fn cancellation_follows_the_lesson_clock_cutoff() {
    let fx = Fixture::new().await;
    let booked_at = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, booked_at).await;
    fx.give_tickets(fx.student.id, 2).await;

    // 16:00 lesson on the 10th: 15:59 on the 9th is still in time.
    let first = fx
        .engine
        .create_booking(&fx.student, fx.request_for(&shift), booked_at)
        .await
        .unwrap();
    let cancelled = fx
        .engine
        .cancel_booking(first.id, &fx.student, utc("2025-01-09T15:59:00Z"))
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(fx.balance(fx.student.id).await, 2);
    assert!(fx
        .engine
        .shifts()
        .is_bookable(fx.tutor.id, shift.date, shift.time_slot, booked_at)
        .await
        .unwrap());

    // Rebook the released shift; 16:01 on the 9th is too late.
    let second = fx
        .engine
        .create_booking(&fx.student, fx.request_for(&shift), booked_at)
        .await
        .unwrap();
    let err = fx
        .engine
        .cancel_booking(second.id, &fx.student, utc("2025-01-09T16:01:00Z"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PastCancelDeadline { .. }));
    assert_eq!(fx.balance(fx.student.id).await, 1);
}

#[tokio::test]
async fn cancelling_exactly_at_cutoff_is_rejected_one_second_before_is_not() {
    let fx = Fixture::new().await;
    let booked_at = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, booked_at).await;
    fx.give_tickets(fx.student.id, 1).await;
    let booking = fx
        .engine
        .create_booking(&fx.student, fx.request_for(&shift), booked_at)
        .await
        .unwrap();

    assert!(matches!(
        fx.engine
            .cancel_booking(booking.id, &fx.student, utc("2025-01-09T16:00:00Z"))
            .await,
        Err(EngineError::PastCancelDeadline { .. })
    ));
    assert!(fx
        .engine
        .cancel_booking(booking.id, &fx.student, utc("2025-01-09T15:59:59Z"))
        .await
        .is_ok());
}

#[tokio::test]
async fn second_cancel_is_already_terminal_and_refunds_once() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, now).await;
    fx.give_tickets(fx.student.id, 1).await;
    let booking = fx
        .engine
        .create_booking(&fx.student, fx.request_for(&shift), now)
        .await
        .unwrap();
    let after_booking = fx.balance(fx.student.id).await;

    fx.engine
        .cancel_booking(booking.id, &fx.student, now)
        .await
        .unwrap();
    let err = fx
        .engine
        .cancel_booking(booking.id, &fx.student, now)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::AlreadyTerminal(BookingStatus::Cancelled)));
    assert_eq!(fx.balance(fx.student.id).await, after_booking + 1);
}

#[tokio::test]
async fn tutor_and_admin_may_cancel_after_the_cutoff() {
    let fx = Fixture::new().await;
    let booked_at = utc("2025-01-05T09:00:00Z");
    let late = utc("2025-01-10T12:00:00Z");
    fx.give_tickets(fx.student.id, 2).await;

    let s1 = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, booked_at).await;
    let s2 = fx.open_shift(day(2025, 1, 10), TimeSlot::Evening, booked_at).await;
    let b1 = fx
        .engine
        .create_booking(&fx.student, fx.request_for(&s1), booked_at)
        .await
        .unwrap();
    let b2 = fx
        .engine
        .create_booking(&fx.student, fx.request_for(&s2), booked_at)
        .await
        .unwrap();

    fx.engine.cancel_booking(b1.id, &fx.tutor, late).await.unwrap();
    fx.engine.cancel_booking(b2.id, &fx.admin, late).await.unwrap();
    assert_eq!(fx.balance(fx.student.id).await, 2);
}

#[tokio::test]
async fn unrelated_users_cannot_cancel() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, now).await;
    fx.give_tickets(fx.student.id, 1).await;
    let booking = fx
        .engine
        .create_booking(&fx.student, fx.request_for(&shift), now)
        .await
        .unwrap();
    let stranger = fx.add_profile(Role::Parent, "Someone else", None).await;

    assert!(matches!(
        fx.engine.cancel_booking(booking.id, &stranger, now).await,
        Err(EngineError::Forbidden(_))
    ));
    // The student's own parent may cancel.
    assert!(fx.engine.cancel_booking(booking.id, &fx.parent, now).await.is_ok());
}

#[tokio::test]
async fn past_lessons_read_completed_and_cannot_be_cancelled() {
    let fx = Fixture::new().await;
    let booked_at = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, booked_at).await;
    fx.give_tickets(fx.student.id, 1).await;
    let booking = fx
        .engine
        .create_booking(&fx.student, fx.request_for(&shift), booked_at)
        .await
        .unwrap();

    let later = utc("2025-01-11T09:00:00Z");
    let listed = fx.engine.list_bookings(&fx.student, later).await.unwrap();
    assert_eq!(listed[0].booking.status, BookingStatus::Completed);
    assert!(matches!(
        fx.engine.cancel_booking(booking.id, &fx.admin, later).await,
        Err(EngineError::AlreadyTerminal(BookingStatus::Completed))
    ));
}

#[tokio::test]
async fn parent_books_for_own_student_and_debits_the_student() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::Morning, now).await;
    fx.give_tickets(fx.student.id, 1).await;
    let mut request = fx.request_for(&shift);
    request.student_id = Some(fx.student.id);

    let booking = fx.engine.create_booking(&fx.parent, request, now).await.unwrap();

    assert_eq!(booking.user_id, fx.parent.id);
    assert_eq!(booking.ticket_holder(), fx.student.id);
    assert_eq!(fx.balance(fx.student.id).await, 0);
}

#[tokio::test]
async fn parent_cannot_book_for_someone_elses_student() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::Morning, now).await;
    let other_parent = fx.add_profile(Role::Parent, "Other parent", None).await;
    let mut request = fx.request_for(&shift);
    request.student_id = Some(fx.student.id);

    assert!(matches!(
        fx.engine.create_booking(&other_parent, request, now).await,
        Err(EngineError::Forbidden(_))
    ));
}

#[tokio::test]
async fn tutors_cannot_book() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::Morning, now).await;

    assert!(matches!(
        fx.engine.create_booking(&fx.tutor, fx.request_for(&shift), now).await,
        Err(EngineError::Forbidden(_))
    ));
}

#[tokio::test]
async fn mismatched_shift_id_is_a_validation_error() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::Morning, now).await;
    let other = fx.open_shift(day(2025, 1, 10), TimeSlot::Night, now).await;
    fx.give_tickets(fx.student.id, 1).await;
    let mut request = fx.request_for(&shift);
    request.shift_id = Some(other.id);

    assert!(matches!(
        fx.engine.create_booking(&fx.student, request, now).await,
        Err(EngineError::Validation(_))
    ));
    assert_eq!(fx.balance(fx.student.id).await, 1);
}

#[tokio::test]
async fn started_or_withdrawn_shifts_are_not_bookable() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-10T16:30:00Z");
    let started = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, now).await;
    let withdrawn = fx.open_shift(day(2025, 1, 11), TimeSlot::AfterSchool, now).await;
    fx.engine
        .shifts()
        .set_availability(fx.tutor.id, withdrawn.date, withdrawn.time_slot, false, now)
        .await
        .unwrap();
    fx.give_tickets(fx.student.id, 2).await;

    for shift in [&started, &withdrawn] {
        assert!(matches!(
            fx.engine
                .create_booking(&fx.student, fx.request_for(shift), now)
                .await,
            Err(EngineError::ShiftNotAvailable)
        ));
    }
    assert_eq!(fx.balance(fx.student.id).await, 2);
}

#[tokio::test]
async fn booked_shift_cannot_be_withdrawn_until_released() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, now).await;
    fx.give_tickets(fx.student.id, 1).await;
    let booking = fx
        .engine
        .create_booking(&fx.student, fx.request_for(&shift), now)
        .await
        .unwrap();

    let registry = fx.engine.shifts();
    assert!(matches!(
        registry
            .set_availability(fx.tutor.id, shift.date, shift.time_slot, false, now)
            .await,
        Err(EngineError::ShiftInUse)
    ));
    // Re-declaring availability leaves the booking's hold in place.
    let redeclared = registry
        .set_availability(fx.tutor.id, shift.date, shift.time_slot, true, now)
        .await
        .unwrap();
    assert_eq!(redeclared.consumed_by, Some(booking.id));
    assert!(!registry
        .is_bookable(fx.tutor.id, shift.date, shift.time_slot, now)
        .await
        .unwrap());

    fx.engine
        .cancel_booking(booking.id, &fx.student, now)
        .await
        .unwrap();
    assert!(registry
        .set_availability(fx.tutor.id, shift.date, shift.time_slot, false, now)
        .await
        .is_ok());
}

#[tokio::test]
async fn listings_are_scoped_by_role() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, now).await;
    fx.give_tickets(fx.student.id, 1).await;
    fx.engine
        .create_booking(&fx.student, fx.request_for(&shift), now)
        .await
        .unwrap();
    let other_student = fx.add_profile(Role::Student, "Other", None).await;
    let other_tutor = fx.add_profile(Role::Tutor, "Other tutor", None).await;

    for viewer in [&fx.student, &fx.parent, &fx.tutor, &fx.admin] {
        let views = fx.engine.list_bookings(viewer, now).await.unwrap();
        assert_eq!(views.len(), 1, "{:?} should see the booking", viewer.role);
        assert_eq!(views[0].tutor_name.as_deref(), Some("Tanaka sensei"));
        assert_eq!(views[0].student_name.as_deref(), Some("Sato Hana"));
    }
    for viewer in [&other_student, &other_tutor] {
        assert!(fx.engine.list_bookings(viewer, now).await.unwrap().is_empty());
    }
}

async fn finished_lesson(fx: &Fixture) -> Booking {
    let booked_at = utc("2025-01-05T09:00:00Z");
    let shift = fx.open_shift(day(2025, 1, 10), TimeSlot::AfterSchool, booked_at).await;
    fx.give_tickets(fx.student.id, 1).await;
    fx.engine
        .create_booking(&fx.student, fx.request_for(&shift), booked_at)
        .await
        .unwrap()
}

fn report(unit: &str, message: &str, goal: &str) -> ReportRequest {
    ReportRequest {
        unit: Some(unit.to_string()),
        message: Some(message.to_string()),
        goal: Some(goal.to_string()),
    }
}

#[tokio::test]
async fn filed_report_completes_the_booking_and_reads_back() {
    let fx = Fixture::new().await;
    let booking = finished_lesson(&fx).await;
    let after = utc("2025-01-11T10:00:00Z");

    let filed = fx
        .engine
        .reports()
        .file(booking.id, &fx.tutor, report("Fractions", "Good focus", "Mixed numbers"), after)
        .await
        .unwrap();

    let view = fx.engine.reports().view(booking.id, &fx.parent).await.unwrap();
    assert_eq!(view.report_id, Some(filed.id));
    assert_eq!(view.source, ReportSource::Structured);
    assert_eq!(view.report_status, ReportStatus::Completed);
    assert_eq!(view.sections.unit, "Fractions");
    assert_eq!(view.sections.message, "Good focus");
    assert_eq!(view.sections.goal, "Mixed numbers");

    let stored = fx.store.find_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.report_status, ReportStatus::Completed);
    assert!(stored.report_content.unwrap().contains("Mixed numbers"));
}

#[tokio::test]
async fn refiling_overwrites_the_same_report() {
    let fx = Fixture::new().await;
    let booking = finished_lesson(&fx).await;
    let after = utc("2025-01-11T10:00:00Z");
    let reports = fx.engine.reports();

    let first = reports
        .file(booking.id, &fx.tutor, report("Fractions", "", ""), after)
        .await
        .unwrap();
    let second = reports
        .file(booking.id, &fx.tutor, report("Decimals", "Quick", ""), after)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    let view = reports.view(booking.id, &fx.student).await.unwrap();
    assert_eq!(view.sections.unit, "Decimals");
    assert_eq!(view.sections.message, "Quick");
}

#[tokio::test]
async fn partial_edit_keeps_the_other_sections() {
    let fx = Fixture::new().await;
    let booking = finished_lesson(&fx).await;
    let after = utc("2025-01-11T10:00:00Z");
    let reports = fx.engine.reports();
    let filed = reports
        .file(booking.id, &fx.tutor, report("Fractions", "Good focus", "Mixed numbers"), after)
        .await
        .unwrap();

    let edited = reports
        .edit(
            filed.id,
            &fx.tutor,
            ReportRequest {
                message: Some("Needs more practice".to_string()),
                ..ReportRequest::default()
            },
            utc("2025-01-12T10:00:00Z"),
        )
        .await
        .unwrap();

    assert_eq!(edited.unit_content, "Fractions");
    assert_eq!(edited.message_content, "Needs more practice");
    assert_eq!(edited.goal_content, "Mixed numbers");
    assert!(edited.updated_at > edited.created_at);
    let view = reports.view(booking.id, &fx.tutor).await.unwrap();
    assert_eq!(view.report_status, ReportStatus::Completed);
}

#[tokio::test]
async fn view_falls_back_to_composite_text() {
    let fx = Fixture::new().await;
    let booking = finished_lesson(&fx).await;

    let mut tx = fx.store.begin().await.unwrap();
    let mut row = tx.lock_booking(booking.id).await.unwrap().unwrap();
    row.report_content = Some("[unit]\nPercentages\n[message]\nSteady\n[goal]\nRatios".to_string());
    row.report_status = ReportStatus::Completed;
    tx.update_booking(&row).await.unwrap();
    tx.commit().await.unwrap();

    let view = fx.engine.reports().view(booking.id, &fx.student).await.unwrap();
    assert_eq!(view.source, ReportSource::Composite);
    assert_eq!(view.report_id, None);
    assert_eq!(view.sections.unit, "Percentages");
    assert_eq!(view.sections.message, "Steady");
    assert_eq!(view.sections.goal, "Ratios");
}

#[tokio::test]
async fn legacy_free_text_is_read_line_by_line() {
    let fx = Fixture::new().await;
    let booking = finished_lesson(&fx).await;

    let mut tx = fx.store.begin().await.unwrap();
    let mut row = tx.lock_booking(booking.id).await.unwrap().unwrap();
    row.report_content = Some("Algebra\nWorked hard\nQuadratics\nand graphs".to_string());
    tx.update_booking(&row).await.unwrap();
    tx.commit().await.unwrap();

    let view = fx.engine.reports().view(booking.id, &fx.student).await.unwrap();
    assert_eq!(view.sections.unit, "Algebra");
    assert_eq!(view.sections.message, "Worked hard");
    assert_eq!(view.sections.goal, "Quadratics\nand graphs");
}

#[tokio::test]
async fn missing_report_is_not_found() {
    let fx = Fixture::new().await;
    let booking = finished_lesson(&fx).await;

    assert!(matches!(
        fx.engine.reports().view(booking.id, &fx.student).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn report_rules_for_unfinished_cancelled_and_foreign_bookings() {
    let fx = Fixture::new().await;
    let booking = finished_lesson(&fx).await;
    let reports = fx.engine.reports();

    // Same local day as the lesson.
    assert!(matches!(
        reports
            .file(booking.id, &fx.tutor, report("a", "b", "c"), utc("2025-01-10T20:00:00Z"))
            .await,
        Err(EngineError::LessonNotFinished)
    ));

    let other_tutor = fx.add_profile(Role::Tutor, "Other tutor", None).await;
    let after = utc("2025-01-11T10:00:00Z");
    assert!(matches!(
        reports.file(booking.id, &other_tutor, report("a", "b", "c"), after).await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        reports.file(booking.id, &fx.tutor, ReportRequest::default(), after).await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        reports
            .file(booking.id, &fx.tutor, report("[goal]", "b", "c"), after)
            .await,
        Err(EngineError::Validation(_))
    ));

    fx.engine
        .cancel_booking(booking.id, &fx.admin, utc("2025-01-06T09:00:00Z"))
        .await
        .unwrap();
    assert!(matches!(
        reports.file(booking.id, &fx.tutor, report("a", "b", "c"), after).await,
        Err(EngineError::AlreadyTerminal(BookingStatus::Cancelled))
    ));
}

#[tokio::test]
async fn parent_purchases_for_own_student() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");

    let receipt = fx
        .engine
        .ledger()
        .purchase(
            &fx.parent,
            PurchaseRequest::Items {
                items: vec![
                    PurchaseItem { student_id: fx.student.id, quantity: 2 },
                    PurchaseItem { student_id: fx.student.id, quantity: 3 },
                ],
            },
            now,
        )
        .await
        .unwrap();

    assert_eq!(receipt.balances.len(), 1);
    assert_eq!(receipt.balances[0].balance, 5);
    assert_eq!(receipt.total, 5);
    assert_eq!(fx.engine.ledger().history(fx.student.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn purchase_for_an_unrelated_student_is_forbidden() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let other_parent = fx.add_profile(Role::Parent, "Other parent", None).await;

    let err = fx
        .engine
        .ledger()
        .purchase(
            &other_parent,
            PurchaseRequest::Items {
                items: vec![PurchaseItem { student_id: fx.student.id, quantity: 1 }],
            },
            now,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Forbidden(_)));
    assert_eq!(fx.balance(fx.student.id).await, 0);
}

#[tokio::test]
async fn legacy_quantity_credits_the_buyer() {
    let fx = Fixture::new().await;
    let now = utc("2025-01-05T09:00:00Z");
    let ledger = fx.engine.ledger();

    let receipt = ledger
        .purchase(&fx.parent, PurchaseRequest::Legacy { quantity: 4 }, now)
        .await
        .unwrap();
    assert_eq!(receipt.total, 4);
    assert_eq!(fx.balance(fx.parent.id).await, 4);

    assert!(matches!(
        ledger
            .purchase(&fx.parent, PurchaseRequest::Legacy { quantity: 0 }, now)
            .await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        ledger
            .purchase(&fx.tutor, PurchaseRequest::Legacy { quantity: 1 }, now)
            .await,
        Err(EngineError::Forbidden(_))
    ));
}
