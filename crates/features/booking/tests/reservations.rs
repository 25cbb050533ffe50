use bloom_booking::availability::{AvailabilityEngine, SlotDenial};
use bloom_booking::reservations::{BookingService, NewBooking};
use bloom_booking::{AppointmentRepo, BookingError, BookingFilter};
use bloom_catalog::CatalogRepo;
use bloom_database::Database;
use bloom_domain::config::BookingConfig;
use bloom_domain::feed::{BookingUpdate, UpdateKind};
use bloom_domain::scheduling::{
    Appointment, AppointmentStatus, DayOfWeek, OperatingHours, Salon, Service, StaffMember,
    StaffSchedule,
};
use bloom_event_bus::EventBus;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, NaiveTime, Utc, Weekday};
use std::time::Duration;

struct Fixture {
    service: BookingService,
    engine: AvailabilityEngine,
    repo: AppointmentRepo,
    events: EventBus,
}

const SALON: &str = "salon:main";
const STAFF: &str = "staff:ana";
const CUT: &str = "service:cut";
const COLOR: &str = "service:color";

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Next date with the given weekday, at least two days out so the 24h
/// policy window stays open in every test.
fn next(day: Weekday) -> NaiveDate {
    let mut date = Utc::now().date_naive() + ChronoDuration::days(2);
    while date.weekday() != day {
        date += ChronoDuration::days(1);
    }
    date
}

async fn fixture() -> Fixture {
    let db = Database::builder()
        .url("mem://")
        .session("bloom_test", "reservations")
        .init()
        .await
        .expect("mem database");

    let catalog = CatalogRepo::new(db.clone());

    catalog
        .add_salon(&Salon {
            id: SALON.into(),
            name: "Main Street Salon".into(),
            slug: "main-street".into(),
            description: String::new(),
            is_active: true,
            is_accepting_bookings: true,
            rating_average: 4.8,
            rating_count: 120,
        })
        .await
        .expect("seed salon");

    catalog
        .add_staff(&StaffMember {
            id: STAFF.into(),
            salon_id: SALON.into(),
            display_name: "Ana".into(),
            title: "Stylist".into(),
            is_active: true,
        })
        .await
        .expect("seed staff");

    for (id, name, minutes, price) in
        [(CUT, "Cut", 60, 40.0), (COLOR, "Color", 90, 80.0)]
    {
        catalog
            .add_service(&Service {
                id: id.into(),
                salon_id: SALON.into(),
                name: name.into(),
                duration_minutes: minutes,
                base_price: price,
                is_active: true,
            })
            .await
            .expect("seed service");
    }

    for day in [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ] {
        catalog
            .set_operating_hours(&OperatingHours {
                salon_id: SALON.into(),
                day,
                open_time: t(9, 0),
                close_time: t(17, 0),
                is_closed: false,
            })
            .await
            .expect("seed hours");
    }
    catalog
        .set_operating_hours(&OperatingHours {
            salon_id: SALON.into(),
            day: DayOfWeek::Sunday,
            open_time: t(9, 0),
            close_time: t(17, 0),
            is_closed: true,
        })
        .await
        .expect("seed sunday");

    // Ana works Monday through Friday only.
    for day in [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
    ] {
        catalog
            .set_staff_schedule(&StaffSchedule {
                staff_id: STAFF.into(),
                salon_id: SALON.into(),
                day,
                start_time: t(10, 0),
                end_time: t(16, 0),
            })
            .await
            .expect("seed schedule");
    }

    let repo = AppointmentRepo::new(db.clone());
    let config = BookingConfig::default();
    let engine = AvailabilityEngine::new(catalog.clone(), repo.clone(), config.clone());
    let events = EventBus::new();
    let service =
        BookingService::new(repo.clone(), catalog, engine.clone(), events.clone(), &config);

    Fixture { service, engine, repo, events }
}

fn request(date: NaiveDate, start: NaiveTime, services: &[&str]) -> NewBooking {
    NewBooking {
        salon_id: SALON.into(),
        staff_id: STAFF.into(),
        customer_id: "customer:kim".into(),
        service_ids: services.iter().map(|s| (*s).to_owned()).collect(),
        date,
        start,
        notes: None,
    }
}

#[tokio::test]
async fn booking_occupies_its_slot() {
    let fx = fixture().await;
    let date = next(Weekday::Tue);

    let appointment =
        fx.service.create(request(date, t(10, 0), &[CUT])).await.expect("first booking");
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.end_time, t(11, 0));
    assert!((appointment.total_price - 40.0).abs() < f64::EPSILON);

    // Same slot again is a conflict.
    let err = fx.service.create(request(date, t(10, 0), &[CUT])).await.unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable { .. }), "got {err:?}");

    // Overlapping start is a conflict too.
    let err = fx.service.create(request(date, t(10, 30), &[CUT])).await.unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable { .. }));

    // Back-to-back is fine.
    fx.service.create(request(date, t(11, 0), &[CUT])).await.expect("adjacent booking");
}

#[tokio::test]
async fn multi_service_bookings_add_durations() {
    let fx = fixture().await;
    let date = next(Weekday::Wed);

    let appointment =
        fx.service.create(request(date, t(10, 0), &[CUT, COLOR])).await.expect("combo booking");
    assert_eq!(appointment.end_time, t(12, 30));
    assert!((appointment.total_price - 120.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn bookings_outside_the_schedule_are_refused() {
    let fx = fixture().await;

    // Before Ana's window (salon is open, she is not).
    let err =
        fx.service.create(request(next(Weekday::Tue), t(9, 0), &[CUT])).await.unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable { .. }));

    // Would run past her window end.
    let err =
        fx.service.create(request(next(Weekday::Tue), t(15, 30), &[CUT])).await.unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable { .. }));

    // Saturday: salon open, no schedule row.
    let err =
        fx.service.create(request(next(Weekday::Sat), t(10, 0), &[CUT])).await.unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable { .. }));

    // Sunday: salon closed.
    let err =
        fx.service.create(request(next(Weekday::Sun), t(10, 0), &[CUT])).await.unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable { .. }));
}

#[tokio::test]
async fn unknown_services_fail_validation() {
    let fx = fixture().await;
    let err = fx
        .service
        .create(request(next(Weekday::Tue), t(10, 0), &["service:nope"]))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation { .. }));
}

#[tokio::test]
async fn day_slots_reflect_existing_bookings() {
    let fx = fixture().await;
    let date = next(Weekday::Thu);

    let board = fx
        .engine
        .day_slots(SALON, STAFF, date, &[CUT.to_owned()])
        .await
        .expect("board before booking");
    // Window 10:00-16:00, hourly service on a 30-minute grid: starts 10:00..15:00.
    assert_eq!(board.slots.len(), 11);
    assert!(board.slots.iter().all(|slot| slot.available));

    fx.service.create(request(date, t(12, 0), &[CUT])).await.expect("booking");

    let board = fx
        .engine
        .day_slots(SALON, STAFF, date, &[CUT.to_owned()])
        .await
        .expect("board after booking");
    let blocked: Vec<_> =
        board.slots.iter().filter(|slot| !slot.available).map(|slot| slot.range.start).collect();
    assert_eq!(blocked, vec![t(11, 30), t(12, 0), t(12, 30)]);
    assert_eq!(board.next_available(), Some(bloom_domain::scheduling::TimeRange::new(
        t(10, 0),
        t(11, 0),
    )));
}

#[tokio::test]
async fn closed_days_report_their_reason() {
    let fx = fixture().await;

    let sunday = fx
        .engine
        .day_slots(SALON, STAFF, next(Weekday::Sun), &[CUT.to_owned()])
        .await
        .expect("sunday board");
    assert_eq!(sunday.denial, Some(SlotDenial::SalonClosed));
    assert!(sunday.slots.is_empty());

    let saturday = fx
        .engine
        .day_slots(SALON, STAFF, next(Weekday::Sat), &[CUT.to_owned()])
        .await
        .expect("saturday board");
    assert_eq!(saturday.denial, Some(SlotDenial::NotScheduled));
}

#[tokio::test]
async fn calendar_spans_working_and_off_days() {
    let fx = fixture().await;
    let monday = next(Weekday::Mon);
    let sunday_after = next_from(monday, Weekday::Sun);

    fx.service.create(request(monday, t(10, 0), &[CUT])).await.expect("booking");

    let outlook = fx
        .engine
        .calendar(SALON, STAFF, monday, sunday_after)
        .await
        .expect("calendar");

    let monday_entry = &outlook[&monday];
    assert!(monday_entry.working.is_some());
    assert_eq!(monday_entry.booked.len(), 1);

    let sunday_entry = &outlook[&sunday_after];
    assert!(sunday_entry.working.is_none());
    assert!(sunday_entry.booked.is_empty());
}

#[tokio::test]
async fn capacity_counts_schedule_slots() {
    let fx = fixture().await;
    let date = next(Weekday::Fri);

    let before = fx.engine.capacity(SALON, date).await.expect("capacity");
    // One stylist, 10:00-16:00 on a 30-minute grid.
    assert_eq!(before.total_slots, 12);
    assert_eq!(before.booked_slots, 0);

    fx.service.create(request(date, t(10, 0), &[CUT])).await.expect("booking");

    let after = fx.engine.capacity(SALON, date).await.expect("capacity");
    assert_eq!(after.booked_slots, 1);
    assert_eq!(after.available_slots, 11);
}

#[tokio::test]
async fn cancel_respects_ownership_and_window() {
    let fx = fixture().await;
    let date = next(Weekday::Tue);

    let appointment = fx.service.create(request(date, t(10, 0), &[CUT])).await.expect("booking");

    let err = fx
        .service
        .cancel(&appointment.id, "customer:other", None)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden { .. }));

    let cancelled = fx
        .service
        .cancel(&appointment.id, "customer:kim", Some("sick".into()))
        .await
        .expect("cancel");
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("sick"));
    assert!(cancelled.cancelled_at.is_some());

    // The slot frees up again.
    fx.service.create(request(date, t(10, 0), &[CUT])).await.expect("rebooking");
}

#[tokio::test]
async fn late_cancellation_is_refused() {
    let fx = fixture().await;

    // Inject an appointment that already started; the policy window is closed.
    let appointment = Appointment {
        id: "appointment:late".into(),
        salon_id: SALON.into(),
        staff_id: STAFF.into(),
        customer_id: "customer:kim".into(),
        date: Utc::now().date_naive(),
        start_time: t(0, 0),
        end_time: t(1, 0),
        status: AppointmentStatus::Confirmed,
        total_price: 40.0,
        notes: None,
        cancellation_reason: None,
        booked_at: Utc::now(),
        confirmed_at: None,
        cancelled_at: None,
        completed_at: None,
    };
    fx.repo.insert(&appointment, &[]).await.expect("inject appointment");

    let err = fx.service.cancel("appointment:late", "customer:kim", None).await.unwrap_err();
    assert!(matches!(err, BookingError::Policy { .. }), "got {err:?}");
}

#[tokio::test]
async fn reschedule_moves_the_appointment() {
    let fx = fixture().await;
    let date = next(Weekday::Tue);

    let appointment = fx.service.create(request(date, t(10, 0), &[CUT])).await.expect("booking");
    let target = next_from(date, Weekday::Wed);

    let moved = fx
        .service
        .reschedule(&appointment.id, "customer:kim", target, t(14, 0))
        .await
        .expect("reschedule");
    assert_eq!(moved.date, target);
    assert_eq!(moved.start_time, t(14, 0));
    assert_eq!(moved.end_time, t(15, 0));

    // The old slot is free again.
    fx.service.create(request(date, t(10, 0), &[CUT])).await.expect("rebooking");
}

#[tokio::test]
async fn reschedule_onto_a_taken_slot_is_refused() {
    let fx = fixture().await;
    let date = next(Weekday::Tue);

    fx.service.create(request(date, t(10, 0), &[CUT])).await.expect("first");
    let second = fx.service.create(request(date, t(12, 0), &[CUT])).await.expect("second");

    let err = fx
        .service
        .reschedule(&second.id, "customer:kim", date, t(10, 30))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable { .. }));

    // Moving within its own interval is allowed (self is excluded).
    fx.service
        .reschedule(&second.id, "customer:kim", date, t(12, 30))
        .await
        .expect("nudge within own slot");
}

#[tokio::test]
async fn status_transitions_stamp_timestamps() {
    let fx = fixture().await;
    let date = next(Weekday::Tue);

    let appointment = fx.service.create(request(date, t(10, 0), &[CUT])).await.expect("booking");

    let confirmed = fx
        .service
        .set_status(&appointment.id, AppointmentStatus::Confirmed)
        .await
        .expect("confirm");
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    assert!(confirmed.confirmed_at.is_some());

    let err = fx.service.set_status(&appointment.id, AppointmentStatus::Cancelled).await;
    assert!(matches!(err, Err(BookingError::Validation { .. })));
}

#[tokio::test]
async fn listing_filters_and_flags() {
    let fx = fixture().await;
    let date = next(Weekday::Tue);

    fx.service.create(request(date, t(10, 0), &[CUT])).await.expect("booking");

    let all = fx
        .service
        .list(&BookingFilter { salon_id: Some(SALON.into()), ..Default::default() })
        .await
        .expect("list");
    assert_eq!(all.len(), 1);
    assert!(all[0].can_cancel, "fresh far-out booking should be cancellable");
    assert!(all[0].can_reschedule);

    let none = fx
        .service
        .list(&BookingFilter {
            salon_id: Some(SALON.into()),
            status: Some(AppointmentStatus::Completed),
            ..Default::default()
        })
        .await
        .expect("filtered list");
    assert!(none.is_empty());
}

#[tokio::test]
async fn created_bookings_reach_the_feed() {
    let fx = fixture().await;
    let mut updates = fx.events.subscribe::<BookingUpdate>().expect("subscribe");

    let appointment = fx
        .service
        .create(request(next(Weekday::Tue), t(10, 0), &[CUT]))
        .await
        .expect("booking");

    let update = tokio::time::timeout(Duration::from_secs(1), updates.recv())
        .await
        .expect("update within a second")
        .expect("channel open");
    assert_eq!(update.kind, UpdateKind::Created);
    assert_eq!(update.appointment_id, appointment.id);
    assert_eq!(update.salon_id, SALON);
}

/// Next date strictly after `from` with the given weekday.
fn next_from(from: NaiveDate, day: Weekday) -> NaiveDate {
    let mut date = from + ChronoDuration::days(1);
    while date.weekday() != day {
        date += ChronoDuration::days(1);
    }
    date
}
