use bloom_domain::feed::{
    BookingConflict, BookingUpdate, CapacityInfo, ConflictKind, UpdateKind,
};
use bloom_event_bus::EventBus;
use bloom_feed::FeedFrame;
use bloom_feed::hub::FeedHub;
use chrono::{NaiveDate, TimeZone, Utc};
use std::time::Duration;

fn update(salon: &str, kind: UpdateKind, day: u32) -> BookingUpdate {
    BookingUpdate {
        kind,
        appointment_id: "appointment:1".into(),
        salon_id: salon.into(),
        staff_id: None,
        date: None,
        slot: None,
        timestamp: Utc.with_ymd_and_hms(2025, 6, day, 10, 0, 0).unwrap(),
    }
}

fn capacity(salon: &str) -> CapacityInfo {
    CapacityInfo::from_counts(
        salon.into(),
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        40,
        10,
    )
}

#[tokio::test]
async fn updates_fan_out_with_stats() {
    let hub = FeedHub::new(16);
    let (mut rx, snapshot) = hub.subscribe("salon:a");
    assert_eq!(snapshot.stats.total_today, 0);

    hub.publish_update(update("salon:a", UpdateKind::Created, 2));

    let first = rx.recv().await.unwrap();
    assert!(matches!(first, FeedFrame::BookingUpdate(ref u) if u.kind == UpdateKind::Created));

    let second = rx.recv().await.unwrap();
    match second {
        FeedFrame::Stats(stats) => {
            assert_eq!(stats.total_today, 1);
            assert_eq!(stats.new_bookings, 1);
        },
        other => panic!("expected stats frame, got {other:?}"),
    }
}

#[tokio::test]
async fn salons_are_isolated() {
    let hub = FeedHub::new(16);
    let (mut rx_a, _) = hub.subscribe("salon:a");
    let (mut rx_b, _) = hub.subscribe("salon:b");

    hub.publish_update(update("salon:a", UpdateKind::Created, 2));

    let frame = rx_a.recv().await.unwrap();
    assert!(matches!(frame, FeedFrame::BookingUpdate(_)));

    let nothing =
        tokio::time::timeout(Duration::from_millis(100), rx_b.recv()).await;
    assert!(nothing.is_err(), "salon:b must not see salon:a traffic");
}

#[tokio::test]
async fn snapshot_carries_stats_and_capacity() {
    let hub = FeedHub::new(16);

    hub.publish_update(update("salon:a", UpdateKind::Created, 2));
    hub.publish_update(update("salon:a", UpdateKind::Cancelled, 2));
    hub.publish_capacity(capacity("salon:a"));

    let (_rx, snapshot) = hub.subscribe("salon:a");
    assert_eq!(snapshot.stats.total_today, 2);
    assert_eq!(snapshot.stats.cancellations, 1);
    let capacity = snapshot.capacity.expect("capacity snapshot");
    assert_eq!(capacity.total_slots, 40);
    assert_eq!(capacity.available_slots, 30);
}

#[tokio::test]
async fn stats_roll_over_between_days() {
    let hub = FeedHub::new(16);

    hub.publish_update(update("salon:a", UpdateKind::Created, 2));
    hub.publish_update(update("salon:a", UpdateKind::Created, 3));

    let (_rx, snapshot) = hub.subscribe("salon:a");
    assert_eq!(snapshot.stats.total_today, 1, "a new day resets the counters");
}

#[tokio::test]
async fn conflicts_fan_out() {
    let hub = FeedHub::new(16);
    let (mut rx, _) = hub.subscribe("salon:a");

    hub.publish_conflict(BookingConflict {
        kind: ConflictKind::DoubleBooking,
        salon_id: "salon:a".into(),
        description: "Time slot 14:00-15:00 is already booked for Ana".into(),
        detected_at: Utc::now(),
    });

    let frame = rx.recv().await.unwrap();
    assert!(matches!(frame, FeedFrame::Conflict(ref c) if c.kind == ConflictKind::DoubleBooking));
}

#[tokio::test]
async fn bus_events_reach_subscribers() {
    let bus = EventBus::new();
    let hub = FeedHub::new(16);
    hub.attach(&bus).expect("attach hub");

    let (mut rx, _) = hub.subscribe("salon:a");

    bus.publish(update("salon:a", UpdateKind::Rescheduled, 2)).expect("publish");

    let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("frame within a second")
        .unwrap();
    assert!(matches!(frame, FeedFrame::BookingUpdate(ref u) if u.kind == UpdateKind::Rescheduled));
}
