use bloom_event_bus::{EventBus, EventBusError, EventReceiverExt};

#[derive(Clone, Debug, PartialEq, Eq)]
struct TestEvent(pub usize);

#[tokio::test]
async fn event_flow() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe::<TestEvent>().unwrap();

    let event = TestEvent(42);
    bus.publish(event.clone()).unwrap();

    let received = rx.recv().await.unwrap();
    assert_eq!(*received, event);
}

#[tokio::test]
async fn receiver_lagged_recovery() {
    let bus = EventBus::new();
    let capacity = 2;
    let mut rx = bus.subscribe_with_capacity::<TestEvent>(capacity).unwrap();

    let total_messages = 100;
    for i in 0..total_messages {
        bus.publish(TestEvent(i)).unwrap();
    }

    let first_received = loop {
        match rx.recv().await {
            Ok(event) => break event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {},
            Err(err) => panic!("Should recover from lag: {err:?}"),
        }
    };

    assert!(
        first_received.0 >= (total_messages - capacity),
        "Should have skipped to the fresh tail of the buffer. Expected >= {}, got {}",
        total_messages - capacity,
        first_received.0
    );

    let second_received = rx.recv().await.expect("Should continue receiving");
    assert_eq!(second_received.0, first_received.0 + 1);
}

#[tokio::test]
async fn multiple_subscribers_see_every_event() {
    let bus = EventBus::new();
    let mut rx1 = bus.subscribe::<TestEvent>().unwrap();
    let mut rx2 = bus.subscribe::<TestEvent>().unwrap();

    bus.publish(TestEvent(100)).unwrap();

    let res1 = rx1.recv().await.unwrap();
    let res2 = rx2.recv().await.unwrap();

    assert_eq!(res1.0, res2.0);
}

#[tokio::test]
async fn event_types_are_isolated() {
    #[derive(Clone, Debug, PartialEq, Eq)]
    struct OtherEvent(pub usize);

    let bus = EventBus::new();
    let mut rx_test = bus.subscribe::<TestEvent>().unwrap();
    let mut rx_other = bus.subscribe::<OtherEvent>().unwrap();

    bus.publish(TestEvent(7)).unwrap();
    bus.publish(OtherEvent(13)).unwrap();

    assert_eq!(rx_test.recv().await.unwrap().0, 7);
    assert_eq!(rx_other.recv().await.unwrap().0, 13);
}

#[tokio::test]
async fn bus_closure_detection() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe::<TestEvent>().unwrap();

    drop(bus);

    let result = rx.recv().await;
    assert!(
        matches!(result, Err(tokio::sync::broadcast::error::RecvError::Closed)),
        "receiver should observe bus closure"
    );
}

#[tokio::test]
async fn shutdown_closes_all_channels() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe::<TestEvent>().unwrap();

    let closed = bus.shutdown();
    assert_eq!(closed, 1, "expected a single event channel to be closed");

    let result = rx.recv().await;
    assert!(
        matches!(result, Err(tokio::sync::broadcast::error::RecvError::Closed)),
        "receiver should observe channel closure after shutdown"
    );
}

#[tokio::test]
async fn watch_keeps_latest_value() {
    let bus = EventBus::new();
    let rx = bus.subscribe_watch::<TestEvent>(TestEvent(1)).unwrap();

    bus.publish_watch(TestEvent(2)).unwrap();
    bus.publish_watch(TestEvent(3)).unwrap();

    assert_eq!(rx.borrow().0, 3);
}

#[tokio::test]
async fn receiver_ext_for_watch_waits_for_change() {
    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Snapshot(pub i64);

    let bus = EventBus::new();
    let mut rx = bus.subscribe_watch::<Snapshot>(Snapshot(0)).unwrap();
    bus.publish_watch(Snapshot(10)).unwrap();

    let received = EventReceiverExt::recv(&mut rx).await.unwrap();
    assert_eq!(received.0, 10);
}

#[tokio::test]
async fn ordering_is_preserved() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe::<TestEvent>().unwrap();

    for i in 0..100 {
        bus.publish(TestEvent(i)).unwrap();
    }

    for i in 0..100 {
        let event = rx.recv().await.unwrap();
        assert_eq!(event.0, i, "Events should arrive in order");
    }
}

#[tokio::test]
async fn concurrent_publishers() {
    use std::sync::Arc;

    let bus = Arc::new(EventBus::new());
    let mut rx = bus.subscribe::<TestEvent>().unwrap();

    let bus1 = bus.clone();
    let handle1 = tokio::spawn(async move {
        for i in 0..50 {
            bus1.publish(TestEvent(i)).unwrap();
        }
    });

    let bus2 = bus.clone();
    let handle2 = tokio::spawn(async move {
        for i in 50..100 {
            bus2.publish(TestEvent(i)).unwrap();
        }
    });

    handle1.await.unwrap();
    handle2.await.unwrap();

    let mut received = 0;
    while tokio::time::timeout(std::time::Duration::from_millis(100), rx.recv()).await.is_ok() {
        received += 1;
    }

    assert_eq!(received, 100, "Should receive all events");
}

#[tokio::test]
async fn kind_mismatch_is_rejected() {
    let bus = EventBus::new();
    let _rx = bus.subscribe::<TestEvent>().unwrap();

    let result = bus.publish_watch(TestEvent(1));
    assert!(matches!(result, Err(EventBusError::ChannelKindMismatch { .. })));
}

#[tokio::test]
async fn invalid_capacity_rejected() {
    let bus = EventBus::new();

    let result = bus.subscribe_with_capacity::<TestEvent>(0);
    assert!(matches!(result, Err(EventBusError::InvalidCapacity { .. })));
}
