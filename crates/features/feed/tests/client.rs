use bloom_domain::config::FeedConfig;
use bloom_domain::feed::{BookingUpdate, CapacityInfo, FeedStats, Priority, UpdateKind};
use bloom_feed::FeedFrame;
use bloom_feed::client::{ConnectionState, FeedClient, FeedHandler};
use chrono::{NaiveDate, Utc};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug)]
enum Observed {
    Connection(ConnectionState),
    Update(String, Priority),
    Capacity(u32),
    Stats(u64),
}

struct Recorder(mpsc::UnboundedSender<Observed>);

impl FeedHandler for Recorder {
    fn on_update(&self, update: &BookingUpdate, priority: Priority) {
        let _ = self.0.send(Observed::Update(update.appointment_id.clone(), priority));
    }

    fn on_capacity(&self, capacity: &CapacityInfo) {
        let _ = self.0.send(Observed::Capacity(capacity.total_slots));
    }

    fn on_stats(&self, stats: FeedStats) {
        let _ = self.0.send(Observed::Stats(stats.total_today));
    }

    fn on_connection(&self, state: ConnectionState) {
        let _ = self.0.send(Observed::Connection(state));
    }
}

fn sample_update() -> BookingUpdate {
    BookingUpdate {
        kind: UpdateKind::Created,
        appointment_id: "appointment:live".into(),
        salon_id: "salon:a".into(),
        staff_id: None,
        date: None,
        slot: None,
        timestamp: Utc::now(),
    }
}

fn quick_config() -> FeedConfig {
    FeedConfig {
        max_reconnect_attempts: 2,
        initial_backoff_ms: 20,
        max_backoff_ms: 100,
        history_limit: 100,
        channel_capacity: 16,
    }
}

async fn recv_until<F>(rx: &mut mpsc::UnboundedReceiver<Observed>, mut predicate: F) -> Observed
where
    F: FnMut(&Observed) -> bool,
{
    loop {
        let observed = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("handler event within five seconds")
            .expect("handler channel open");
        if predicate(&observed) {
            return observed;
        }
    }
}

#[tokio::test]
async fn client_authenticates_dispatches_and_buffers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    // One-shot server: expect the auth frame, push three frames, hang up.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut socket = accept_async(stream).await.expect("handshake");

        let hello = socket.next().await.expect("auth frame").expect("auth message");
        let frame = FeedFrame::parse(hello.to_text().expect("text frame")).expect("parse auth");
        assert!(matches!(frame, FeedFrame::Auth { ref salon_id } if salon_id == "salon:a"));

        for frame in [
            FeedFrame::Stats(FeedStats { total_today: 7, ..FeedStats::default() }),
            FeedFrame::Capacity(CapacityInfo::from_counts(
                "salon:a".into(),
                NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                40,
                10,
            )),
            FeedFrame::BookingUpdate(sample_update()),
        ] {
            let text = frame.to_text().expect("encode frame");
            socket.send(Message::Text(text.into())).await.expect("send frame");
        }

        socket.close(None).await.ok();
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = FeedClient::builder()
        .url(format!("ws://{addr}"))
        .salon("salon:a")
        .config(quick_config())
        .handler(Recorder(tx))
        .connect()
        .expect("spawn client");

    let connected = recv_until(&mut rx, |o| matches!(o, Observed::Connection(_))).await;
    assert!(matches!(connected, Observed::Connection(ConnectionState::Connected)));

    let update = recv_until(&mut rx, |o| matches!(o, Observed::Update(..))).await;
    match update {
        Observed::Update(id, priority) => {
            assert_eq!(id, "appointment:live");
            assert_eq!(priority, Priority::High);
        },
        other => panic!("unexpected event {other:?}"),
    }

    // The retained feed and the side-channels caught everything.
    assert_eq!(client.items().len(), 1);
    assert_eq!(client.unread_count(), 1);
    assert_eq!(client.stats().total_today, 7);
    assert_eq!(client.capacity().expect("capacity").total_slots, 40);

    assert!(client.mark_read("appointment:live"));
    assert_eq!(client.unread_count(), 0);

    server.await.expect("server task");

    // The server is gone; the client burns its reconnect budget and goes
    // offline.
    let offline =
        recv_until(&mut rx, |o| matches!(o, Observed::Connection(ConnectionState::Offline))).await;
    assert!(matches!(offline, Observed::Connection(ConnectionState::Offline)));

    client.shutdown().await;
}

#[tokio::test]
async fn reconnect_schedule_is_reported_to_the_handler() {
    // Nothing listens on this port; every attempt fails.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = FeedClient::builder()
        .url(format!("ws://{addr}"))
        .salon("salon:a")
        .config(quick_config())
        .handler(Recorder(tx))
        .connect()
        .expect("spawn client");

    let first = recv_until(&mut rx, |o| matches!(o, Observed::Connection(_))).await;
    match first {
        Observed::Connection(ConnectionState::Reconnecting { attempt, delay }) => {
            assert_eq!(attempt, 1);
            assert_eq!(delay, Duration::from_millis(20));
        },
        other => panic!("expected first reconnect, got {other:?}"),
    }

    let second = recv_until(&mut rx, |o| matches!(o, Observed::Connection(_))).await;
    match second {
        Observed::Connection(ConnectionState::Reconnecting { attempt, delay }) => {
            assert_eq!(attempt, 2);
            assert_eq!(delay, Duration::from_millis(40));
        },
        other => panic!("expected second reconnect, got {other:?}"),
    }

    let last = recv_until(&mut rx, |o| matches!(o, Observed::Connection(_))).await;
    assert!(matches!(last, Observed::Connection(ConnectionState::Offline)));

    client.shutdown().await;
}

#[tokio::test]
async fn missing_builder_fields_are_rejected() {
    let err = FeedClient::builder().salon("salon:a").connect().unwrap_err();
    assert!(err.to_string().contains("URL"));

    let err = FeedClient::builder().url("ws://localhost:1").connect().unwrap_err();
    assert!(err.to_string().contains("salon"));
}
