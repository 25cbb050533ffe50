//! The reconnecting feed client.
//!
//! Maintains a single WebSocket connection per salon, identifies itself with
//! an `auth` frame, dispatches decoded frames to a [`FeedHandler`], and keeps
//! a bounded in-memory feed of the most recent updates. A dropped connection
//! is retried with capped exponential backoff; once the attempt budget is
//! spent the client reports [`ConnectionState::Offline`] and stays down.

use crate::error::FeedError;
use crate::frame::FeedFrame;
use bloom_domain::config::FeedConfig;
use bloom_domain::feed::{BookingConflict, BookingUpdate, CapacityInfo, FeedStats, Priority};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Connection lifecycle as observed by the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    /// Waiting `delay` before reconnect attempt number `attempt` (1-based).
    Reconnecting { attempt: u32, delay: Duration },
    /// The attempt budget is spent; no further reconnects.
    Offline,
}

/// Receives decoded feed traffic. All methods default to no-ops so handlers
/// implement only what they care about.
pub trait FeedHandler: Send + Sync + 'static {
    fn on_update(&self, _update: &BookingUpdate, _priority: Priority) {}
    fn on_conflict(&self, _conflict: &BookingConflict) {}
    fn on_capacity(&self, _capacity: &CapacityInfo) {}
    fn on_stats(&self, _stats: FeedStats) {}
    fn on_connection(&self, _state: ConnectionState) {}
}

/// Capped exponential backoff: `min(initial · 2ⁿ, cap)` for attempt *n*,
/// `None` once the budget is spent.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectSchedule {
    initial: Duration,
    cap: Duration,
    max_attempts: u32,
}

impl ReconnectSchedule {
    #[must_use]
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.initial_backoff_ms),
            cap: Duration::from_millis(config.max_backoff_ms),
            max_attempts: config.max_reconnect_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (0-based), or `None` when the
    /// budget is exhausted.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = 2u64.saturating_pow(attempt);
        let millis = u64::try_from(self.initial.as_millis())
            .unwrap_or(u64::MAX)
            .saturating_mul(factor);
        Some(Duration::from_millis(millis).min(self.cap))
    }
}

/// One retained feed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub update: BookingUpdate,
    pub priority: Priority,
    pub read: bool,
}

/// Bounded, newest-first feed of booking updates.
#[derive(Debug)]
pub struct FeedLog {
    items: VecDeque<FeedItem>,
    limit: usize,
}

impl FeedLog {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { items: VecDeque::with_capacity(limit.min(1024)), limit: limit.max(1) }
    }

    /// Prepends an update, dropping the oldest entry beyond the limit.
    pub fn push(&mut self, update: BookingUpdate) -> Priority {
        let priority = update.kind.priority();
        self.items.push_front(FeedItem { update, priority, read: false });
        while self.items.len() > self.limit {
            self.items.pop_back();
        }
        priority
    }

    /// Newest-first snapshot of the retained items.
    #[must_use]
    pub fn items(&self) -> Vec<FeedItem> {
        self.items.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }

    /// Marks every retained entry of one appointment as read; returns whether
    /// anything matched.
    pub fn mark_read(&mut self, appointment_id: &str) -> bool {
        let mut matched = false;
        for item in &mut self.items {
            if item.update.appointment_id == appointment_id {
                item.read = true;
                matched = true;
            }
        }
        matched
    }

    pub fn mark_all_read(&mut self) {
        for item in &mut self.items {
            item.read = true;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[derive(Debug, Default)]
struct ClientShared {
    connection: Option<ConnectionState>,
    stats: FeedStats,
    capacity: Option<CapacityInfo>,
}

/// Builder for [`FeedClient::connect`].
#[must_use = "builders do nothing unless you call .connect()"]
pub struct FeedClientBuilder {
    base_url: Option<String>,
    salon_id: Option<String>,
    config: FeedConfig,
    handler: Option<Arc<dyn FeedHandler>>,
}

impl std::fmt::Debug for FeedClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClientBuilder")
            .field("base_url", &self.base_url)
            .field("salon_id", &self.salon_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FeedClientBuilder {
    /// Feed server base URL, e.g. `ws://host:4710`.
    pub fn url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The salon whose feed to follow.
    pub fn salon(mut self, salon_id: impl Into<String>) -> Self {
        self.salon_id = Some(salon_id.into());
        self
    }

    /// Reconnect and buffer tuning; defaults mirror the platform config.
    pub fn config(mut self, config: FeedConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches the frame handler.
    pub fn handler(mut self, handler: impl FeedHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Spawns the connection task and returns the live handle.
    ///
    /// # Errors
    /// Returns [`FeedError::Internal`] when the URL or salon id is missing.
    pub fn connect(self) -> Result<FeedClient, FeedError> {
        let base_url = self.base_url.ok_or_else(|| FeedError::Internal {
            message: "feed URL is required".into(),
            context: None,
        })?;
        let salon_id = self.salon_id.ok_or_else(|| FeedError::Internal {
            message: "salon id is required".into(),
            context: None,
        })?;
        let handler = self.handler.unwrap_or_else(|| Arc::new(NullHandler));

        let endpoint = format!("{}/api/feed/{salon_id}", base_url.trim_end_matches('/'));
        let schedule = ReconnectSchedule::from_config(&self.config);
        let log = Arc::new(Mutex::new(FeedLog::new(self.config.history_limit)));
        let shared = Arc::new(Mutex::new(ClientShared::default()));
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(run_client(
            endpoint,
            salon_id,
            schedule,
            log.clone(),
            shared.clone(),
            handler,
            stop_rx,
        ));

        Ok(FeedClient { log, shared, stop: stop_tx, task })
    }
}

/// Handle to a running feed connection.
#[derive(Debug)]
pub struct FeedClient {
    log: Arc<Mutex<FeedLog>>,
    shared: Arc<Mutex<ClientShared>>,
    stop: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl FeedClient {
    #[must_use]
    pub fn builder() -> FeedClientBuilder {
        FeedClientBuilder {
            base_url: None,
            salon_id: None,
            config: FeedConfig::default(),
            handler: None,
        }
    }

    /// Newest-first snapshot of the retained feed.
    #[must_use]
    pub fn items(&self) -> Vec<FeedItem> {
        self.log.lock().items()
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.log.lock().unread_count()
    }

    /// Marks one appointment's entries as read.
    pub fn mark_read(&self, appointment_id: &str) -> bool {
        self.log.lock().mark_read(appointment_id)
    }

    /// Clears the retained feed (the server-side stats are unaffected).
    pub fn clear(&self) {
        self.log.lock().clear();
    }

    /// The most recent stats frame.
    #[must_use]
    pub fn stats(&self) -> FeedStats {
        self.shared.lock().stats
    }

    /// The most recent capacity snapshot, when one has arrived.
    #[must_use]
    pub fn capacity(&self) -> Option<CapacityInfo> {
        self.shared.lock().capacity.clone()
    }

    /// The last reported connection state.
    #[must_use]
    pub fn connection(&self) -> Option<ConnectionState> {
        self.shared.lock().connection
    }

    /// Signals the connection task to stop and waits for it.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

struct NullHandler;
impl FeedHandler for NullHandler {}

#[allow(clippy::too_many_lines)]
async fn run_client(
    endpoint: String,
    salon_id: String,
    schedule: ReconnectSchedule,
    log: Arc<Mutex<FeedLog>>,
    shared: Arc<Mutex<ClientShared>>,
    handler: Arc<dyn FeedHandler>,
    mut stop: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;

    loop {
        if *stop.borrow() {
            return;
        }

        match connect_async(endpoint.as_str()).await {
            Ok((mut socket, _)) => {
                attempt = 0;
                set_connection(&shared, &handler, ConnectionState::Connected);
                info!(endpoint = %endpoint, "Feed connected");

                // Identify; the server checks the salon against the path.
                match (FeedFrame::Auth { salon_id: salon_id.clone() }).to_text() {
                    Ok(hello) => {
                        if let Err(e) = socket.send(Message::Text(hello.into())).await {
                            warn!(error = %e, "Failed to send auth frame");
                        }
                    },
                    Err(e) => warn!(error = %e, "Failed to encode auth frame"),
                }

                loop {
                    tokio::select! {
                        _ = stop.changed() => {
                            let _ = socket.close(None).await;
                            return;
                        },
                        message = socket.next() => match message {
                            Some(Ok(Message::Text(text))) => {
                                dispatch(text.as_str(), &log, &shared, &handler);
                            },
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {},
                            Some(Err(e)) => {
                                warn!(error = %e, "Feed socket error");
                                break;
                            },
                        },
                    }
                }
            },
            Err(e) => {
                debug!(endpoint = %endpoint, error = %e, "Feed connection failed");
            },
        }

        match schedule.delay_for(attempt) {
            Some(delay) => {
                attempt += 1;
                set_connection(
                    &shared,
                    &handler,
                    ConnectionState::Reconnecting { attempt, delay },
                );
                tokio::select! {
                    () = tokio::time::sleep(delay) => {},
                    _ = stop.changed() => return,
                }
            },
            None => {
                warn!(endpoint = %endpoint, "Feed reconnect budget exhausted");
                set_connection(&shared, &handler, ConnectionState::Offline);
                return;
            },
        }
    }
}

fn dispatch(
    text: &str,
    log: &Arc<Mutex<FeedLog>>,
    shared: &Arc<Mutex<ClientShared>>,
    handler: &Arc<dyn FeedHandler>,
) {
    let frame = match FeedFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Dropping malformed feed frame");
            return;
        },
    };

    match frame {
        FeedFrame::BookingUpdate(update) => {
            let priority = log.lock().push(update.clone());
            handler.on_update(&update, priority);
        },
        FeedFrame::Conflict(conflict) => handler.on_conflict(&conflict),
        FeedFrame::Capacity(capacity) => {
            shared.lock().capacity = Some(capacity.clone());
            handler.on_capacity(&capacity);
        },
        FeedFrame::Stats(stats) => {
            shared.lock().stats = stats;
            handler.on_stats(stats);
        },
        FeedFrame::Auth { .. } => {},
    }
}

fn set_connection(
    shared: &Arc<Mutex<ClientShared>>,
    handler: &Arc<dyn FeedHandler>,
    state: ConnectionState,
) {
    shared.lock().connection = Some(state);
    handler.on_connection(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloom_domain::feed::UpdateKind;
    use chrono::Utc;

    fn update(id: &str, kind: UpdateKind) -> BookingUpdate {
        BookingUpdate {
            kind,
            appointment_id: id.to_owned(),
            salon_id: "salon:a".to_owned(),
            staff_id: None,
            date: None,
            slot: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let schedule = ReconnectSchedule::from_config(&FeedConfig::default());

        assert_eq!(schedule.delay_for(0), Some(Duration::from_secs(1)));
        assert_eq!(schedule.delay_for(1), Some(Duration::from_secs(2)));
        assert_eq!(schedule.delay_for(2), Some(Duration::from_secs(4)));
        assert_eq!(schedule.delay_for(3), Some(Duration::from_secs(8)));
        assert_eq!(schedule.delay_for(4), Some(Duration::from_secs(16)));
        assert_eq!(schedule.delay_for(5), None, "budget is five attempts");
    }

    #[test]
    fn backoff_respects_the_cap() {
        let schedule = ReconnectSchedule::from_config(&FeedConfig {
            max_reconnect_attempts: 10,
            ..FeedConfig::default()
        });
        assert_eq!(schedule.delay_for(9), Some(Duration::from_secs(30)));
    }

    #[test]
    fn feed_log_is_bounded_and_newest_first() {
        let mut log = FeedLog::new(3);
        for i in 0..5 {
            log.push(update(&format!("appointment:{i}"), UpdateKind::Created));
        }

        assert_eq!(log.len(), 3);
        let items = log.items();
        assert_eq!(items[0].update.appointment_id, "appointment:4");
        assert_eq!(items[2].update.appointment_id, "appointment:2");
    }

    #[test]
    fn read_marks_and_unread_counts() {
        let mut log = FeedLog::new(10);
        log.push(update("appointment:a", UpdateKind::Created));
        log.push(update("appointment:b", UpdateKind::Cancelled));
        assert_eq!(log.unread_count(), 2);

        assert!(log.mark_read("appointment:a"));
        assert_eq!(log.unread_count(), 1);

        assert!(!log.mark_read("appointment:missing"));

        log.mark_all_read();
        assert_eq!(log.unread_count(), 0);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn push_reports_the_update_priority() {
        let mut log = FeedLog::new(10);
        assert_eq!(log.push(update("appointment:a", UpdateKind::Created)), Priority::High);
        assert_eq!(log.push(update("appointment:b", UpdateKind::Updated)), Priority::Low);
        assert_eq!(log.push(update("appointment:c", UpdateKind::Rescheduled)), Priority::Medium);
    }
}
