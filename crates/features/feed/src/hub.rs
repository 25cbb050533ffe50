//! Server-side fan-out: one bounded broadcast channel per salon, fed from the
//! platform event bus.
//!
//! The hub also keeps the latest capacity snapshot and the rolling daily
//! stats per salon, so a freshly connected subscriber starts from the current
//! picture instead of an empty feed.

use crate::frame::FeedFrame;
use bloom_domain::feed::{BookingConflict, BookingUpdate, CapacityInfo, FeedStats};
use bloom_event_bus::{EventBus, EventBusError, EventReceiverExt};
use chrono::NaiveDate;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Debug)]
struct SalonChannel {
    sender: broadcast::Sender<FeedFrame>,
    stats: FeedStats,
    stats_day: Option<NaiveDate>,
    capacity: Option<CapacityInfo>,
}

impl SalonChannel {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, stats: FeedStats::default(), stats_day: None, capacity: None }
    }

    fn push(&self, frame: FeedFrame) {
        // No subscribers is fine; the frame is simply dropped.
        let _ = self.sender.send(frame);
    }
}

/// What a new subscriber sees before any live frame arrives.
#[derive(Debug, Clone)]
pub struct SalonSnapshot {
    pub stats: FeedStats,
    pub capacity: Option<CapacityInfo>,
}

/// Per-salon feed fan-out with bounded buffers.
#[derive(Debug, Clone)]
pub struct FeedHub {
    salons: Arc<RwLock<FxHashMap<String, SalonChannel>>>,
    channel_capacity: usize,
}

impl FeedHub {
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        Self { salons: Arc::new(RwLock::new(FxHashMap::default())), channel_capacity: channel_capacity.max(1) }
    }

    /// Subscribes to one salon's feed and returns the catch-up snapshot.
    pub fn subscribe(&self, salon_id: &str) -> (broadcast::Receiver<FeedFrame>, SalonSnapshot) {
        let mut salons = self.salons.write();
        let channel = salons
            .entry(salon_id.to_owned())
            .or_insert_with(|| SalonChannel::new(self.channel_capacity));
        let snapshot =
            SalonSnapshot { stats: channel.stats, capacity: channel.capacity.clone() };
        (channel.sender.subscribe(), snapshot)
    }

    /// Live subscriber count for one salon.
    #[must_use]
    pub fn subscriber_count(&self, salon_id: &str) -> usize {
        self.salons.read().get(salon_id).map_or(0, |channel| channel.sender.receiver_count())
    }

    /// Folds a booking update into the salon's stats and fans it out, followed
    /// by a stats frame.
    pub fn publish_update(&self, update: BookingUpdate) {
        let mut salons = self.salons.write();
        let channel = salons
            .entry(update.salon_id.clone())
            .or_insert_with(|| SalonChannel::new(self.channel_capacity));

        // Counters are per-day; roll them over on the first update of a new day.
        let day = update.timestamp.date_naive();
        if channel.stats_day != Some(day) {
            channel.stats = FeedStats::default();
            channel.stats_day = Some(day);
        }
        channel.stats.absorb(update.kind);

        let stats = channel.stats;
        channel.push(FeedFrame::BookingUpdate(update));
        channel.push(FeedFrame::Stats(stats));
    }

    /// Fans out a conflict notice.
    pub fn publish_conflict(&self, conflict: BookingConflict) {
        let mut salons = self.salons.write();
        let channel = salons
            .entry(conflict.salon_id.clone())
            .or_insert_with(|| SalonChannel::new(self.channel_capacity));
        channel.push(FeedFrame::Conflict(conflict));
    }

    /// Records the latest capacity snapshot and fans it out.
    pub fn publish_capacity(&self, capacity: CapacityInfo) {
        let mut salons = self.salons.write();
        let channel = salons
            .entry(capacity.salon_id.clone())
            .or_insert_with(|| SalonChannel::new(self.channel_capacity));
        channel.capacity = Some(capacity.clone());
        channel.push(FeedFrame::Capacity(capacity));
    }

    /// Bridges the platform event bus into this hub.
    ///
    /// Spawns one forwarder task per event type; the tasks end when the bus
    /// shuts down.
    ///
    /// # Errors
    /// Returns [`EventBusError`] if a bus channel was registered with an
    /// incompatible kind.
    pub fn attach(&self, bus: &EventBus) -> Result<(), EventBusError> {
        let mut updates = bus.subscribe::<BookingUpdate>()?;
        let hub = self.clone();
        tokio::spawn(async move {
            while let Some(update) = EventReceiverExt::recv(&mut updates).await {
                debug!(salon = %update.salon_id, "Forwarding booking update to feed");
                hub.publish_update((*update).clone());
            }
            info!("Booking update forwarder stopped");
        });

        let mut conflicts = bus.subscribe::<BookingConflict>()?;
        let hub = self.clone();
        tokio::spawn(async move {
            while let Some(conflict) = EventReceiverExt::recv(&mut conflicts).await {
                hub.publish_conflict((*conflict).clone());
            }
            info!("Conflict forwarder stopped");
        });

        let mut capacities = bus.subscribe::<CapacityInfo>()?;
        let hub = self.clone();
        tokio::spawn(async move {
            while let Some(capacity) = EventReceiverExt::recv(&mut capacities).await {
                hub.publish_capacity((*capacity).clone());
            }
            info!("Capacity forwarder stopped");
        });

        Ok(())
    }
}
