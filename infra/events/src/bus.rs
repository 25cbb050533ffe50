use crate::error::EventBusError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::trace;

/// A safe default for channel buffers.
/// 128 is usually enough for domain events in a vertical slice.
const DEFAULT_CAPACITY: usize = 128;

/// Supported channel kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Broadcast (fan-out) semantics.
    Broadcast { capacity: usize },
    /// Watch (latest-value) semantics.
    Watch,
}

impl ChannelKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Broadcast { .. } => "broadcast",
            Self::Watch => "watch",
        }
    }
}

/// Marker trait for types that can be sent across the [`EventBus`].
///
/// Any type that is `Send + Sync + 'static` automatically implements this trait.
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

#[derive(Debug)]
struct ChannelEntry {
    kind: ChannelKind,
    sender: Box<dyn Any + Send + Sync>,
}

/// A thread-safe event bus with channels indexed by the [`TypeId`] of the event.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    channels: Arc<RwLock<FxHashMap<TypeId, ChannelEntry>>>,
}

impl EventBus {
    /// Creates a new, empty `EventBus`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to an event of type `T` using broadcast with default capacity.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a watch channel
    /// was already registered for `T`.
    ///
    /// # Examples
    /// ```rust
    /// use bloom_event_bus::{EventBus, EventReceiverExt};
    ///
    /// #[derive(Clone, Debug, PartialEq)]
    /// struct BookingCreated(u64);
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), bloom_event_bus::EventBusError> {
    /// let bus = EventBus::new();
    /// let mut rx = bus.subscribe::<BookingCreated>()?;
    /// bus.publish(BookingCreated(1))?;
    /// assert_eq!(rx.recv().await.unwrap().0, 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe<T: Event>(&self) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        self.subscribe_with_capacity::<T>(DEFAULT_CAPACITY)
    }

    /// Subscribes to an event of type `T` with a specific broadcast buffer capacity.
    ///
    /// Slow subscribers skip to the tail of the buffer instead of blocking
    /// publishers; see [`crate::EventReceiverExt::recv`].
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a watch channel was
    /// already registered for `T`, or [`EventBusError::InvalidCapacity`] if
    /// `capacity` is zero.
    pub fn subscribe_with_capacity<T: Event>(
        &self,
        capacity: usize,
    ) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        if capacity == 0 {
            return Err(EventBusError::InvalidCapacity {
                message: "capacity must be >= 1".into(),
                context: Some(std::any::type_name::<T>().into()),
            });
        }
        self.broadcast_sender::<T>(capacity).map(|tx| tx.subscribe())
    }

    /// Subscribe to a watch channel (latest-value semantics). Initializes with the provided value if absent.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a broadcast channel
    /// was already registered for `T`.
    ///
    /// # Examples
    /// ```rust
    /// use bloom_event_bus::EventBus;
    ///
    /// #[derive(Clone, Debug, PartialEq)]
    /// struct Snapshot(u64);
    ///
    /// # fn main() -> Result<(), bloom_event_bus::EventBusError> {
    /// let bus = EventBus::new();
    /// let _rx = bus.subscribe_watch::<Snapshot>(Snapshot(0))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe_watch<T: Event>(
        &self,
        initial: T,
    ) -> Result<watch::Receiver<Arc<T>>, EventBusError> {
        self.watch_sender::<T>(Arc::new(initial)).map(|tx| tx.subscribe())
    }

    /// Publishes a shared event instance via broadcast.
    ///
    /// Returns the number of subscribers that observed the event; an event with
    /// no active subscribers is dropped silently.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a watch channel
    /// was already registered for `T`.
    pub fn publish<T: Event>(&self, event: T) -> Result<usize, EventBusError> {
        self.publish_arc(Arc::new(event))
    }

    /// Publishes a shared event instance via broadcast without re-wrapping.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a watch channel
    /// was already registered for `T`.
    pub fn publish_arc<T: Event>(&self, event: Arc<T>) -> Result<usize, EventBusError> {
        let sender = self.broadcast_sender::<T>(DEFAULT_CAPACITY)?;
        sender.send(event).map_or_else(
            |_| {
                trace!(event = std::any::type_name::<T>(), "Event dropped: no active subscribers");
                Ok(0)
            },
            |count| {
                trace!(event = std::any::type_name::<T>(), count, "Event dispatched");
                Ok(count)
            },
        )
    }

    /// Publishes to a watch channel (latest-value semantics). Creates a channel if missing.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a broadcast channel
    /// was already registered for `T`.
    pub fn publish_watch<T: Event>(&self, event: T) -> Result<(), EventBusError> {
        self.publish_watch_arc(Arc::new(event))
    }

    /// Publishes to a watch channel without re-wrapping. Creates a channel if missing.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a broadcast channel
    /// was already registered for `T`.
    pub fn publish_watch_arc<T: Event>(&self, event: Arc<T>) -> Result<(), EventBusError> {
        let sender = self.watch_sender::<T>(event.clone())?;
        sender.send_replace(event);
        Ok(())
    }

    /// Gracefully shuts down the bus by dropping all underlying channels.
    ///
    /// Returns the number of event channels that were closed.
    #[must_use]
    pub fn shutdown(&self) -> usize {
        let mut channels = self.channels.write();
        let count = channels.len();
        channels.clear();
        count
    }

    fn broadcast_sender<T: Event>(
        &self,
        capacity: usize,
    ) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
        let mut channels = self.channels.write();
        let entry = channels.entry(TypeId::of::<T>()).or_insert_with(|| {
            trace!(event = std::any::type_name::<T>(), capacity, "Initializing broadcast channel");
            let (tx, _) = broadcast::channel::<Arc<T>>(capacity);
            ChannelEntry { kind: ChannelKind::Broadcast { capacity }, sender: Box::new(tx) }
        });
        match entry.kind {
            ChannelKind::Broadcast { .. } => downcast_sender(entry),
            ChannelKind::Watch => Err(kind_mismatch::<T>("broadcast", entry.kind)),
        }
    }

    fn watch_sender<T: Event>(
        &self,
        initial: Arc<T>,
    ) -> Result<watch::Sender<Arc<T>>, EventBusError> {
        let mut channels = self.channels.write();
        let entry = channels.entry(TypeId::of::<T>()).or_insert_with(|| {
            trace!(event = std::any::type_name::<T>(), "Initializing watch channel");
            let (tx, _) = watch::channel::<Arc<T>>(initial);
            ChannelEntry { kind: ChannelKind::Watch, sender: Box::new(tx) }
        });
        match entry.kind {
            ChannelKind::Watch => downcast_sender(entry),
            ChannelKind::Broadcast { .. } => Err(kind_mismatch::<T>("watch", entry.kind)),
        }
    }
}

fn downcast_sender<S: Clone + 'static>(entry: &ChannelEntry) -> Result<S, EventBusError> {
    entry.sender.downcast_ref::<S>().cloned().ok_or_else(|| EventBusError::TypeMismatch {
        message: std::any::type_name::<S>().into(),
        context: Some("Unexpected event type".into()),
    })
}

fn kind_mismatch<T: Event>(requested: &str, found: ChannelKind) -> EventBusError {
    EventBusError::ChannelKindMismatch {
        message: format!(
            "Expected {requested} but found {} for {}",
            found.label(),
            std::any::type_name::<T>()
        )
        .into(),
        context: None,
    }
}
