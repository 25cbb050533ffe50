//! Live feed feature slice.
//!
//! The server side bridges booking events from the platform bus into
//! per-salon WebSocket fan-out ([`hub`], [`server`]); the client side keeps a
//! bounded local feed behind a reconnecting connection ([`client`]).

mod error;
pub mod frame;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "server")]
pub mod hub;
#[cfg(feature = "server")]
pub mod server;

pub use error::{FeedError, FeedErrorExt};
pub use frame::FeedFrame;

#[cfg(feature = "server")]
use bloom_event_bus::EventBus;
#[cfg(feature = "server")]
use bloom_kernel::domain::registry::InitializedSlice;

/// Live feed feature state.
#[cfg(feature = "server")]
#[bloom_derive::bloom_slice]
pub struct Feed {
    pub hub: hub::FeedHub,
}

/// Initialize the live feed feature: creates the hub and bridges the event
/// bus into it.
///
/// # Errors
/// Returns [`FeedError::Bridge`] if a bus channel was registered with an
/// incompatible kind.
#[cfg(feature = "server")]
pub fn init(
    config: &bloom_domain::config::FeedConfig,
    events: &EventBus,
) -> Result<InitializedSlice, FeedError> {
    let hub = hub::FeedHub::new(config.channel_capacity);
    hub.attach(events)?;

    tracing::info!("Live feed slice initialized");

    let slice = Feed::new(FeedInner { hub });
    Ok(InitializedSlice::new(slice))
}
