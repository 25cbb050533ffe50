//! Facade crate for Bloom features and shared modules.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Add `bloom` with the desired feature flags (`server`/`client`).
//! - Call `bloom::init` (server) to register feature slices; extend as new slices appear.

use bloom_database::Database;
pub use bloom_domain as domain;
use bloom_domain::config::ApiConfig;
use bloom_event_bus::EventBus;
pub use bloom_kernel as kernel;

#[cfg(feature = "server")]
pub mod server {
    pub mod router {
        pub use bloom_booking::server::booking_router;
        pub use bloom_catalog::server::catalog_router;
        pub use bloom_feed::server::feed_router;
        pub use bloom_kernel::server::router::system_router;
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    pub use bloom_booking as booking;
    pub use bloom_catalog as catalog;
    pub use bloom_feed as feed;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        #[cfg(feature = "server")]
        "server",
        #[cfg(feature = "client")]
        "client",
        #[cfg(feature = "server")]
        "booking",
        #[cfg(feature = "server")]
        "catalog",
        #[cfg(feature = "server")]
        "feed",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Initialize all enabled features for server mode.
///
/// # Errors
/// Returns an error if any feature initialization fails.
#[cfg(feature = "server")]
pub fn init(
    config: &ApiConfig,
    database: &Database,
    events: &EventBus,
) -> Result<Vec<domain::registry::InitializedSlice>, Box<dyn std::error::Error>> {
    let mut slices = Vec::new();

    // Catalog (read side of the booking flows)
    slices.push(features::catalog::init(database)?);

    // Booking (availability + reservations)
    slices.push(features::booking::init(config, database, events)?);

    // Live feed (event fan-out)
    slices.push(features::feed::init(&config.feed, events)?);

    Ok(slices)
}
