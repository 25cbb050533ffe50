//! Booking feature slice: slot generation, overlap detection, policy windows,
//! and the reservation lifecycle.
//!
//! The pure interval logic lives in [`slots`] and [`policy`]; the server-gated
//! modules wire it to the catalog, the appointment store, and the event bus.

mod error;
pub mod policy;
pub mod slots;

#[cfg(feature = "server")]
pub mod availability;
#[cfg(feature = "server")]
mod repo;
#[cfg(feature = "server")]
pub mod reservations;
#[cfg(feature = "server")]
pub mod server;

pub use error::{BookingError, BookingErrorExt};
#[cfg(feature = "server")]
pub use repo::{AppointmentRepo, BookingFilter};

#[cfg(feature = "server")]
use bloom_catalog::CatalogRepo;
#[cfg(feature = "server")]
use bloom_database::Database;
#[cfg(feature = "server")]
use bloom_domain::config::ApiConfig;
#[cfg(feature = "server")]
use bloom_event_bus::EventBus;
#[cfg(feature = "server")]
use bloom_kernel::domain::registry::InitializedSlice;

/// Booking feature state.
#[cfg(feature = "server")]
#[bloom_derive::bloom_slice]
pub struct Booking {
    pub service: reservations::BookingService,
}

/// Initialize the booking feature.
///
/// # Errors
/// Currently infallible; kept fallible for parity with other slices.
#[cfg(feature = "server")]
pub fn init(
    config: &ApiConfig,
    db: &Database,
    events: &EventBus,
) -> Result<InitializedSlice, BookingError> {
    tracing::info!("Booking slice initialized");

    let catalog = CatalogRepo::new(db.clone());
    let repo = AppointmentRepo::new(db.clone());
    let availability = availability::AvailabilityEngine::new(
        catalog.clone(),
        repo.clone(),
        config.booking.clone(),
    );
    let service = reservations::BookingService::new(
        repo,
        catalog,
        availability,
        events.clone(),
        &config.booking,
    );

    let slice = Booking::new(BookingInner { service });
    Ok(InitializedSlice::new(slice))
}
