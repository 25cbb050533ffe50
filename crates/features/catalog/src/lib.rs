//! Catalog feature slice: salons, services, staff, and their weekly schedules.
//!
//! The availability engine reads from this slice; management beyond what
//! availability consumes stays with the hosted admin tooling.

mod error;
#[cfg(feature = "server")]
mod repo;
#[cfg(feature = "server")]
pub mod server;

pub use error::{CatalogError, CatalogErrorExt};
#[cfg(feature = "server")]
pub use repo::CatalogRepo;

#[cfg(feature = "server")]
use bloom_database::Database;
#[cfg(feature = "server")]
use bloom_kernel::domain::registry::InitializedSlice;

/// Catalog feature state.
#[cfg(feature = "server")]
#[bloom_derive::bloom_slice]
pub struct Catalog {
    pub repo: CatalogRepo,
}

/// Initialize the catalog feature.
///
/// # Errors
/// Currently infallible; kept fallible for parity with other slices.
#[cfg(feature = "server")]
pub fn init(db: &Database) -> Result<InitializedSlice, CatalogError> {
    tracing::info!("Catalog slice initialized");

    let inner = CatalogInner { repo: CatalogRepo::new(db.clone()) };

    let slice = Catalog::new(inner);
    Ok(InitializedSlice::new(slice))
}
