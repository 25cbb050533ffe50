//! Convenience re-exports for slice and app crates.

pub use crate::safe_nanoid;
pub use crate::security::resource::{ResourceGuard, ResourceGuardError};
#[cfg(feature = "server")]
pub use crate::server::{ApiState, ApiStateBuilder, ApiStateError};
pub use bloom_domain as domain;
