use std::borrow::Cow;

/// A specialized [`BookingError`] enum of this crate.
#[bloom_derive::bloom_error]
pub enum BookingError {
    /// Malformed or incomplete request parameters.
    #[error("Validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The appointment (or a referenced record) does not exist.
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The caller does not own the appointment.
    #[error("Forbidden{}: {message}", format_context(.context))]
    Forbidden { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The requested interval is not bookable.
    #[error("Slot unavailable{}: {message}", format_context(.context))]
    SlotUnavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The cancellation/reschedule window has closed or the status forbids changes.
    #[error("Policy violation{}: {message}", format_context(.context))]
    Policy { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Catalog lookups that the booking flow depends on.
    #[cfg(feature = "server")]
    #[error("Catalog error{}: {source}", format_context(.context))]
    Catalog {
        #[source]
        source: bloom_catalog::CatalogError,
        context: Option<Cow<'static, str>>,
    },

    /// Underlying database failures.
    #[cfg(feature = "server")]
    #[error("Booking storage error{}: {source}", format_context(.context))]
    Storage {
        #[source]
        source: surrealdb::Error,
        context: Option<Cow<'static, str>>,
    },

    /// Event bus failures while publishing booking updates.
    #[cfg(feature = "server")]
    #[error("Event publication error{}: {source}", format_context(.context))]
    Events {
        #[source]
        source: bloom_event_bus::EventBusError,
        context: Option<Cow<'static, str>>,
    },

    /// A stored record failed to parse into its domain shape.
    #[error("Malformed record{}: {message}", format_context(.context))]
    Data { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal booking error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
