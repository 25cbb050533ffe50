use std::borrow::Cow;

/// A specialized [`CatalogError`] enum of this crate.
#[bloom_derive::bloom_error]
pub enum CatalogError {
    /// The requested record does not exist or is inactive.
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A stored record failed to parse into its domain shape.
    #[error("Malformed record{}: {message}", format_context(.context))]
    Data { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Underlying database failures.
    #[cfg(feature = "server")]
    #[error("Catalog storage error{}: {source}", format_context(.context))]
    Storage {
        #[source]
        source: surrealdb::Error,
        context: Option<Cow<'static, str>>,
    },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal catalog error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
