use std::borrow::Cow;

/// A specialized [`FeedError`] enum of this crate.
#[bloom_derive::bloom_error]
pub enum FeedError {
    /// A frame failed to encode or decode.
    #[error("Frame codec error{}: {source}", format_context(.context))]
    Codec {
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },

    /// Event bus failures while bridging booking events into the feed.
    #[cfg(feature = "server")]
    #[error("Feed bridge error{}: {source}", format_context(.context))]
    Bridge {
        #[source]
        source: bloom_event_bus::EventBusError,
        context: Option<Cow<'static, str>>,
    },

    /// WebSocket transport failures on the client side.
    #[cfg(feature = "client")]
    #[error("Feed transport error{}: {source}", format_context(.context))]
    Transport {
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
        context: Option<Cow<'static, str>>,
    },

    /// The reconnect budget is exhausted.
    #[error("Feed disconnected{}: {message}", format_context(.context))]
    Disconnected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal feed error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
