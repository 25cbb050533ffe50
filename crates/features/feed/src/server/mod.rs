pub mod ws;

pub use ws::feed_router;
