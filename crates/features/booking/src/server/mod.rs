pub mod routes;

pub use routes::booking_router;
