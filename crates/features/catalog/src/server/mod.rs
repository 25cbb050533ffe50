pub mod routes;

pub use routes::catalog_router;
