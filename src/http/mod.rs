//! HTTP surface: health endpoint and room upgrade routes

pub mod routes;

pub use routes::build_router;
