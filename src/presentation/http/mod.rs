//! HTTP API
//!
//! Health, metrics, sign-in and own-profile endpoints.

pub mod handlers;
pub mod routes;

pub use routes::create_router;
