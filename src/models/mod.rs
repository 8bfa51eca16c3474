//! Response models.

pub mod api;

pub use api::HealthResponse;
