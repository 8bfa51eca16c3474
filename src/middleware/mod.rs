//! HTTP middleware.
//!
//! - **Client IP**: resolves the caller's IP once per request and stores it as
//!   a request extension
//!
//! Request IDs and request tracing come from `tower-http` and are wired up in
//! [`crate::routes`].

pub mod client_ip;

pub use client_ip::{ClientIp, ClientIpLayer, resolve_client_ip};
