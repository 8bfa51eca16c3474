//! # myip
//!
//! An HTTP endpoint that reports the caller's IP address back to the caller,
//! handling `X-Forwarded-For` from proxies without trusting more than it should.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → Client IP)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (my_ip, health)                                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  client_ip (TrustedProxySet, flatten, ClientIpPolicy)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`client_ip`] module is the core and has no HTTP dependencies; the rest
//! is the shell that feeds it request data.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//!
//! use myip::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
//!     let app = build_router(AppState::new(config));
//!
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<SocketAddr>(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Running Behind a Proxy
//!
//! ```bash
//! TRUST_XFF=true TRUSTED_PROXIES=10.0.0.0/8,127.0.0.1 cargo run
//! ```

pub mod client_ip;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

// Re-exports for convenience
pub use client_ip::{ClientIpPolicy, TrustedProxySet};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::AppState;
