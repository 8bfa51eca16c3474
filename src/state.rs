//! Shared application state for Axum handlers.
//!
//! The configuration and the client IP policy are built once in `main` and
//! passed in explicitly; nothing here is a process-wide global.
//!
//! # Thread Safety
//!
//! Everything is immutable after construction and wrapped in `Arc`, so cloning
//! the state for each request is cheap and needs no locking.

use std::sync::Arc;
use std::time::Instant;

use crate::client_ip::ClientIpPolicy;
use crate::config::Config;

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Trust policy used to resolve client IPs
    pub policy: Arc<ClientIpPolicy>,
    /// Application start time for uptime calculation
    started_at: Instant,
}

impl AppState {
    /// Create application state, deriving the client IP policy from `config`.
    pub fn new(config: Config) -> Self {
        let policy = config.client_ip_policy();
        Self::with_policy(config, policy)
    }

    /// Create application state with an explicit client IP policy.
    pub fn with_policy(config: Config, policy: ClientIpPolicy) -> Self {
        Self {
            config: Arc::new(config),
            policy: Arc::new(policy),
            started_at: Instant::now(),
        }
    }

    /// Get application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
