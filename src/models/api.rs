use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process is serving
    pub status: String,
    /// Package version
    pub version: String,
    /// Seconds since startup
    pub uptime_seconds: u64,
    /// Time the response was generated
    pub timestamp: DateTime<Utc>,
}
