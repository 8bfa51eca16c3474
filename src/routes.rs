//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (applied in order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Sets X-Request-Id if missing, echoes it on the response
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │    Client IP     │ ← Resolves the caller's IP into a request extension
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Routes
//!
//! - `/health` - Liveness check
//! - `/` and every other path - Report the caller's IP

use std::sync::Arc;

use axum::Router;
use axum::routing::{any, get};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::ClientIpLayer;
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// The router expects to be served with
/// `into_make_service_with_connect_info::<SocketAddr>()` so the peer address is
/// available; without it the remote address resolves to an empty string.
pub fn build_router(state: AppState) -> Router {
    info!(
        xff = %state.policy.xff_trust(),
        trusted_header = state.policy.trusted_header().unwrap_or("<none>"),
        strict = state.config.strict_client_ip,
        "Client IP policy configured"
    );

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/", any(handlers::my_ip))
        .fallback(handlers::my_ip)
        // Applied bottom to top: the last layer added runs first
        .layer(ClientIpLayer::new(Arc::clone(&state.policy)))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
