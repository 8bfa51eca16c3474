//! The "what is my IP" endpoint.
//!
//! Served on `/` and on every path without a dedicated route.
//!
//! - `GET` responds with `{"ip": "<value>"}` followed by a newline
//! - any other method responds with `400 Bad Request`

use axum::Extension;
use axum::extract::State;
use axum::http::{Method, header};
use axum::response::{IntoResponse, Response};
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::middleware::ClientIp;
use crate::state::AppState;

/// Report the caller's IP address back to the caller.
///
/// With `STRICT_CLIENT_IP` enabled a resolved value that is not an IP address
/// is rejected with `400` instead of being echoed back, and a `host:port`
/// value is reported as its bare address.
#[instrument(skip_all, fields(method = %method))]
pub async fn my_ip(
    State(state): State<AppState>,
    method: Method,
    Extension(client_ip): Extension<ClientIp>,
) -> AppResult<Response> {
    if method != Method::GET {
        return Err(AppError::InvalidMethod(method));
    }

    let ip = if state.config.strict_client_ip {
        client_ip.validated?.to_string()
    } else {
        client_ip.ip
    };

    let body = render_ip_body(&ip)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Render the response body for `ip`.
///
/// The value is JSON-escaped, since it may come straight from a request header.
pub fn render_ip_body(ip: &str) -> AppResult<String> {
    Ok(format!("{{\"ip\": {}}}\n", serde_json::to_string(ip)?))
}
