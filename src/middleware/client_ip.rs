//! Client IP resolution middleware.
//!
//! [`ClientIpLayer`] resolves the client IP once per request using the
//! configured [`ClientIpPolicy`] and stores the result as a [`ClientIp`]
//! request extension for handlers to read.
//!
//! # Inputs Taken From the Request
//!
//! - every `X-Forwarded-For` header instance, in order
//! - the configured trusted header (first instance only)
//! - the peer socket address from axum's `ConnectInfo<SocketAddr>`
//!
//! Header values that are not valid UTF-8 are ignored. Requests served without
//! connection info resolve against an empty remote address.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! With `TRUST_XFF` enabled and no `TRUSTED_PROXIES`, the client controls the
//! result completely. Only run that way behind a proxy that overwrites
//! `X-Forwarded-For`:
//!
//! ```nginx
//! proxy_set_header X-Forwarded-For $remote_addr;
//! ```

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::client_ip::{
    ClientIpError, ClientIpPolicy, IpSource, ResolutionRequest, X_FORWARDED_FOR,
};

/// Client IP resolved for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp {
    /// Resolved value, exactly as it will be reported
    pub ip: String,
    /// Which rule produced the value
    pub source: IpSource,
    /// Outcome of strict validation of `ip`
    pub validated: Result<IpAddr, ClientIpError>,
}

/// Client IP layer for Tower middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let layer = ClientIpLayer::new(Arc::new(config.client_ip_policy()));
/// let app = Router::new()
///     .route("/", get(handler))
///     .layer(layer);
/// ```
#[derive(Clone)]
pub struct ClientIpLayer {
    policy: Arc<ClientIpPolicy>,
    trusted_header: Option<HeaderName>,
}

impl ClientIpLayer {
    /// Create a new client IP layer for `policy`.
    pub fn new(policy: Arc<ClientIpPolicy>) -> Self {
        let trusted_header = policy.trusted_header().and_then(|name| {
            let parsed = HeaderName::from_bytes(name.as_bytes()).ok();
            if parsed.is_none() {
                warn!(header = %name, "Trusted header name is invalid, it will never match");
            }
            parsed
        });

        Self {
            policy,
            trusted_header,
        }
    }
}

impl<S> Layer<S> for ClientIpLayer {
    type Service = ClientIpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientIpService {
            inner,
            policy: Arc::clone(&self.policy),
            trusted_header: self.trusted_header.clone(),
        }
    }
}

/// Client IP service wrapper.
#[derive(Clone)]
pub struct ClientIpService<S> {
    inner: S,
    policy: Arc<ClientIpPolicy>,
    trusted_header: Option<HeaderName>,
}

impl<S, B> Service<Request<B>> for ClientIpService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let client_ip = resolve_client_ip(&req, &self.policy, self.trusted_header.as_ref());
        req.extensions_mut().insert(client_ip);
        self.inner.call(req)
    }
}

/// Resolve the client IP of `req` under `policy`.
pub fn resolve_client_ip<B>(
    req: &Request<B>,
    policy: &ClientIpPolicy,
    trusted_header: Option<&HeaderName>,
) -> ClientIp {
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    let headers = req.headers();
    let forwarded_for = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok());

    let mut request = ResolutionRequest::new(&remote_addr).with_forwarded_for(forwarded_for);
    if let Some(name) = trusted_header
        && let Some(value) = headers.get(name).and_then(|v| v.to_str().ok())
    {
        request = request.with_trusted_header_value(value);
    }

    let resolved = policy.resolve(&request);
    debug!(
        client_ip = %resolved,
        source = %resolved.source(),
        remote_addr = %remote_addr,
        "Resolved client IP"
    );

    ClientIp {
        ip: resolved.as_str().to_string(),
        source: resolved.source(),
        validated: resolved.validate(),
    }
}
