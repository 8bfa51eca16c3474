//! Client IP resolution under a configurable trust policy.
//!
//! # Decision Order
//!
//! The first matching rule wins:
//!
//! 1. **Trusted header**: if a header name is configured and the request carries
//!    a non-blank value for it, that value (trimmed) is returned as-is.
//! 2. **X-Forwarded-For**: depending on [`XffTrust`]:
//!    - `Disabled`: skipped
//!    - `TrustAll`: the leftmost entry of the flattened chain
//!    - `ProxyFiltered`: walking right to left, the first entry that is not a
//!      trusted proxy
//! 3. **Remote address**: the host part of `host:port`, or the raw string when
//!    it has no extractable host.
//!
//! ```text
//!  X-Forwarded-For: client, proxy1, proxy2      remote_addr: proxy3:port
//!                   ◄──────────────────────── walk direction (ProxyFiltered)
//! ```
//!
//! Each hop appends the peer it saw, so trusted proxies form a suffix of the
//! chain nearest to this server. The rightmost untrusted entry is the most
//! reliable claim about the client.
//!
//! # Security
//!
//! Values taken from headers are **not validated**. With `TrustAll`, or with a
//! trusted header exposed to clients, the result can be any attacker-supplied
//! string. Callers that need an address should use [`ResolvedIp::validate`].

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use super::error::ClientIpError;
use super::flatten::flatten_delimited;
use super::trusted_proxies::TrustedProxySet;

/// Header conventionally carrying the proxy chain.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

const XFF_SEPARATOR: &str = ",";

/// How much the `X-Forwarded-For` chain is trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum XffTrust {
    /// Ignore `X-Forwarded-For`; use the remote address.
    #[default]
    Disabled,
    /// Trust the whole chain and take its leftmost entry.
    TrustAll,
    /// Skip entries inside these ranges, walking right to left.
    ProxyFiltered(TrustedProxySet),
}

impl XffTrust {
    /// Build the trust mode from the `trust_xff` flag and an optional proxy set.
    ///
    /// An empty proxy set counts as no set at all.
    pub fn from_flags(trust_xff: bool, trusted_proxies: Option<TrustedProxySet>) -> Self {
        match (trust_xff, trusted_proxies) {
            (false, _) => Self::Disabled,
            (true, Some(proxies)) if !proxies.is_empty() => Self::ProxyFiltered(proxies),
            (true, _) => Self::TrustAll,
        }
    }
}

impl fmt::Display for XffTrust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::TrustAll => f.write_str("trust_all"),
            Self::ProxyFiltered(proxies) => write!(f, "proxy_filtered {proxies}"),
        }
    }
}

/// Where a resolved IP came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpSource {
    TrustedHeader,
    ForwardedFor,
    RemoteAddr,
}

impl fmt::Display for IpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TrustedHeader => "trusted_header",
            Self::ForwardedFor => "x_forwarded_for",
            Self::RemoteAddr => "remote_addr",
        })
    }
}

/// Per-request inputs to resolution, borrowed from the request.
#[derive(Debug, Clone, Default)]
pub struct ResolutionRequest<'a> {
    /// Every `X-Forwarded-For` value, in the order they appear on the request
    pub forwarded_for: Vec<&'a str>,
    /// Peer address of the connection, usually `host:port`
    pub remote_addr: &'a str,
    /// Value of the configured trusted header, if present
    pub trusted_header_value: Option<&'a str>,
}

impl<'a> ResolutionRequest<'a> {
    pub fn new(remote_addr: &'a str) -> Self {
        Self {
            remote_addr,
            ..Self::default()
        }
    }

    /// Append `X-Forwarded-For` values.
    pub fn with_forwarded_for<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.forwarded_for.extend(values);
        self
    }

    pub fn with_trusted_header_value(mut self, value: &'a str) -> Self {
        self.trusted_header_value = Some(value);
        self
    }
}

/// Result of resolution: the chosen value and its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIp<'a> {
    value: &'a str,
    source: IpSource,
}

impl<'a> ResolvedIp<'a> {
    fn new(value: &'a str, source: IpSource) -> Self {
        Self { value, source }
    }

    pub fn as_str(&self) -> &'a str {
        self.value
    }

    pub fn source(&self) -> IpSource {
        self.source
    }

    /// Parse the resolved value as an IP address.
    ///
    /// Accepts a bare address or a socket address (`1.2.3.4:80`, `[::1]:80`),
    /// in which case the port is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ClientIpError::Unparseable`] for anything else.
    pub fn validate(&self) -> Result<IpAddr, ClientIpError> {
        self.value
            .parse::<IpAddr>()
            .or_else(|_| self.value.parse::<SocketAddr>().map(|addr| addr.ip()))
            .map_err(|_| ClientIpError::Unparseable {
                value: self.value.to_string(),
                source_kind: self.source,
            })
    }
}

impl fmt::Display for ResolvedIp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value)
    }
}

impl PartialEq<&str> for ResolvedIp<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.value == *other
    }
}

/// Trust policy for client IP resolution.
///
/// Built once from configuration and shared read-only across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIpPolicy {
    header_override: Option<String>,
    xff: XffTrust,
}

impl ClientIpPolicy {
    /// Create a policy from the raw configuration flags.
    ///
    /// An empty or blank `trusted_header` counts as not configured.
    pub fn new(
        trust_xff: bool,
        trusted_proxies: Option<TrustedProxySet>,
        trusted_header: Option<String>,
    ) -> Self {
        Self {
            header_override: trusted_header
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            xff: XffTrust::from_flags(trust_xff, trusted_proxies),
        }
    }

    /// Policy that only ever uses the remote address.
    pub fn remote_only() -> Self {
        Self::default()
    }

    /// Name of the header whose value is trusted absolutely, if any.
    pub fn trusted_header(&self) -> Option<&str> {
        self.header_override.as_deref()
    }

    pub fn xff_trust(&self) -> &XffTrust {
        &self.xff
    }

    /// Pick the client IP for one request. Never fails.
    pub fn resolve<'a>(&self, request: &ResolutionRequest<'a>) -> ResolvedIp<'a> {
        if self.header_override.is_some()
            && let Some(value) = request.trusted_header_value.map(str::trim)
            && !value.is_empty()
        {
            return ResolvedIp::new(value, IpSource::TrustedHeader);
        }

        if let Some(ip) = self.forwarded_candidate(&request.forwarded_for) {
            return ResolvedIp::new(ip, IpSource::ForwardedFor);
        }

        let remote = match split_host_port(request.remote_addr) {
            Some((host, _)) if !host.is_empty() => host,
            _ => request.remote_addr,
        };
        ResolvedIp::new(remote, IpSource::RemoteAddr)
    }

    fn forwarded_candidate<'a>(&self, values: &[&'a str]) -> Option<&'a str> {
        match &self.xff {
            XffTrust::Disabled => None,
            XffTrust::TrustAll => flatten_delimited(values.iter().copied(), XFF_SEPARATOR)
                .first()
                .copied(),
            XffTrust::ProxyFiltered(proxies) => {
                flatten_delimited(values.iter().copied(), XFF_SEPARATOR)
                    .into_iter()
                    .rev()
                    .find(|ip| !proxies.is_trusted(ip))
            }
        }
    }
}

/// Split `host:port` or `[host]:port` into its parts.
///
/// Returns `None` when there is no port, when an unbracketed host contains a
/// colon (a bare IPv6 address), or when brackets are misplaced. The port is
/// not checked to be numeric.
pub fn split_host_port(addr: &str) -> Option<(&str, &str)> {
    let (host, port) = match addr.strip_prefix('[') {
        Some(rest) => {
            let (host, after) = rest.split_once(']')?;
            (host, after.strip_prefix(':')?)
        }
        None => {
            let (host, port) = addr.rsplit_once(':')?;
            if host.contains(':') {
                return None;
            }
            (host, port)
        }
    };

    if host.contains(['[', ']']) || port.contains(['[', ']', ':']) {
        return None;
    }

    Some((host, port))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn trusted() -> TrustedProxySet {
        TrustedProxySet::parse("127.0.0.1/32,10.0.0.0/8,192.168.0.0/16")
    }

    fn filtered() -> ClientIpPolicy {
        ClientIpPolicy::new(true, Some(trusted()), None)
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("1.2.3.4:80"), Some(("1.2.3.4", "80")));
        assert_eq!(split_host_port("[::1]:8080"), Some(("::1", "8080")));
        assert_eq!(split_host_port("example.com:http"), Some(("example.com", "http")));
        assert_eq!(split_host_port(":80"), Some(("", "80")));
    }

    #[test]
    fn test_split_host_port_rejects() {
        assert_eq!(split_host_port("1.2.3.4"), None);
        assert_eq!(split_host_port("::1"), None);
        assert_eq!(split_host_port("[::1]"), None);
        assert_eq!(split_host_port("[::1]:80:90"), None);
        assert_eq!(split_host_port("[::1"), None);
        assert_eq!(split_host_port("a]:80"), None);
        assert_eq!(split_host_port(""), None);
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(XffTrust::from_flags(false, Some(trusted())), XffTrust::Disabled);
        assert_eq!(XffTrust::from_flags(true, None), XffTrust::TrustAll);
        assert_eq!(
            XffTrust::from_flags(true, Some(TrustedProxySet::parse("nope"))),
            XffTrust::TrustAll
        );
        assert_eq!(
            XffTrust::from_flags(true, Some(trusted())),
            XffTrust::ProxyFiltered(trusted())
        );
    }

    #[test]
    fn test_blank_trusted_header_is_unset() {
        let policy = ClientIpPolicy::new(false, None, Some("  ".to_string()));
        assert_eq!(policy.trusted_header(), None);
    }

    #[test]
    fn test_remote_addr_fallback() {
        let req = ResolutionRequest::new("8.8.8.8:1234");
        let ip = ClientIpPolicy::remote_only().resolve(&req);

        assert_eq!(ip, "8.8.8.8");
        assert_eq!(ip.source(), IpSource::RemoteAddr);
    }

    #[test]
    fn test_remote_addr_ipv6_bracketed() {
        let req = ResolutionRequest::new("[2001:db8::1]:443");
        assert_eq!(ClientIpPolicy::remote_only().resolve(&req), "2001:db8::1");
    }

    #[test]
    fn test_remote_addr_passthrough() {
        for raw in ["4.4.4.4", "::1", "garbage", "", ":80"] {
            let req = ResolutionRequest::new(raw);
            assert_eq!(ClientIpPolicy::remote_only().resolve(&req), raw);
        }
    }

    #[test]
    fn test_xff_ignored_when_disabled() {
        let req = ResolutionRequest::new("8.8.8.8:1234").with_forwarded_for(["1.1.1.1"]);
        let policy = ClientIpPolicy::new(false, Some(trusted()), None);

        assert_eq!(policy.resolve(&req), "8.8.8.8");
    }

    #[test]
    fn test_xff_rightmost_untrusted() {
        let req = ResolutionRequest::new("1.2.3.4:1234")
            .with_forwarded_for(["8.8.8.8, 10.0.1.1, 192.168.1.1"]);
        let ip = filtered().resolve(&req);

        assert_eq!(ip, "8.8.8.8");
        assert_eq!(ip.source(), IpSource::ForwardedFor);
    }

    #[test]
    fn test_xff_untrusted_in_middle_wins_over_leftmost() {
        let req = ResolutionRequest::new("10.0.0.9:1234")
            .with_forwarded_for(["6.6.6.6, 7.7.7.7, 10.0.1.1"]);

        assert_eq!(filtered().resolve(&req), "7.7.7.7");
    }

    #[test]
    fn test_xff_malformed_entry_is_untrusted() {
        let req = ResolutionRequest::new("10.0.0.9:1234")
            .with_forwarded_for(["1.1.1.1, unknown, 10.0.1.1"]);

        assert_eq!(filtered().resolve(&req), "unknown");
    }

    #[test]
    fn test_xff_all_trusted_falls_back() {
        let req = ResolutionRequest::new("9.9.9.9:1234")
            .with_forwarded_for(["10.0.1.1, 192.168.1.1, 127.0.0.1"]);

        assert_eq!(filtered().resolve(&req), "9.9.9.9");
    }

    #[test]
    fn test_xff_multiple_headers_concatenated() {
        let req = ResolutionRequest::new("3.3.3.3:1234")
            .with_forwarded_for(["1.1.1.1, 2.2.2.2", "10.0.0.2, 192.168.0.1"]);

        assert_eq!(filtered().resolve(&req), "2.2.2.2");
    }

    #[test]
    fn test_xff_trust_all_returns_leftmost() {
        let req = ResolutionRequest::new("3.3.3.3:1234").with_forwarded_for(["1.1.1.1, 2.2.2.2"]);
        let policy = ClientIpPolicy::new(true, None, None);

        assert_eq!(policy.resolve(&req), "1.1.1.1");
    }

    #[test]
    fn test_xff_blank_falls_back() {
        let req = ResolutionRequest::new("3.3.3.3:1234").with_forwarded_for([" ", ",,"]);

        assert_eq!(ClientIpPolicy::new(true, None, None).resolve(&req), "3.3.3.3");
        assert_eq!(filtered().resolve(&req), "3.3.3.3");
    }

    #[test]
    fn test_trusted_header_wins() {
        let req = ResolutionRequest::new("3.3.3.3:1234")
            .with_forwarded_for(["1.1.1.1"])
            .with_trusted_header_value(" 4.4.4.4 ");
        let policy = ClientIpPolicy::new(true, Some(trusted()), Some("X-Real-IP".to_string()));
        let ip = policy.resolve(&req);

        assert_eq!(ip, "4.4.4.4");
        assert_eq!(ip.source(), IpSource::TrustedHeader);
    }

    #[test]
    fn test_trusted_header_blank_value_ignored() {
        let req = ResolutionRequest::new("3.3.3.3:1234").with_trusted_header_value("   ");
        let policy = ClientIpPolicy::new(true, None, Some("X-Real-IP".to_string()));

        assert_eq!(policy.resolve(&req), "3.3.3.3");
    }

    #[test]
    fn test_header_value_ignored_without_configured_name() {
        let req = ResolutionRequest::new("3.3.3.3:1234").with_trusted_header_value("4.4.4.4");

        assert_eq!(ClientIpPolicy::remote_only().resolve(&req), "3.3.3.3");
    }

    #[test]
    fn test_validate() {
        let req = ResolutionRequest::new("[::1]:80");
        let ip = ClientIpPolicy::remote_only().resolve(&req);
        assert_eq!(ip.validate().unwrap(), "::1".parse::<IpAddr>().unwrap());

        let req = ResolutionRequest::new("1.2.3.4:80").with_forwarded_for(["5.6.7.8:9999"]);
        let ip = ClientIpPolicy::new(true, None, None).resolve(&req);
        assert_eq!(ip.validate().unwrap(), "5.6.7.8".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let req = ResolutionRequest::new("1.2.3.4:80").with_forwarded_for(["<script>"]);
        let ip = ClientIpPolicy::new(true, None, None).resolve(&req);

        let err = ip.validate().unwrap_err();
        assert!(matches!(
            err,
            ClientIpError::Unparseable { ref value, source_kind: IpSource::ForwardedFor } if value == "<script>"
        ));
    }
}
