//! Client IP determination for requests that may have passed through proxies.
//!
//! This module has no HTTP or I/O dependencies. The HTTP layer collects the
//! `X-Forwarded-For` values, the remote address and the trusted header value
//! into a [`ResolutionRequest`] and asks a [`ClientIpPolicy`] for the answer.
//!
//! ```
//! use myip::client_ip::{ClientIpPolicy, ResolutionRequest, TrustedProxySet};
//!
//! let proxies = TrustedProxySet::parse("10.0.0.0/8, 192.168.0.0/16");
//! let policy = ClientIpPolicy::new(true, Some(proxies), None);
//!
//! let request = ResolutionRequest::new("10.0.0.7:51234")
//!     .with_forwarded_for(["203.0.113.9, 192.168.1.1"]);
//! assert_eq!(policy.resolve(&request).as_str(), "203.0.113.9");
//! ```
//!
//! See <https://adam-p.ca/blog/2022/03/x-forwarded-for/> for background on
//! why the chain is walked from the right.

mod error;
mod flatten;
mod resolver;
mod trusted_proxies;

pub use error::ClientIpError;
pub use flatten::flatten_delimited;
pub use resolver::{
    ClientIpPolicy, IpSource, ResolutionRequest, ResolvedIp, X_FORWARDED_FOR, XffTrust,
    split_host_port,
};
pub use trusted_proxies::{CidrRange, TrustedProxySet};
