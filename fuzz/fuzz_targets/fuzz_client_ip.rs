//! Fuzz testing for client IP resolution.
//!
//! Everything in the client IP core must accept arbitrary input without
//! panicking: proxy lists come from configuration, header values and remote
//! addresses come from the network.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_client_ip
//! cargo +nightly fuzz run fuzz_client_ip -- -max_total_time=60
//! ```
//!
//! # Input Layout
//!
//! The input is split on `\n` into: proxy list, remote address, trusted header
//! value, then any number of `X-Forwarded-For` values.

#![no_main]

use libfuzzer_sys::fuzz_target;
use myip::client_ip::{
    ClientIpPolicy, ResolutionRequest, TrustedProxySet, flatten_delimited, split_host_port,
};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    let mut parts = s.split('\n');
    let proxies = parts.next().unwrap_or_default();
    let remote = parts.next().unwrap_or_default();
    let header = parts.next().unwrap_or_default();
    let forwarded: Vec<&str> = parts.collect();

    let set = TrustedProxySet::parse(proxies);
    let _ = set.to_string();
    let _ = set.is_trusted(remote);
    let _ = split_host_port(remote);

    // Flattening must be idempotent for the separator it was split on
    let once = flatten_delimited(forwarded.iter().copied(), ",");
    let twice = flatten_delimited(once.iter().copied(), ",");
    assert_eq!(once, twice);
    let _ = flatten_delimited(forwarded.iter().copied(), "");

    for trust_xff in [false, true] {
        let policy = ClientIpPolicy::new(trust_xff, Some(set.clone()), Some("x-real-ip".into()));
        let request = ResolutionRequest::new(remote)
            .with_forwarded_for(forwarded.iter().copied())
            .with_trusted_header_value(header);
        let resolved = policy.resolve(&request);
        let _ = resolved.validate();
    }
});
