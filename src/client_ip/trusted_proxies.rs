//! Trusted proxy CIDR matching.
//!
//! A [`TrustedProxySet`] is parsed once at startup from a comma-separated list
//! such as `"10.0.0.0/8, 192.168.0.0/16, 127.0.0.1"` and is read-only afterwards,
//! so it can be shared across request tasks behind an `Arc` without locking.
//!
//! # Parsing Rules
//!
//! - Entries are trimmed; empty entries are ignored
//! - A bare address is a single-host range (`/32` for IPv4, `/128` for IPv6)
//! - A bare IPv6 entry is therefore `/128`, not `/32`: `2001:db8::1` trusts that
//!   one host, never the whole `2001:db8::/32` network
//! - Entries that fail to parse are skipped, never fatal
//!
//! # Membership
//!
//! [`TrustedProxySet::is_trusted`] is fail-closed: a candidate that does not
//! parse as an IP address is never trusted.

use std::fmt;
use std::net::IpAddr;

use tracing::debug;

/// Parsed CIDR network range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrRange {
    /// Network address, masked to `prefix_len`
    network: IpAddr,
    /// Prefix length (e.g., 24 for /24)
    prefix_len: u8,
}

impl CidrRange {
    /// Parse a CIDR notation string (e.g., "10.0.0.0/8" or "::1/128").
    ///
    /// A string without a `/` is treated as a single host. Returns `None` if the
    /// format is invalid or the prefix is too long for the address family.
    pub fn parse(cidr: &str) -> Option<Self> {
        let cidr = cidr.trim();

        let Some((addr, prefix)) = cidr.split_once('/') else {
            let ip: IpAddr = cidr.parse().ok()?;
            return Some(Self::host(ip));
        };

        // u8::from_str accepts a leading '+', CIDR notation does not
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let ip: IpAddr = addr.parse().ok()?;
        let prefix_len: u8 = prefix.parse().ok()?;

        if prefix_len > max_prefix(&ip) {
            return None;
        }

        Some(Self {
            network: mask(ip, prefix_len),
            prefix_len,
        })
    }

    /// Single-host range covering exactly `ip`.
    pub fn host(ip: IpAddr) -> Self {
        Self {
            network: ip,
            prefix_len: max_prefix(&ip),
        }
    }

    /// Network address of this range.
    pub fn network(&self) -> IpAddr {
        self.network
    }

    /// Prefix length of this range.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Check if an IP address is contained within this CIDR range.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are compared as IPv4.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        let ip = canonical(*ip);
        match (&self.network, &ip) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask(ip, self.prefix_len) == self.network
            }
            // IPv4 and IPv6 don't match
            _ => false,
        }
    }
}

impl fmt::Display for CidrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

fn max_prefix(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask(ip: IpAddr, prefix_len: u8) -> IpAddr {
    match ip {
        IpAddr::V4(addr) => {
            let bits = u32::MAX
                .checked_shl(32 - u32::from(prefix_len))
                .unwrap_or(0);
            IpAddr::V4((u32::from(addr) & bits).into())
        }
        IpAddr::V6(addr) => {
            let bits = u128::MAX
                .checked_shl(128 - u32::from(prefix_len))
                .unwrap_or(0);
            IpAddr::V6((u128::from(addr) & bits).into())
        }
    }
}

fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        v4 => v4,
    }
}

/// Set of trusted proxy networks.
///
/// Ranges keep their input order, which only matters for [`Display`](fmt::Display).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedProxySet {
    ranges: Vec<CidrRange>,
}

impl TrustedProxySet {
    /// Parse a comma-separated list of CIDR blocks or bare addresses.
    ///
    /// Invalid entries are skipped; this never fails. An input with no valid
    /// entries produces an empty set.
    pub fn parse(cidr_list: &str) -> Self {
        let ranges: Vec<CidrRange> = cidr_list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let parsed = CidrRange::parse(entry);
                if parsed.is_none() {
                    debug!(cidr = %entry, "Skipping unparseable trusted proxy entry");
                }
                parsed
            })
            .collect();

        Self { ranges }
    }

    /// Check if an IP address string falls inside any trusted range.
    ///
    /// Returns `false` for anything that does not parse as an IP address.
    pub fn is_trusted(&self, ip: &str) -> bool {
        let Ok(ip) = ip.parse::<IpAddr>() else {
            return false;
        };
        self.contains(&ip)
    }

    /// Check if a parsed IP address falls inside any trusted range.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(ip))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }
}

impl fmt::Display for TrustedProxySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{range}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cidr_parse_ipv4() {
        let cidr = CidrRange::parse("10.0.0.0/8").unwrap();
        assert_eq!(cidr.prefix_len(), 8);
        assert_eq!(cidr.network(), "10.0.0.0".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_cidr_parse_ipv6() {
        let cidr = CidrRange::parse("::1/128").unwrap();
        assert_eq!(cidr.prefix_len(), 128);
    }

    #[test]
    fn test_cidr_parse_single_ip() {
        assert_eq!(CidrRange::parse("192.168.1.1").unwrap().prefix_len(), 32);
        assert_eq!(CidrRange::parse("2001:db8::1").unwrap().prefix_len(), 128);
    }

    #[test]
    fn test_cidr_parse_masks_host_bits() {
        let cidr = CidrRange::parse("10.1.2.3/8").unwrap();
        assert_eq!(cidr.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_cidr_parse_invalid() {
        assert!(CidrRange::parse("not-an-ip").is_none());
        assert!(CidrRange::parse("10.0.0.0/33").is_none());
        assert!(CidrRange::parse("::/129").is_none());
        assert!(CidrRange::parse("10.0.0.0/").is_none());
        assert!(CidrRange::parse("10.0.0.0/+8").is_none());
        assert!(CidrRange::parse("10.0.0.0/8/8").is_none());
        assert!(CidrRange::parse("/8").is_none());
    }

    #[test]
    fn test_cidr_contains_ipv4() {
        let cidr = CidrRange::parse("10.0.0.0/8").unwrap();

        assert!(cidr.contains(&"10.0.0.1".parse().unwrap()));
        assert!(cidr.contains(&"10.255.255.255".parse().unwrap()));
        assert!(!cidr.contains(&"11.0.0.1".parse().unwrap()));
        assert!(!cidr.contains(&"192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_cidr_contains_ipv6() {
        let cidr = CidrRange::parse("2001:db8::/32").unwrap();

        assert!(cidr.contains(&"2001:db8::1".parse().unwrap()));
        assert!(!cidr.contains(&"2001:db9::1".parse().unwrap()));
        assert!(!cidr.contains(&"10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_cidr_zero_prefix_matches_family() {
        let cidr = CidrRange::parse("0.0.0.0/0").unwrap();

        assert!(cidr.contains(&"8.8.8.8".parse().unwrap()));
        assert!(!cidr.contains(&"::1".parse().unwrap()));
    }

    #[test]
    fn test_cidr_contains_ipv4_mapped() {
        let cidr = CidrRange::parse("10.0.0.0/8").unwrap();
        assert!(cidr.contains(&"::ffff:10.1.2.3".parse().unwrap()));
    }

    #[test]
    fn test_set_parse_skips_invalid_entries() {
        let set = TrustedProxySet::parse(" 10.0.0.0/8 , bogus,, 300.1.1.1/8, 192.168.0.0/16 ,");
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_string(), "[10.0.0.0/8, 192.168.0.0/16]");
    }

    #[test]
    fn test_set_empty() {
        let set = TrustedProxySet::parse("");
        assert!(set.is_empty());
        assert_eq!(set.to_string(), "[]");
        assert!(!set.is_trusted("10.0.0.1"));
    }

    #[test]
    fn test_set_is_trusted() {
        let set = TrustedProxySet::parse("10.0.0.0/8,192.168.0.0/16,127.0.0.1");

        assert!(set.is_trusted("10.0.1.1"));
        assert!(set.is_trusted("192.168.1.1"));
        assert!(set.is_trusted("127.0.0.1"));
        assert!(!set.is_trusted("127.0.0.2"));
        assert!(!set.is_trusted("8.8.8.8"));
    }

    #[test]
    fn test_set_is_trusted_fail_closed() {
        let set = TrustedProxySet::parse("0.0.0.0/0,::/0");

        assert!(!set.is_trusted(""));
        assert!(!set.is_trusted("unknown"));
        assert!(!set.is_trusted("10.0.0.1:8080"));
        assert!(!set.is_trusted(" 10.0.0.1"));
        assert!(!set.is_trusted("10.0.0.0/8"));
    }

    #[test]
    fn test_bare_address_equals_host_prefix() {
        assert_eq!(
            TrustedProxySet::parse("203.0.113.5"),
            TrustedProxySet::parse("203.0.113.5/32")
        );
    }
}
