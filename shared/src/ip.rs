//! Upstream IP validation
//!
//! Normalizes caller input to a canonical textual form and rejects addresses
//! that no intelligence provider can say anything useful about. The lookup
//! core trusts whatever passes this check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::errors::{SharedError, SharedResult};

/// A validated, publicly routable IP address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedIp(IpAddr);

impl NormalizedIp {
    pub fn addr(&self) -> IpAddr {
        self.0
    }

    pub fn is_ipv4(&self) -> bool {
        self.0.is_ipv4()
    }
}

impl fmt::Display for NormalizedIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse, canonicalize and range-check an IP address
pub fn normalize_ip(input: &str) -> SharedResult<NormalizedIp> {
    let trimmed = input.trim().trim_start_matches('[').trim_end_matches(']');
    let parsed: IpAddr = trimmed.parse().map_err(|_| SharedError::InvalidIp {
        input: input.to_string(),
    })?;

    // IPv4-mapped IPv6 (::ffff:a.b.c.d) is looked up as plain IPv4
    let addr = match parsed {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    };

    let reserved = match addr {
        IpAddr::V4(v4) => reserved_v4_range(v4),
        IpAddr::V6(v6) => reserved_v6_range(v6),
    };

    match reserved {
        Some(range) => Err(SharedError::ReservedIp {
            ip: addr.to_string(),
            range: range.to_string(),
        }),
        None => Ok(NormalizedIp(addr)),
    }
}

fn reserved_v4_range(ip: Ipv4Addr) -> Option<&'static str> {
    let [a, b, _, _] = ip.octets();
    if ip.is_unspecified() || a == 0 {
        Some("this network")
    } else if ip.is_loopback() {
        Some("loopback")
    } else if ip.is_private() {
        Some("private")
    } else if ip.is_link_local() {
        Some("link-local")
    } else if a == 100 && (64..128).contains(&b) {
        Some("shared address space")
    } else if ip.is_documentation() {
        Some("documentation")
    } else if a == 198 && (b == 18 || b == 19) {
        Some("benchmarking")
    } else if ip.is_multicast() {
        Some("multicast")
    } else if ip.is_broadcast() {
        Some("broadcast")
    } else if a >= 240 {
        Some("reserved")
    } else {
        None
    }
}

fn reserved_v6_range(ip: Ipv6Addr) -> Option<&'static str> {
    let segments = ip.segments();
    if ip.is_unspecified() {
        Some("unspecified")
    } else if ip.is_loopback() {
        Some("loopback")
    } else if ip.is_multicast() {
        Some("multicast")
    } else if (segments[0] & 0xfe00) == 0xfc00 {
        Some("unique local")
    } else if (segments[0] & 0xffc0) == 0xfe80 {
        Some("link-local")
    } else if segments[0] == 0x2001 && segments[1] == 0x0db8 {
        Some("documentation")
    } else {
        None
    }
}
