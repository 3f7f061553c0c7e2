//! Address parsing and prefix matching.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Error type for address parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddrError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid prefix length: {0}")]
    InvalidPrefix(String),
}

pub type Result<T> = std::result::Result<T, AddrError>;

/// Parse an IP address from string.
pub fn parse_addr(s: &str) -> Result<IpAddr> {
    s.trim()
        .parse()
        .map_err(|_| AddrError::InvalidAddress(s.to_string()))
}

/// Parse an IP address with an optional prefix length (CIDR notation).
///
/// Returns `(address, prefix_length)`; the prefix length is `None` when the
/// string carries none. Range checking against the address family is left to
/// validation so the error can name the configuration attribute.
pub fn parse_prefix(s: &str) -> Result<(IpAddr, Option<u8>)> {
    match s.split_once('/') {
        Some((addr_str, prefix_str)) => {
            let addr = parse_addr(addr_str)?;
            let prefix: u8 = prefix_str
                .trim()
                .parse()
                .map_err(|_| AddrError::InvalidPrefix(prefix_str.to_string()))?;
            Ok((addr, Some(prefix)))
        }
        None => Ok((parse_addr(s)?, None)),
    }
}

/// Full host prefix length of the address family of `addr`.
pub fn max_prefix_len(addr: &IpAddr) -> u8 {
    if addr.is_ipv4() { 32 } else { 128 }
}

/// Format an IP address with prefix.
pub fn format_prefix(addr: &IpAddr, prefix: u8) -> String {
    format!("{}/{}", addr, prefix)
}

/// Check if an IPv4 address is in a given prefix.
pub fn ipv4_in_prefix(addr: Ipv4Addr, prefix_addr: Ipv4Addr, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    if prefix_len > 32 {
        return false;
    }

    let mask = !0u32 << (32 - prefix_len);
    let addr_bits = u32::from(addr);
    let prefix_bits = u32::from(prefix_addr);

    (addr_bits & mask) == (prefix_bits & mask)
}

/// Check if an IPv6 address is in a given prefix.
pub fn ipv6_in_prefix(addr: Ipv6Addr, prefix_addr: Ipv6Addr, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    if prefix_len > 128 {
        return false;
    }

    let addr_bits = u128::from(addr);
    let prefix_bits = u128::from(prefix_addr);
    let mask = !0u128 << (128 - prefix_len);

    (addr_bits & mask) == (prefix_bits & mask)
}

/// Check if `addr` falls in `prefix_addr/prefix_len`.
///
/// Addresses of different families never match.
pub fn in_prefix(addr: IpAddr, prefix_addr: IpAddr, prefix_len: u8) -> bool {
    match (addr, prefix_addr) {
        (IpAddr::V4(a), IpAddr::V4(p)) => ipv4_in_prefix(a, p, prefix_len),
        (IpAddr::V6(a), IpAddr::V6(p)) => ipv6_in_prefix(a, p, prefix_len),
        _ => false,
    }
}
