//! Multi-field filter rules.
//!
//! A [`Filter`] is a set of optional header predicates plus the code point
//! assigned to packets that satisfy all of them.
//!
//! # Example
//!
//! ```
//! use std::net::{IpAddr, Ipv4Addr};
//! use diffserv::Dscp;
//! use diffserv::classifier::Filter;
//!
//! // Voice from 10.1.0.0/16 to UDP ports 16384-32767
//! let filter = Filter::new(Dscp::EF)
//!     .src(IpAddr::V4(Ipv4Addr::new(10, 1, 0, 0)), 16)
//!     .udp()
//!     .dst_port_range(16384, 32767);
//! assert!(!filter.is_wildcard());
//! ```

use std::net::IpAddr;

use crate::packet::{AddressFamily, HeaderView};
use crate::types::Dscp;
use crate::util::addr;
use crate::util::names::{IPPROTO_TCP, IPPROTO_UDP};
use crate::validation::{
    Validatable, ValidationResult, validate_dscp, validate_port_range, validate_prefix_len,
};

/// An address prefix predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressMatch {
    pub addr: IpAddr,
    pub prefix_len: u8,
}

impl AddressMatch {
    /// Create a prefix predicate.
    pub fn new(addr: IpAddr, prefix_len: u8) -> Self {
        Self { addr, prefix_len }
    }

    /// Match a single host address.
    pub fn host(addr: IpAddr) -> Self {
        Self {
            addr,
            prefix_len: addr::max_prefix_len(&addr),
        }
    }

    /// Get the address family of the predicate.
    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.addr)
    }

    /// Check an address against the prefix.
    ///
    /// Addresses of the other family never match.
    pub fn matches(&self, addr: IpAddr) -> bool {
        addr::in_prefix(addr, self.addr, self.prefix_len)
    }
}

impl std::fmt::Display for AddressMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&addr::format_prefix(&self.addr, self.prefix_len))
    }
}

/// A multi-field classifier rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Code point assigned on match.
    pub dscp: Dscp,
    pub src: Option<AddressMatch>,
    pub dst: Option<AddressMatch>,
    pub protocol: Option<u8>,
    pub tos: u8,
    /// Bits of the ToS / Traffic Class byte compared against `tos`.
    /// Zero disables the predicate.
    pub tos_mask: u8,
    /// Inclusive source port range.
    pub src_ports: Option<(u16, u16)>,
    /// Inclusive destination port range.
    pub dst_ports: Option<(u16, u16)>,
}

impl Filter {
    /// Create a filter that matches every IP packet.
    pub fn new(dscp: Dscp) -> Self {
        Self {
            dscp,
            src: None,
            dst: None,
            protocol: None,
            tos: 0,
            tos_mask: 0,
            src_ports: None,
            dst_ports: None,
        }
    }

    /// Match the source address prefix.
    pub fn src(mut self, addr: IpAddr, prefix_len: u8) -> Self {
        self.src = Some(AddressMatch::new(addr, prefix_len));
        self
    }

    /// Match the destination address prefix.
    pub fn dst(mut self, addr: IpAddr, prefix_len: u8) -> Self {
        self.dst = Some(AddressMatch::new(addr, prefix_len));
        self
    }

    /// Match the IP protocol number.
    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Match UDP.
    pub fn udp(self) -> Self {
        self.protocol(IPPROTO_UDP)
    }

    /// Match TCP.
    pub fn tcp(self) -> Self {
        self.protocol(IPPROTO_TCP)
    }

    /// Match `tos` under `mask`.
    pub fn tos(mut self, tos: u8, mask: u8) -> Self {
        self.tos = tos;
        self.tos_mask = mask;
        self
    }

    /// Match a single source port.
    pub fn src_port(self, port: u16) -> Self {
        self.src_port_range(port, port)
    }

    /// Match an inclusive source port range.
    pub fn src_port_range(mut self, min: u16, max: u16) -> Self {
        self.src_ports = Some((min, max));
        self
    }

    /// Match a single destination port.
    pub fn dst_port(self, port: u16) -> Self {
        self.dst_port_range(port, port)
    }

    /// Match an inclusive destination port range.
    pub fn dst_port_range(mut self, min: u16, max: u16) -> Self {
        self.dst_ports = Some((min, max));
        self
    }

    /// Check if the filter has no predicates at all.
    pub fn is_wildcard(&self) -> bool {
        self.src.is_none()
            && self.dst.is_none()
            && self.protocol.is_none()
            && self.tos_mask == 0
            && self.src_ports.is_none()
            && self.dst_ports.is_none()
    }

    /// Evaluate every predicate against a packet header.
    ///
    /// Port predicates fail when the header carries no ports.
    pub fn matches(&self, header: &HeaderView) -> bool {
        if let Some(src) = &self.src
            && !src.matches(header.src)
        {
            return false;
        }
        if let Some(dst) = &self.dst
            && !dst.matches(header.dst)
        {
            return false;
        }
        if let Some(protocol) = self.protocol
            && protocol != header.protocol
        {
            return false;
        }
        if self.tos_mask != 0 && (self.tos & self.tos_mask) != (header.tos & self.tos_mask) {
            return false;
        }
        if !port_in(self.src_ports, header.src_port) {
            return false;
        }
        if !port_in(self.dst_ports, header.dst_port) {
            return false;
        }
        true
    }
}

fn port_in(range: Option<(u16, u16)>, port: Option<u16>) -> bool {
    match (range, port) {
        (None, _) => true,
        (Some((min, max)), Some(port)) => (min..=max).contains(&port),
        (Some(_), None) => false,
    }
}

impl Validatable for Filter {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.merge(validate_dscp(self.dscp.value(), "dscp"));
        if let Some(src) = &self.src {
            result.merge(validate_prefix_len(&src.addr, src.prefix_len, "srcPrefixLength"));
        }
        if let Some(dst) = &self.dst {
            result.merge(validate_prefix_len(&dst.addr, dst.prefix_len, "destPrefixLength"));
        }
        if let Some((min, max)) = self.src_ports {
            result.merge(validate_port_range(min, max, "srcPort"));
        }
        if let Some((min, max)) = self.dst_ports {
            result.merge(validate_port_range(min, max, "destPort"));
        }

        if self.tos != 0 && self.tos_mask == 0 {
            result.add_warning("tos", "tos is ignored while tosMask is 0");
        }
        if (self.src_ports.is_some() || self.dst_ports.is_some())
            && self
                .protocol
                .is_some_and(|p| p != IPPROTO_UDP && p != IPPROTO_TCP)
        {
            result.add_warning(
                "protocol",
                "port ranges only match UDP and TCP; this filter can never match",
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{IpDatagram, Packet};
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn header(packet: impl Into<Packet>) -> HeaderView {
        packet.into().header().unwrap()
    }

    fn udp4(src: [u8; 4], sport: u16, dport: u16) -> HeaderView {
        header(IpDatagram::new(Ipv4Addr::from(src), Ipv4Addr::new(192, 0, 2, 9)).udp(sport, dport))
    }

    #[test]
    fn test_wildcard_matches_any_ip() {
        let filter = Filter::new(Dscp::BE);
        assert!(filter.is_wildcard());
        assert!(filter.matches(&udp4([10, 0, 0, 1], 1, 2)));
    }

    #[test]
    fn test_src_prefix() {
        let filter = Filter::new(Dscp::AF11).src(IpAddr::V4(Ipv4Addr::new(10, 1, 0, 0)), 16);
        assert!(filter.matches(&udp4([10, 1, 7, 7], 1, 2)));
        assert!(!filter.matches(&udp4([10, 2, 7, 7], 1, 2)));
    }

    #[test]
    fn test_address_family_must_match() {
        let filter = Filter::new(Dscp::AF11).dst(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0);
        assert!(!filter.matches(&udp4([10, 1, 7, 7], 1, 2)));

        let v6 = header(IpDatagram::new(Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST));
        assert!(filter.matches(&v6));
    }

    #[test]
    fn test_protocol_and_ports() {
        let filter = Filter::new(Dscp::EF).udp().dst_port_range(5000, 5010);
        assert!(filter.matches(&udp4([1, 1, 1, 1], 999, 5000)));
        assert!(filter.matches(&udp4([1, 1, 1, 1], 999, 5010)));
        assert!(!filter.matches(&udp4([1, 1, 1, 1], 999, 5011)));

        let tcp = header(
            IpDatagram::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST).tcp(999, 5005),
        );
        assert!(!filter.matches(&tcp));
    }

    #[test]
    fn test_unresolved_ports_do_not_match() {
        let filter = Filter::new(Dscp::EF).src_port(53);
        let fragment = header(
            IpDatagram::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
                .udp(53, 53)
                .fragment(true),
        );
        assert!(!filter.matches(&fragment));

        let gre = header(IpDatagram::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST).protocol(47));
        assert!(!filter.matches(&gre));
    }

    #[test]
    fn test_tos_mask() {
        let filter = Filter::new(Dscp::CS1).tos(0x20, 0xe0);
        let hit = header(IpDatagram::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST).tos(0x3f));
        let miss = header(IpDatagram::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST).tos(0x40));
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }

    #[test]
    fn test_validate() {
        assert!(Filter::new(Dscp::EF).is_valid());

        let bad_prefix = Filter::new(Dscp::EF).src(IpAddr::V4(Ipv4Addr::LOCALHOST), 33);
        let result = bad_prefix.validate();
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].field, "srcPrefixLength");

        let inverted = Filter::new(Dscp::EF).dst_port_range(10, 5);
        assert_eq!(inverted.validate().errors[0].field, "destPort");
    }

    #[test]
    fn test_validate_warnings() {
        let result = Filter::new(Dscp::EF).tos(0x2e, 0).validate();
        assert!(result.is_valid());
        assert!(result.has_warnings());

        let result = Filter::new(Dscp::EF).protocol(1).dst_port(80).validate();
        assert!(result.is_valid());
        assert_eq!(result.warnings[0].field, "protocol");
    }
}
