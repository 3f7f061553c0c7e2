//! Common test utilities for integration tests.

use std::net::{Ipv4Addr, Ipv6Addr};

use diffserv::packet::{IpDatagram, Packet};

/// A UDP/IPv4 packet between two fixed hosts.
pub fn udp4(tos: u8, bytes: u32) -> Packet {
    IpDatagram::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 1, 1))
        .udp(40000, 5004)
        .tos(tos)
        .length(bytes)
        .into()
}

/// A TCP/IPv4 packet between two fixed hosts.
pub fn tcp4(tos: u8, bytes: u32) -> Packet {
    IpDatagram::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 1, 1))
        .tcp(40000, 443)
        .tos(tos)
        .length(bytes)
        .into()
}

/// A UDP/IPv6 packet between two documentation addresses.
pub fn udp6(traffic_class: u8, bytes: u32) -> Packet {
    let src: Ipv6Addr = "2001:db8::1".parse().unwrap();
    let dst: Ipv6Addr = "2001:db8::2".parse().unwrap();
    IpDatagram::new(src, dst)
        .udp(40000, 5004)
        .tos(traffic_class)
        .length(bytes)
        .into()
}
