//! Packets as seen by the conditioner.
//!
//! A [`Packet`] is a closed union over the supported address families. The
//! header fields that classifiers read are resolved once into a
//! [`HeaderView`], so filter predicates never probe the packet type again.
//!
//! # Example
//!
//! ```
//! use std::net::Ipv4Addr;
//! use diffserv::packet::{IpDatagram, Packet};
//!
//! let packet: Packet = IpDatagram::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
//!     .udp(5004, 5004)
//!     .tos(0x2e)
//!     .length(1200)
//!     .into();
//!
//! let header = packet.header().unwrap();
//! assert_eq!(header.dst_port, Some(5004));
//! assert_eq!(packet.size_bits(), 9600);
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::types::Dscp;
use crate::util::names::{IPPROTO_TCP, IPPROTO_UDP};
use crate::util::rate;

/// Address family of an IP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Get the family of an address.
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::Ipv4,
            IpAddr::V6(_) => Self::Ipv6,
        }
    }

    /// Get the family name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        }
    }
}

/// The transport segment carried by a datagram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transport {
    Udp { src_port: u16, dst_port: u16 },
    Tcp { src_port: u16, dst_port: u16 },
    /// Any other payload; ports are not available.
    #[default]
    Opaque,
}

impl Transport {
    /// Get `(src_port, dst_port)` for port-carrying transports.
    pub fn ports(&self) -> Option<(u16, u16)> {
        match *self {
            Self::Udp { src_port, dst_port } | Self::Tcp { src_port, dst_port } => {
                Some((src_port, dst_port))
            }
            Self::Opaque => None,
        }
    }
}

/// An IP datagram of either family.
///
/// `tos` is the IPv4 Type of Service byte or the IPv6 Traffic Class byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpDatagram<A> {
    pub src: A,
    pub dst: A,
    pub tos: u8,
    pub protocol: u8,
    /// Set for any fragment of a fragmented datagram.
    pub fragment: bool,
    pub byte_length: u32,
    pub transport: Transport,
}

impl<A: Copy + Into<IpAddr>> IpDatagram<A> {
    /// Create a datagram between two addresses.
    pub fn new(src: A, dst: A) -> Self {
        Self {
            src,
            dst,
            tos: 0,
            protocol: 0,
            fragment: false,
            byte_length: 0,
            transport: Transport::Opaque,
        }
    }

    /// Set the ToS / Traffic Class byte.
    pub fn tos(mut self, tos: u8) -> Self {
        self.tos = tos;
        self
    }

    /// Set the protocol number, with an opaque payload.
    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self.transport = Transport::Opaque;
        self
    }

    /// Carry a UDP segment.
    pub fn udp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.protocol = IPPROTO_UDP;
        self.transport = Transport::Udp { src_port, dst_port };
        self
    }

    /// Carry a TCP segment.
    pub fn tcp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.protocol = IPPROTO_TCP;
        self.transport = Transport::Tcp { src_port, dst_port };
        self
    }

    /// Set the total length in bytes.
    pub fn length(mut self, byte_length: u32) -> Self {
        self.byte_length = byte_length;
        self
    }

    /// Mark the datagram as a fragment.
    pub fn fragment(mut self, fragment: bool) -> Self {
        self.fragment = fragment;
        self
    }

    fn view(&self, family: AddressFamily) -> HeaderView {
        // Fragments are not reassembled, so their ports are unknown.
        let ports = if self.fragment {
            None
        } else {
            self.transport.ports()
        };
        HeaderView {
            family,
            src: self.src.into(),
            dst: self.dst.into(),
            tos: self.tos,
            protocol: self.protocol,
            src_port: ports.map(|(src, _)| src),
            dst_port: ports.map(|(_, dst)| dst),
        }
    }
}

/// A packet entering the conditioner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Ipv4(IpDatagram<Ipv4Addr>),
    Ipv6(IpDatagram<Ipv6Addr>),
    /// Any non-IP frame. It has no code point and is never re-marked.
    Other { byte_length: u32 },
}

impl Packet {
    /// Resolve the header fields classifiers read.
    ///
    /// Returns `None` for non-IP packets.
    pub fn header(&self) -> Option<HeaderView> {
        match self {
            Self::Ipv4(d) => Some(d.view(AddressFamily::Ipv4)),
            Self::Ipv6(d) => Some(d.view(AddressFamily::Ipv6)),
            Self::Other { .. } => None,
        }
    }

    /// Get the address family.
    pub fn family(&self) -> Option<AddressFamily> {
        match self {
            Self::Ipv4(_) => Some(AddressFamily::Ipv4),
            Self::Ipv6(_) => Some(AddressFamily::Ipv6),
            Self::Other { .. } => None,
        }
    }

    /// Get the length in bytes.
    pub fn byte_length(&self) -> u32 {
        match self {
            Self::Ipv4(d) => d.byte_length,
            Self::Ipv6(d) => d.byte_length,
            Self::Other { byte_length } => *byte_length,
        }
    }

    /// Get the length in bits, as consumed from token buckets.
    pub fn size_bits(&self) -> u64 {
        rate::bytes_to_bits(u64::from(self.byte_length()))
    }

    /// Get the code point carried in the header, if any.
    pub fn dscp(&self) -> Option<Dscp> {
        match self {
            Self::Ipv4(d) => Some(Dscp::from_tos(d.tos)),
            Self::Ipv6(d) => Some(Dscp::from_tos(d.tos)),
            Self::Other { .. } => None,
        }
    }

    /// Rewrite the code point bits of the ToS / Traffic Class byte.
    ///
    /// Does nothing for non-IP packets.
    pub fn set_dscp(&mut self, dscp: Dscp) {
        match self {
            Self::Ipv4(d) => d.tos = dscp.apply_to_tos(d.tos),
            Self::Ipv6(d) => d.tos = dscp.apply_to_tos(d.tos),
            Self::Other { .. } => {}
        }
    }
}

impl From<IpDatagram<Ipv4Addr>> for Packet {
    fn from(datagram: IpDatagram<Ipv4Addr>) -> Self {
        Self::Ipv4(datagram)
    }
}

impl From<IpDatagram<Ipv6Addr>> for Packet {
    fn from(datagram: IpDatagram<Ipv6Addr>) -> Self {
        Self::Ipv6(datagram)
    }
}

/// Header fields of an IP packet, resolved once per packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderView {
    pub family: AddressFamily,
    pub src: IpAddr,
    pub dst: IpAddr,
    /// Full ToS / Traffic Class byte.
    pub tos: u8,
    pub protocol: u8,
    /// `None` unless the datagram is an unfragmented UDP or TCP datagram.
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
}

impl HeaderView {
    /// Get the code point.
    pub fn dscp(&self) -> Dscp {
        Dscp::from_tos(self.tos)
    }
}
