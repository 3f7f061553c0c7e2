//! Name resolution for code points, colors and IP protocols.

/// Get the well-known name of a DSCP value.
pub fn dscp_name(dscp: u8) -> Option<&'static str> {
    match dscp {
        0x00 => Some("BE"),
        0x08 => Some("CS1"),
        0x0a => Some("AF11"),
        0x0c => Some("AF12"),
        0x0e => Some("AF13"),
        0x10 => Some("CS2"),
        0x12 => Some("AF21"),
        0x14 => Some("AF22"),
        0x16 => Some("AF23"),
        0x18 => Some("CS3"),
        0x1a => Some("AF31"),
        0x1c => Some("AF32"),
        0x1e => Some("AF33"),
        0x20 => Some("CS4"),
        0x22 => Some("AF41"),
        0x24 => Some("AF42"),
        0x26 => Some("AF43"),
        0x28 => Some("CS5"),
        0x2e => Some("EF"),
        0x30 => Some("CS6"),
        0x38 => Some("CS7"),
        _ => None,
    }
}

/// Get a DSCP value from its name (case-insensitive).
pub fn dscp_value(name: &str) -> Option<u8> {
    match name.to_ascii_uppercase().as_str() {
        "BE" | "CS0" => Some(0x00),
        "CS1" => Some(0x08),
        "AF11" => Some(0x0a),
        "AF12" => Some(0x0c),
        "AF13" => Some(0x0e),
        "CS2" => Some(0x10),
        "AF21" => Some(0x12),
        "AF22" => Some(0x14),
        "AF23" => Some(0x16),
        "CS3" => Some(0x18),
        "AF31" => Some(0x1a),
        "AF32" => Some(0x1c),
        "AF33" => Some(0x1e),
        "CS4" => Some(0x20),
        "AF41" => Some(0x22),
        "AF42" => Some(0x24),
        "AF43" => Some(0x26),
        "CS5" => Some(0x28),
        "EF" => Some(0x2e),
        "CS6" => Some(0x30),
        "CS7" => Some(0x38),
        _ => None,
    }
}

/// Get the name of a predefined conformance color.
pub fn color_name(color: u8) -> Option<&'static str> {
    match color {
        0 => Some("green"),
        1 => Some("yellow"),
        2 => Some("red"),
        _ => None,
    }
}

/// Get a color value from its name (case-insensitive).
pub fn color_value(name: &str) -> Option<u8> {
    match name.to_ascii_lowercase().as_str() {
        "green" => Some(0),
        "yellow" => Some(1),
        "red" => Some(2),
        _ => None,
    }
}

/// IP protocol number of UDP.
pub const IPPROTO_UDP: u8 = 17;

/// IP protocol number of TCP.
pub const IPPROTO_TCP: u8 = 6;

/// Get the name of an IP protocol.
pub fn protocol_name(id: u8) -> Option<&'static str> {
    match id {
        1 => Some("icmp"),
        2 => Some("igmp"),
        4 => Some("ipip"),
        6 => Some("tcp"),
        8 => Some("egp"),
        9 => Some("igp"),
        17 => Some("udp"),
        41 => Some("ipv6"),
        46 => Some("rsvp"),
        47 => Some("gre"),
        50 => Some("esp"),
        51 => Some("ah"),
        58 => Some("icmpv6"),
        89 => Some("ospf"),
        103 => Some("pim"),
        132 => Some("sctp"),
        _ => None,
    }
}

/// Get an IP protocol number from its name (case-insensitive).
pub fn protocol_id(name: &str) -> Option<u8> {
    match name.to_ascii_lowercase().as_str() {
        "icmp" => Some(1),
        "igmp" => Some(2),
        "ipip" => Some(4),
        "tcp" => Some(6),
        "egp" => Some(8),
        "igp" => Some(9),
        "udp" => Some(17),
        "ipv6" => Some(41),
        "rsvp" => Some(46),
        "gre" => Some(47),
        "esp" => Some(50),
        "ah" => Some(51),
        "icmpv6" => Some(58),
        "ospf" => Some(89),
        "pim" => Some(103),
        "sctp" => Some(132),
        _ => None,
    }
}
