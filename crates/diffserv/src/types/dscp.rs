//! Differentiated Services Code Point.
//!
//! The code point occupies the low 6 bits of the IPv4 Type of Service byte
//! and of the IPv6 Traffic Class byte.

use std::fmt;
use std::str::FromStr;

use crate::util::names;
use crate::util::parse::{self, ParseError};

/// Number of distinct code points.
pub const DSCP_MAX: usize = 64;

/// Bits of the ToS / Traffic Class byte that hold the code point.
pub const DSCP_MASK: u8 = 0x3f;

/// A code point in `0..64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dscp(u8);

impl Dscp {
    /// Best effort.
    pub const BE: Dscp = Dscp(0x00);
    pub const CS1: Dscp = Dscp(0x08);
    pub const CS2: Dscp = Dscp(0x10);
    pub const CS3: Dscp = Dscp(0x18);
    pub const CS4: Dscp = Dscp(0x20);
    pub const CS5: Dscp = Dscp(0x28);
    pub const CS6: Dscp = Dscp(0x30);
    pub const CS7: Dscp = Dscp(0x38);
    pub const AF11: Dscp = Dscp(0x0a);
    pub const AF12: Dscp = Dscp(0x0c);
    pub const AF13: Dscp = Dscp(0x0e);
    pub const AF21: Dscp = Dscp(0x12);
    pub const AF22: Dscp = Dscp(0x14);
    pub const AF23: Dscp = Dscp(0x16);
    pub const AF31: Dscp = Dscp(0x1a);
    pub const AF32: Dscp = Dscp(0x1c);
    pub const AF33: Dscp = Dscp(0x1e);
    pub const AF41: Dscp = Dscp(0x22);
    pub const AF42: Dscp = Dscp(0x24);
    pub const AF43: Dscp = Dscp(0x26);
    /// Expedited forwarding.
    pub const EF: Dscp = Dscp(0x2e);

    /// Create a code point, or `None` if `value` is 64 or more.
    pub const fn new(value: u8) -> Option<Self> {
        if (value as usize) < DSCP_MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Extract the code point from a ToS / Traffic Class byte.
    pub const fn from_tos(tos: u8) -> Self {
        Self(tos & DSCP_MASK)
    }

    /// Replace the code point bits of a ToS / Traffic Class byte.
    ///
    /// The two upper bits of `tos` are preserved.
    pub const fn apply_to_tos(self, tos: u8) -> u8 {
        (tos & !DSCP_MASK) | self.0
    }

    /// Get the numeric value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Index into per-code-point tables.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Well-known name, if any.
    pub fn name(self) -> Option<&'static str> {
        names::dscp_name(self.0)
    }

    /// Iterate over all 64 code points.
    pub fn all() -> impl Iterator<Item = Dscp> {
        (0..DSCP_MAX as u8).map(Dscp)
    }
}

impl TryFrom<u8> for Dscp {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| ParseError::OutOfRange(format!("DSCP {}", value)))
    }
}

impl From<Dscp> for u8 {
    fn from(dscp: Dscp) -> u8 {
        dscp.0
    }
}

/// Parse a code point from a name (`EF`, `af11`) or an integer in any
/// supported radix.
impl FromStr for Dscp {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(value) = names::dscp_value(s) {
            return Ok(Self(value));
        }
        if !s.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(ParseError::UnknownName(s.to_string()));
        }
        let value = parse::get_u64(s)?;
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ParseError::OutOfRange(format!("DSCP {} (must be 0-63)", s)))
    }
}

impl fmt::Display for Dscp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Parse a space separated list of code points; `*` selects all of them.
pub fn parse_dscp_list(s: &str) -> Result<Vec<Dscp>, ParseError> {
    let s = s.trim();
    if s == "*" {
        return Ok(Dscp::all().collect());
    }
    if s.is_empty() {
        return Err(ParseError::InvalidFormat("empty DSCP list".to_string()));
    }
    s.split_whitespace().map(str::parse).collect()
}
