//! Configuration value parsing.
//!
//! Integers accept decimal, octal (`0` prefix), hexadecimal (`0x` prefix)
//! and binary (`0b` prefix) notation. Rates and bucket sizes are a number
//! followed by an optional unit.

use winnow::combinator::{alt, opt, preceded};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{rest, take_while};

use super::rate::{GIGA, InformationRate, KILO, MEGA, TERA, byte_multiplier};

/// Error type for parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("number out of range: {0}")]
    OutOfRange(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("unknown name: {0}")]
    UnknownName(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Result type for winnow parsers.
type PResult<T> = core::result::Result<T, winnow::error::ErrMode<ContextError>>;

// ============================================================================
// Grammar
// ============================================================================

fn hex(input: &mut &str) -> PResult<u64> {
    preceded(
        alt(("0x", "0X")),
        take_while(1.., |c: char| c.is_ascii_hexdigit()),
    )
    .try_map(|digits: &str| u64::from_str_radix(digits, 16))
    .parse_next(input)
}

fn binary(input: &mut &str) -> PResult<u64> {
    preceded(alt(("0b", "0B")), take_while(1.., ('0', '1')))
        .try_map(|digits: &str| u64::from_str_radix(digits, 2))
        .parse_next(input)
}

fn octal(input: &mut &str) -> PResult<u64> {
    // A lone "0" lands here too and yields zero.
    preceded('0', take_while(0.., '0'..='7'))
        .try_map(|digits: &str| {
            if digits.is_empty() {
                Ok(0)
            } else {
                u64::from_str_radix(digits, 8)
            }
        })
        .parse_next(input)
}

fn decimal(input: &mut &str) -> PResult<u64> {
    take_while(1.., |c: char| c.is_ascii_digit())
        .try_map(|digits: &str| digits.parse::<u64>())
        .parse_next(input)
}

fn integer(input: &mut &str) -> PResult<u64> {
    alt((hex, binary, octal, decimal)).parse_next(input)
}

fn real(input: &mut &str) -> PResult<f64> {
    take_while(1.., |c: char| c.is_ascii_digit() || c == '.')
        .try_map(|digits: &str| digits.parse::<f64>())
        .parse_next(input)
}

/// A non-negative number followed by an optional (possibly space separated) unit.
fn quantity<'s>(input: &mut &'s str) -> PResult<(f64, &'s str)> {
    let value = real.parse_next(input)?;
    let _ = opt(take_while(1.., ' ')).parse_next(input)?;
    let unit = rest.parse_next(input)?;
    Ok((value, unit))
}

fn split_quantity(s: &str) -> Result<(f64, &str)> {
    quantity
        .parse(s.trim())
        .map_err(|_| ParseError::InvalidNumber(s.trim().to_string()))
}

// ============================================================================
// Integers
// ============================================================================

/// Parse an unsigned integer in decimal, octal, hex or binary notation.
pub fn get_u64(s: &str) -> Result<u64> {
    integer
        .parse(s.trim())
        .map_err(|_| ParseError::InvalidNumber(s.trim().to_string()))
}

/// Parse a u8.
pub fn get_u8(s: &str) -> Result<u8> {
    narrow(s, get_u64(s)?)
}

/// Parse a u16.
pub fn get_u16(s: &str) -> Result<u16> {
    narrow(s, get_u64(s)?)
}

/// Parse a u32.
pub fn get_u32(s: &str) -> Result<u32> {
    narrow(s, get_u64(s)?)
}

fn narrow<T: TryFrom<u64>>(s: &str, value: u64) -> Result<T> {
    T::try_from(value).map_err(|_| ParseError::OutOfRange(s.trim().to_string()))
}

/// Parse a port (`80`) or an inclusive port range (`1024-2047`).
///
/// Range ordering is not checked here; see
/// [`validate_port_range`](crate::validation::validate_port_range).
pub fn get_port_range(s: &str) -> Result<(u16, u16)> {
    match s.split_once('-') {
        Some((min, max)) => Ok((get_u16(min)?, get_u16(max)?)),
        None => {
            let port = get_u16(s)?;
            Ok((port, port))
        }
    }
}

// ============================================================================
// Rates and sizes
// ============================================================================

/// Parse an information rate.
///
/// Accepts an absolute rate in bits per second with an optional SI unit
/// (`bps`, `kbps`, `mbps`, `gbps`, `tbps`, `bit`, `kbit`, `mbit`, `gbit`,
/// `tbit`; case-insensitive) or a percentage of the interface datarate
/// (`25%`).
pub fn get_rate(s: &str) -> Result<InformationRate> {
    let (value, unit) = split_quantity(s)?;

    let multiplier: f64 = match unit.to_ascii_lowercase().as_str() {
        "%" => return Ok(InformationRate::Relative(value / 100.0)),
        "" | "bps" | "bit" => 1.0,
        "kbps" | "kbit" | "k" => KILO,
        "mbps" | "mbit" | "m" => MEGA,
        "gbps" | "gbit" | "g" => GIGA,
        "tbps" | "tbit" | "t" => TERA,
        _ => return Err(ParseError::UnknownUnit(unit.to_string())),
    };

    Ok(InformationRate::Absolute(value * multiplier))
}

/// Parse a bucket size and return it in bits.
///
/// A bare number is bits. Lowercase units are bit based (`b`, `bit`, `kb`,
/// `kbit`, `mb`, `mbit`, `gb`, `gbit`), uppercase ones and the `byte`
/// spellings are byte based (`B`, `KB`, `MB`, `GB`, `byte`, `kbyte`,
/// `mbyte`, `gbyte`).
pub fn get_bucket_size(s: &str) -> Result<u64> {
    let (value, unit) = split_quantity(s)?;

    let multiplier: f64 = match unit {
        "B" => byte_multiplier(1.0),
        "KB" => byte_multiplier(KILO),
        "MB" => byte_multiplier(MEGA),
        "GB" => byte_multiplier(GIGA),
        _ => match unit.to_ascii_lowercase().as_str() {
            "" | "b" | "bit" | "bits" => 1.0,
            "kb" | "kbit" | "kbits" => KILO,
            "mb" | "mbit" | "mbits" => MEGA,
            "gb" | "gbit" | "gbits" => GIGA,
            "byte" | "bytes" => byte_multiplier(1.0),
            "kbyte" | "kbytes" => byte_multiplier(KILO),
            "mbyte" | "mbytes" => byte_multiplier(MEGA),
            "gbyte" | "gbytes" => byte_multiplier(GIGA),
            _ => return Err(ParseError::UnknownUnit(unit.to_string())),
        },
    };

    Ok((value * multiplier) as u64)
}
